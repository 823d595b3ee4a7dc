use std::collections::VecDeque;

use super::{Grammar, EPSILON_INDEX};

/// Longest prefix shared by any two of `productions`, or empty.
fn longest_common_prefix(productions: &[Vec<usize>]) -> Vec<usize> {
    let mut longest: &[usize] = &[];
    for (i, a) in productions.iter().enumerate() {
        for b in &productions[i + 1..] {
            let common = a
                .iter()
                .zip(b.iter())
                .take_while(|(x, y)| x == y && **x != EPSILON_INDEX)
                .count();
            if common > longest.len() {
                longest = &a[..common];
            }
        }
    }
    longest.to_vec()
}

impl Grammar {
    /// Rewrites `A → α β₁ | α β₂ | γ` as `A → α A' | γ` and `A' → β₁ | β₂`,
    /// taking the longest shared prefix first, until no two alternatives of
    /// any non-terminal (helpers included) share a prefix.
    pub fn left_factor(&self) -> Grammar {
        let mut g = self.clone();
        let mut queue: VecDeque<usize> = g.non_terminal_indices().into();

        while let Some(nt) = queue.pop_front() {
            loop {
                let productions = g.productions(nt).to_vec();
                let prefix = longest_common_prefix(&productions);
                if prefix.is_empty() {
                    break;
                }

                let name = g.get_symbol_prime_name(g.get_symbol_name(nt).to_string());
                let helper = g.add_non_terminal(&name);
                let mut suffixes: Vec<Vec<usize>> = Vec::new();
                let mut factored: Vec<Vec<usize>> =
                    vec![prefix.iter().cloned().chain([helper]).collect()];
                for production in productions {
                    if production.starts_with(&prefix) {
                        let rest = &production[prefix.len()..];
                        suffixes.push(if rest.is_empty() {
                            vec![EPSILON_INDEX]
                        } else {
                            rest.to_vec()
                        });
                    } else {
                        factored.push(production);
                    }
                }
                log::trace!(
                    "left factor: {} on prefix {:?}",
                    g.get_symbol_name(nt),
                    g.production_to_vec_str(&prefix)
                );
                g.set_productions(nt, factored);
                g.set_productions(helper, suffixes);
                queue.push_back(helper);
            }
        }

        g
    }
}
