use std::collections::HashSet;

use super::{Grammar, EPSILON_INDEX};

/// `a` followed by `b`, with ε sentinels dropped; an empty result is `[ε]`.
pub(super) fn concat(a: &[usize], b: &[usize]) -> Vec<usize> {
    let body: Vec<usize> = a
        .iter()
        .chain(b.iter())
        .cloned()
        .filter(|s| *s != EPSILON_INDEX)
        .collect();
    if body.is_empty() {
        vec![EPSILON_INDEX]
    } else {
        body
    }
}

impl Grammar {
    /// Orders the non-terminals A₁..Aₙ as declared. For each Aᵢ, productions
    /// `Aᵢ → Aⱼ γ` with j < i are expanded through Aⱼ's current alternatives,
    /// then direct recursion is split off into a primed helper:
    /// `Aᵢ → β Aᵢ'` and `Aᵢ' → α Aᵢ' | ε`.
    ///
    /// A non-terminal whose alternatives are all left-recursive derives no
    /// string. It is removed together with its helper and with every
    /// production that mentions it.
    pub fn eliminate_left_recursion(&self) -> Grammar {
        let mut g = self.clone();
        let order = g.non_terminal_indices();
        let mut helpers: Vec<(usize, usize)> = Vec::new();

        for (i, &ai) in order.iter().enumerate() {
            for &aj in &order[..i] {
                let previous = g.productions(aj).to_vec();
                let mut extended: Vec<Vec<usize>> = Vec::new();
                for production in g.productions(ai) {
                    if production.first() == Some(&aj) {
                        for prefix in &previous {
                            extended.push(concat(prefix, &production[1..]));
                        }
                    } else {
                        extended.push(production.clone());
                    }
                }
                g.set_productions(ai, extended);
            }

            let current = g.productions(ai).to_vec();
            if !current.iter().any(|p| p.first() == Some(&ai)) {
                continue;
            }

            let name = g.get_symbol_prime_name(g.get_symbol_name(ai).to_string());
            let helper = g.add_non_terminal(&name);
            let mut kept: Vec<Vec<usize>> = Vec::new();
            let mut tails: Vec<Vec<usize>> = Vec::new();
            for production in current {
                if production.first() == Some(&ai) {
                    // A → A derives nothing new
                    if production.len() > 1 {
                        tails.push(concat(&production[1..], &[helper]));
                    }
                } else {
                    kept.push(concat(&production, &[helper]));
                }
            }
            tails.push(vec![EPSILON_INDEX]);
            log::trace!(
                "left recursion: {} split into {} and {}",
                g.get_symbol_name(ai),
                g.get_symbol_name(ai),
                name
            );
            g.set_productions(ai, kept);
            g.set_productions(helper, tails);
            helpers.push((ai, helper));
        }

        g.remove_empty_non_terminals(&helpers)
    }

    /// Drops non-terminals left without productions, repeating while dropping
    /// empties others, then the helpers of dropped heads.
    fn remove_empty_non_terminals(self, helpers: &[(usize, usize)]) -> Grammar {
        let mut keep: HashSet<usize> = self
            .non_terminal_iter()
            .filter(|nt| !nt.productions.is_empty())
            .map(|nt| nt.index)
            .collect();
        loop {
            let next: HashSet<usize> = keep
                .iter()
                .cloned()
                .filter(|nt| {
                    self.productions(*nt)
                        .iter()
                        .any(|p| p.iter().all(|s| !self.is_non_terminal(*s) || keep.contains(s)))
                })
                .collect();
            if next.len() == keep.len() {
                break;
            }
            keep = next;
        }
        for (head, helper) in helpers {
            if !keep.contains(head) {
                keep.remove(helper);
            }
        }

        if keep.len() == self.non_terminal_iter().count() {
            return self;
        }
        for nt in self.non_terminal_iter().filter(|nt| !keep.contains(&nt.index)) {
            log::warn!("left recursion: {} derives nothing and was removed", nt.name);
        }
        self.retain_non_terminals(&keep)
    }
}
