//! Chomsky normal form.
//!
//! epsilon removal → unit removal → binarization → dead and unreachable
//! non-terminal removal. A start symbol that derives ε keeps `S → ε`.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{Grammar, EPSILON_INDEX};

const SUBSCRIPTS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

fn helper_name(index: usize) -> String {
    std::iter::once('A')
        .chain(
            index
                .to_string()
                .chars()
                .filter_map(|d| d.to_digit(10).map(|d| SUBSCRIPTS[d as usize])),
        )
        .collect()
}

/// Every variant of `production` with each occurrence of a nullable symbol
/// kept or dropped. The unchanged production comes first.
fn variants(production: &[usize], nullable: &HashSet<usize>) -> Vec<Vec<usize>> {
    let mut generations: Vec<Vec<usize>> = vec![Vec::new()];
    for s in production {
        if nullable.contains(s) {
            let without = generations.clone();
            for g in generations.iter_mut() {
                g.push(*s);
            }
            generations.extend(without);
        } else {
            for g in generations.iter_mut() {
                g.push(*s);
            }
        }
    }
    generations
}

struct CnfBuilder {
    g: Grammar,
    start_nullable: bool,
    helper_index: usize,
}

impl CnfBuilder {
    fn new_helper(&mut self, body: Vec<usize>) -> usize {
        let mut name = helper_name(self.helper_index);
        self.helper_index += 1;
        while self.g.get_symbol_index(&name).is_some() {
            name = helper_name(self.helper_index);
            self.helper_index += 1;
        }
        let helper = self.g.add_non_terminal(&name);
        self.g.add_production(helper, body);
        helper
    }

    /// Each round deletes one non-terminal's ε production and adds the
    /// variants without its occurrences. ε is never given back to a
    /// non-terminal that already lost it, so there are at most |N| rounds.
    fn remove_epsilons(&mut self) {
        let start = self.g.start_symbol;
        let mut eliminated: HashSet<usize> = HashSet::new();

        loop {
            let found = self
                .g
                .non_terminal_iter()
                .find(|nt| nt.productions.iter().any(|p| p == &[EPSILON_INDEX]))
                .map(|nt| nt.index);
            let term = match found {
                Some(term) => term,
                None => break,
            };

            let productions = self
                .g
                .productions(term)
                .iter()
                .filter(|p| p.as_slice() != [EPSILON_INDEX])
                .cloned()
                .collect();
            self.g.set_productions(term, productions);
            eliminated.insert(term);
            if Some(term) == start {
                self.start_nullable = true;
            }
            log::trace!("cnf: removed {} → ε", self.g.get_symbol_name(term));

            for key in self.g.non_terminal_indices() {
                for production in self.g.productions(key).to_vec() {
                    if !production.contains(&term) {
                        continue;
                    }
                    for variant in variants(&production, &eliminated) {
                        if !variant.is_empty() {
                            self.g.add_production(key, variant);
                        } else if eliminated.contains(&key) {
                            if Some(key) == start {
                                self.start_nullable = true;
                            }
                        } else {
                            self.g.add_production(key, vec![EPSILON_INDEX]);
                        }
                    }
                }
            }
        }
    }

    /// Replaces `A → B` by B's alternatives. A pair (A, B) is inlined at most
    /// once, which bounds the loop by |N|².
    fn remove_units(&mut self) {
        let mut removed: HashSet<(usize, usize)> = HashSet::new();

        loop {
            let found = self.g.non_terminal_iter().find_map(|nt| {
                nt.productions
                    .iter()
                    .position(|p| p.len() == 1 && self.g.is_non_terminal(p[0]))
                    .map(|i| (nt.index, i))
            });
            let (nt, i) = match found {
                Some(found) => found,
                None => break,
            };

            let mut productions = self.g.productions(nt).to_vec();
            let b = productions.remove(i)[0];
            self.g.set_productions(nt, productions);
            removed.insert((nt, b));

            for production in self.g.productions(b).to_vec() {
                let is_known_unit = production.len() == 1
                    && self.g.is_non_terminal(production[0])
                    && (production[0] == nt || removed.contains(&(nt, production[0])));
                if !is_known_unit {
                    self.g.add_production(nt, production);
                }
            }
        }
    }

    /// Terminals inside bodies of length two get a helper `Aₖ → t`, reusing a
    /// non-terminal whose only production is `t`. Longer bodies fold their
    /// prefix into a helper, reusing a non-terminal whose only production is
    /// that prefix. Helpers are processed in the same pass.
    fn binarize(&mut self) {
        let start = self.g.start_symbol;
        let mut singles: HashMap<usize, usize> = HashMap::new();
        let mut multis: HashMap<Vec<usize>, usize> = HashMap::new();
        for nt in self.g.non_terminal_iter() {
            // a start symbol that derives ε gets S → ε back later
            if self.start_nullable && Some(nt.index) == start {
                continue;
            }
            if let [only] = nt.productions.as_slice() {
                if let [t] = only.as_slice() {
                    if self.g.is_terminal(*t) {
                        singles.insert(*t, nt.index);
                    }
                }
                multis.insert(only.clone(), nt.index);
            }
        }

        let mut i = 0;
        while i < self.g.symbols.len() {
            if !self.g.is_non_terminal(i) {
                i += 1;
                continue;
            }

            let mut converted: Vec<Vec<usize>> = Vec::new();
            for mut production in self.g.productions(i).to_vec() {
                let len = production.len();
                if len == 2 {
                    for s in production.iter_mut() {
                        if self.g.is_terminal(*s) {
                            *s = self.single(*s, &mut singles);
                        }
                    }
                } else if len > 2 {
                    let mut last = production[len - 1];
                    if self.g.is_terminal(last) {
                        last = self.single(last, &mut singles);
                    }
                    let prefix = production[..len - 1].to_vec();
                    let head = match multis.get(&prefix) {
                        Some(head) => *head,
                        None => {
                            let head = self.new_helper(prefix.clone());
                            multis.insert(prefix, head);
                            head
                        }
                    };
                    production = vec![head, last];
                }
                converted.push(production);
            }
            self.g.set_productions(i, converted);
            i += 1;
        }
    }

    fn single(&mut self, terminal: usize, singles: &mut HashMap<usize, usize>) -> usize {
        if let Some(nt) = singles.get(&terminal) {
            return *nt;
        }
        let nt = self.new_helper(vec![terminal]);
        singles.insert(terminal, nt);
        nt
    }

    /// Keeps the non-terminals that still derive something through their
    /// remaining productions and are reachable from the start symbol.
    fn remove_useless(&self) -> Grammar {
        let g = &self.g;
        let mut live: HashSet<usize> = g.non_terminal_indices().into_iter().collect();
        loop {
            let next: HashSet<usize> = live
                .iter()
                .cloned()
                .filter(|nt| {
                    g.productions(*nt)
                        .iter()
                        .any(|p| p.iter().all(|s| !g.is_non_terminal(*s) || live.contains(s)))
                })
                .collect();
            if next.len() == live.len() {
                break;
            }
            live = next;
        }

        let mut keep: HashSet<usize> = HashSet::new();
        if let Some(start) = g.start_symbol {
            keep.insert(start);
            let mut queue: VecDeque<usize> = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                // productions through a dead non-terminal are dropped below,
                // so they reach nothing
                let alive = g.productions(current).iter().filter(|p| {
                    p.iter().all(|s| !g.is_non_terminal(*s) || live.contains(s))
                });
                for production in alive {
                    for s in production {
                        if live.contains(s) && keep.insert(*s) {
                            queue.push_back(*s);
                        }
                    }
                }
            }
        }

        let dropped = g.non_terminal_iter().count() - keep.len();
        if dropped > 0 {
            log::debug!("cnf: dropped {} useless non-terminals", dropped);
        }
        g.retain_non_terminals(&keep)
    }
}

impl Grammar {
    pub fn transform_to_cnf(&self) -> Grammar {
        let mut builder = CnfBuilder {
            g: self.clone(),
            start_nullable: false,
            helper_index: 0,
        };
        builder.remove_epsilons();
        builder.remove_units();
        builder.binarize();

        let mut g = builder.remove_useless();
        if builder.start_nullable {
            if let Some(start) = g.start_symbol {
                g.add_production(start, vec![EPSILON_INDEX]);
            }
        }
        g
    }
}
