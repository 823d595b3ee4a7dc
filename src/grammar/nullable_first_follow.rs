use std::collections::BTreeSet;

use super::{grammar::Symbol, Grammar, END_MARK_INDEX, EPSILON_INDEX};

/// FIRST and FOLLOW sets indexed by symbol. FIRST of a nullable symbol contains
/// ε; FIRST of a terminal (or `$`) is the terminal itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstFollow {
    pub first: Vec<BTreeSet<usize>>,
    pub follow: Vec<BTreeSet<usize>>,
}

impl FirstFollow {
    pub fn nullable(&self, symbol: usize) -> bool {
        self.first[symbol].contains(&EPSILON_INDEX)
    }

    /// FIRST of a symbol sequence. Leading symbols contribute while every
    /// symbol before them is nullable; ε is added only when the whole
    /// sequence is (including the empty sequence).
    pub fn first_of_sequence(&self, sequence: &[usize]) -> BTreeSet<usize> {
        let mut first = BTreeSet::new();
        for s in sequence {
            first.extend(self.first[*s].iter().filter(|t| **t != EPSILON_INDEX));
            if !self.nullable(*s) {
                return first;
            }
        }
        first.insert(EPSILON_INDEX);
        first
    }
}

impl Grammar {
    pub fn calculate_nullable_first_follow(&self) -> FirstFollow {
        let first = self.calculate_first();
        let mut ff = FirstFollow {
            first,
            follow: vec![BTreeSet::new(); self.symbols.len()],
        };
        self.calculate_follow(&mut ff);
        ff
    }

    /// Global fixpoint: every pass recomputes each non-terminal from the
    /// current sets, so mutual recursion only ever reads a partial set and
    /// never recurses. Sets only grow and are bounded by |T| + 1, so the loop
    /// ends.
    fn calculate_first(&self) -> Vec<BTreeSet<usize>> {
        let mut ff = FirstFollow {
            first: self
                .symbols
                .iter()
                .enumerate()
                .map(|(i, s)| match s {
                    Symbol::NonTerminal(_) => BTreeSet::new(),
                    _ => BTreeSet::from([i]),
                })
                .collect(),
            follow: Vec::new(),
        };

        let mut changed = true;
        let mut passes = 0;
        while changed {
            changed = false;
            passes += 1;
            for nt in self.non_terminal_iter() {
                let first: BTreeSet<usize> =
                    nt.productions
                        .iter()
                        .fold(BTreeSet::new(), |mut first, production| {
                            first.extend(ff.first_of_sequence(production));
                            first
                        });

                if first.len() != ff.first[nt.index].len() {
                    changed = true;
                    ff.first[nt.index] = first;
                }
            }
        }
        log::trace!("FIRST converged after {} passes", passes);
        ff.first
    }

    fn calculate_follow(&self, ff: &mut FirstFollow) {
        if let Some(start) = self.start_symbol {
            ff.follow[start].insert(END_MARK_INDEX);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for left in self.non_terminal_iter() {
                for production in &left.productions {
                    for (i, &b) in production.iter().enumerate() {
                        if !self.is_non_terminal(b) {
                            continue;
                        }
                        let rest = ff.first_of_sequence(&production[i + 1..]);
                        let mut gained: Vec<usize> = rest
                            .iter()
                            .cloned()
                            .filter(|t| *t != EPSILON_INDEX)
                            .collect();
                        if rest.contains(&EPSILON_INDEX) {
                            gained.extend(ff.follow[left.index].iter().cloned());
                        }
                        for t in gained {
                            changed |= ff.follow[b].insert(t);
                        }
                    }
                }
            }
        }
    }
}
