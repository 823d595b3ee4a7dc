//! DFA minimization by partition refinement.
//!
//! 1. make the DFA total with a sink state
//! 2. split accepting from non-accepting states
//! 3. refine until no block splits
//! 4. build one state per block
//! 5. drop blocks that are unreachable or cannot reach acceptance, and the sink

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Dfa, MinDfa, MinDfaState, MinimizationStep};

/// The input DFA plus a sink, numbered `dfa.states.len()`, when one is needed.
struct TotalDfa<'a> {
    dfa: &'a Dfa,
    sink: Option<usize>,
}

impl<'a> TotalDfa<'a> {
    fn new(dfa: &'a Dfa) -> Self {
        let complete = dfa.states.iter().all(|s| {
            dfa.alphabet
                .iter()
                .all(|a| dfa.target(s.id, *a).is_some())
        });
        Self {
            dfa,
            sink: if complete {
                None
            } else {
                Some(dfa.states.len())
            },
        }
    }

    fn states(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.dfa.states.len()).chain(self.sink)
    }

    fn target(&self, state: usize, symbol: char) -> usize {
        if Some(state) == self.sink {
            return state;
        }
        match self.dfa.target(state, symbol) {
            Some(t) => t,
            // missing edges only exist when a sink was added
            None => self.sink.unwrap_or(state),
        }
    }

    fn is_accepting(&self, state: usize) -> bool {
        self.dfa.accept_states.contains(&state)
    }

    fn label(&self, state: usize) -> String {
        if Some(state) == self.sink {
            "SINK".to_string()
        } else {
            self.dfa.states[state].label.clone()
        }
    }

    fn labels(&self, block: &[usize]) -> Vec<String> {
        block.iter().map(|s| self.label(*s)).collect()
    }
}

fn block_index(partition: &[Vec<usize>], len: usize) -> Vec<usize> {
    let mut index = vec![0; len];
    for (i, block) in partition.iter().enumerate() {
        for s in block {
            index[*s] = i;
        }
    }
    index
}

pub fn minimize_dfa(dfa: &Dfa) -> (MinDfa, Vec<MinimizationStep>) {
    let total = TotalDfa::new(dfa);
    let state_count = dfa.states.len() + total.sink.iter().count();
    let mut steps: Vec<MinimizationStep> = Vec::new();

    let (accepting, non_accepting): (Vec<usize>, Vec<usize>) =
        total.states().partition(|s| total.is_accepting(*s));
    steps.push(MinimizationStep {
        description: format!(
            "Initial partition: accepting {:?}, non-accepting {:?}",
            total.labels(&accepting),
            total.labels(&non_accepting)
        ),
        partition: vec![total.labels(&accepting), total.labels(&non_accepting)]
            .into_iter()
            .filter(|b| !b.is_empty())
            .collect(),
        split_block: None,
        split_symbol: None,
        new_blocks: None,
    });
    let mut partition: Vec<Vec<usize>> = vec![accepting, non_accepting]
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect();

    // Every pass either splits a block or stops, and there are at most
    // `state_count` blocks, so this terminates.
    let mut iteration = 0;
    loop {
        iteration += 1;
        let index = block_index(&partition, state_count);
        let mut refined: Vec<Vec<usize>> = Vec::new();
        let mut changed = false;

        for (bi, block) in partition.iter().enumerate() {
            if block.len() <= 1 {
                refined.push(block.clone());
                continue;
            }

            let mut split = false;
            for &a in &dfa.alphabet {
                let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
                for &s in block {
                    let target_block = index[total.target(s, a)];
                    match groups.iter_mut().find(|(b, _)| *b == target_block) {
                        Some((_, group)) => group.push(s),
                        None => groups.push((target_block, vec![s])),
                    }
                }

                if groups.len() > 1 {
                    let new_blocks: Vec<Vec<usize>> =
                        groups.into_iter().map(|(_, group)| group).collect();
                    refined.extend(new_blocks.iter().cloned());
                    changed = true;
                    split = true;

                    let description = format!(
                        "Iteration {}: split block {:?} on symbol '{}'",
                        iteration,
                        total.labels(block),
                        a
                    );
                    log::trace!("{}", description);
                    steps.push(MinimizationStep {
                        description,
                        partition: refined
                            .iter()
                            .chain(partition[bi + 1..].iter())
                            .map(|b| total.labels(b))
                            .collect(),
                        split_block: Some(total.labels(block)),
                        split_symbol: Some(a),
                        new_blocks: Some(new_blocks.iter().map(|b| total.labels(b)).collect()),
                    });
                    break;
                }
            }

            if !split {
                refined.push(block.clone());
            }
        }

        partition = refined;
        if !changed {
            break;
        }
    }

    steps.push(MinimizationStep {
        description: format!(
            "Final partition (no more splits possible): {}",
            partition
                .iter()
                .map(|b| format!("{:?}", total.labels(b)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        partition: partition.iter().map(|b| total.labels(b)).collect(),
        split_block: None,
        split_symbol: None,
        new_blocks: None,
    });
    log::debug!("minimization: {} blocks", partition.len());

    // one state per block; members agree on targets, so the first speaks for all
    let index = block_index(&partition, state_count);
    let mut transitions: BTreeMap<usize, BTreeMap<char, usize>> = BTreeMap::new();
    for (bi, block) in partition.iter().enumerate() {
        for &a in &dfa.alphabet {
            transitions
                .entry(bi)
                .or_default()
                .insert(a, index[total.target(block[0], a)]);
        }
    }
    let start = index[dfa.start];
    let accept_states: BTreeSet<usize> = dfa.accept_states.iter().map(|s| index[*s]).collect();

    let mut alive: BTreeSet<usize> = accept_states.clone();
    let mut queue: VecDeque<usize> = accept_states.iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        for (from, row) in &transitions {
            if row.values().any(|to| *to == current) && alive.insert(*from) {
                queue.push_back(*from);
            }
        }
    }
    alive.insert(start);

    let mut reachable: BTreeSet<usize> = BTreeSet::from([start]);
    let mut queue: VecDeque<usize> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if let Some(row) = transitions.get(&current) {
            for to in row.values() {
                if reachable.insert(*to) {
                    queue.push_back(*to);
                }
            }
        }
    }

    let keep: BTreeSet<usize> = (0..partition.len())
        .filter(|b| reachable.contains(b) && alive.contains(b))
        .filter(|b| {
            let is_sink_block = partition[*b].iter().any(|s| Some(*s) == total.sink);
            !is_sink_block || accept_states.contains(b)
        })
        .collect();

    let states = keep
        .iter()
        .map(|b| MinDfaState {
            id: *b,
            label: format!("q{}", b),
            dfa_states: partition[*b]
                .iter()
                .map(|s| if Some(*s) == total.sink { None } else { Some(*s) })
                .collect(),
        })
        .collect();

    let transitions = transitions
        .into_iter()
        .filter(|(from, _)| keep.contains(from))
        .map(|(from, row)| {
            let row = row.into_iter().filter(|(_, to)| keep.contains(to)).collect();
            (from, row)
        })
        .collect();

    (
        MinDfa {
            states,
            alphabet: dfa.alphabet.clone(),
            transitions,
            start,
            accept_states: accept_states.intersection(&keep).cloned().collect(),
        },
        steps,
    )
}
