use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Dfa, DfaState, EpsilonClosureDetail, Nfa, SubsetConstructionStep};

/// Smallest superset of `states` closed under ε edges.
///
/// Worklist traversal: a state is pushed only when it first enters the
/// closure, so the loop runs at most once per NFA state.
pub fn epsilon_closure(nfa: &Nfa, states: &BTreeSet<usize>) -> BTreeSet<usize> {
    let mut closure = states.clone();
    let mut stack: Vec<usize> = states.iter().cloned().collect();

    while let Some(s) = stack.pop() {
        for t in &nfa.transitions {
            if t.from == s && t.symbol.is_none() && closure.insert(t.to) {
                stack.push(t.to);
            }
        }
    }
    closure
}

fn label(states: &BTreeSet<usize>) -> String {
    format!(
        "{{{}}}",
        states
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Powerset construction. DFA states are keyed by their (sorted) NFA-state set,
/// so equal sets always resolve to the same DFA state.
pub fn subset_construction(
    nfa: &Nfa,
) -> (Dfa, Vec<SubsetConstructionStep>, Vec<EpsilonClosureDetail>) {
    let mut steps: Vec<SubsetConstructionStep> = Vec::new();
    let mut closure_details: Vec<EpsilonClosureDetail> = Vec::new();

    let mut states: Vec<DfaState> = Vec::new();
    let mut ids: BTreeMap<BTreeSet<usize>, usize> = BTreeMap::new();
    let mut transitions: BTreeMap<usize, BTreeMap<char, usize>> = BTreeMap::new();

    let start_closure = epsilon_closure(nfa, &BTreeSet::from([nfa.start]));
    ids.insert(start_closure.clone(), 0);
    closure_details.push(EpsilonClosureDetail {
        dfa_state: 0,
        input_states: vec![nfa.start],
        closure: start_closure.iter().cloned().collect(),
    });
    steps.push(SubsetConstructionStep {
        description: format!(
            "Initial state: ε-closure({{{}}}) = {}",
            nfa.start,
            label(&start_closure)
        ),
        dfa_state: 0,
        nfa_states: start_closure.iter().cloned().collect(),
        symbol: None,
        target_nfa_states: None,
        target_dfa_state: None,
        is_new: true,
    });
    states.push(DfaState {
        id: 0,
        label: label(&start_closure),
        nfa_states: start_closure,
    });

    let mut unmarked: VecDeque<usize> = VecDeque::from([0]);
    while let Some(current) = unmarked.pop_front() {
        let current_states = states[current].nfa_states.clone();

        for &a in &nfa.alphabet {
            let moved = nfa.step(&current_states, a);
            if moved.is_empty() {
                continue;
            }
            let closure = epsilon_closure(nfa, &moved);

            let (target, is_new) = match ids.get(&closure) {
                Some(&id) => (id, false),
                None => {
                    let id = states.len();
                    ids.insert(closure.clone(), id);
                    states.push(DfaState {
                        id,
                        label: label(&closure),
                        nfa_states: closure.clone(),
                    });
                    unmarked.push_back(id);
                    (id, true)
                }
            };

            let description = format!(
                "move({}, '{}') = {} → ε-closure = {}{}",
                states[current].label,
                a,
                label(&moved),
                states[target].label,
                if is_new { " (new state)" } else { " (existing)" }
            );
            log::trace!("{}", description);

            closure_details.push(EpsilonClosureDetail {
                dfa_state: target,
                input_states: moved.iter().cloned().collect(),
                closure: closure.iter().cloned().collect(),
            });
            steps.push(SubsetConstructionStep {
                description,
                dfa_state: current,
                nfa_states: current_states.iter().cloned().collect(),
                symbol: Some(a),
                target_nfa_states: Some(closure.into_iter().collect()),
                target_dfa_state: Some(target),
                is_new,
            });

            transitions.entry(current).or_default().insert(a, target);
        }
    }

    let accept_states = states
        .iter()
        .filter(|s| s.nfa_states.iter().any(|n| nfa.accept_states.contains(n)))
        .map(|s| s.id)
        .collect();

    log::debug!("subset construction: {} DFA states", states.len());

    (
        Dfa {
            states,
            alphabet: nfa.alphabet.clone(),
            transitions,
            start: 0,
            accept_states,
        },
        steps,
        closure_details,
    )
}
