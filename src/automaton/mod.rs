//! Regular expression → NFA → DFA → minimized DFA.
//!
//! Each stage is a pure function of the previous stage's output and records
//! a step trace next to its result. The traces are informational only.

pub mod minimization;
pub mod regex;
pub mod subset_construction;
pub mod thompson;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub use minimization::minimize_dfa;
pub use regex::{parse_regex, RegexNode};
pub use subset_construction::{epsilon_closure, subset_construction};
pub use thompson::thompson_construction;

pub const EPSILON_CHAR: char = 'ε';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NfaTransition {
    pub from: usize,
    pub to: usize,
    /// `None` is an ε edge.
    pub symbol: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nfa {
    pub states: Vec<usize>,
    pub alphabet: Vec<char>,
    pub transitions: Vec<NfaTransition>,
    pub start: usize,
    pub accept_states: Vec<usize>,
}

impl Nfa {
    pub fn step(&self, states: &BTreeSet<usize>, symbol: char) -> BTreeSet<usize> {
        self.transitions
            .iter()
            .filter(|t| t.symbol == Some(symbol) && states.contains(&t.from))
            .map(|t| t.to)
            .collect()
    }

    pub fn accepts(&self, input: &str) -> bool {
        let mut current = epsilon_closure(self, &BTreeSet::from([self.start]));
        for c in input.chars() {
            current = epsilon_closure(self, &self.step(&current, c));
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|s| self.accept_states.contains(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DfaState {
    pub id: usize,
    /// Canonical name of the underlying NFA-state subset, e.g. `{0,1,3}`.
    pub label: String,
    pub nfa_states: BTreeSet<usize>,
}

/// A deterministic automaton. `transitions[state][symbol]` holds at most one
/// target, so determinism holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub alphabet: Vec<char>,
    pub transitions: BTreeMap<usize, BTreeMap<char, usize>>,
    pub start: usize,
    pub accept_states: BTreeSet<usize>,
}

impl Dfa {
    pub fn target(&self, state: usize, symbol: char) -> Option<usize> {
        self.transitions
            .get(&state)
            .and_then(|row| row.get(&symbol))
            .cloned()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(|row| row.len()).sum()
    }

    pub fn accepts(&self, input: &str) -> bool {
        let mut state = self.start;
        for c in input.chars() {
            match self.target(state, c) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.accept_states.contains(&state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinDfaState {
    pub id: usize,
    pub label: String,
    /// DFA states merged into this block. The sink, if any, is `None`.
    pub dfa_states: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinDfa {
    pub states: Vec<MinDfaState>,
    pub alphabet: Vec<char>,
    pub transitions: BTreeMap<usize, BTreeMap<char, usize>>,
    pub start: usize,
    pub accept_states: BTreeSet<usize>,
}

impl MinDfa {
    pub fn target(&self, state: usize, symbol: char) -> Option<usize> {
        self.transitions
            .get(&state)
            .and_then(|row| row.get(&symbol))
            .cloned()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(|row| row.len()).sum()
    }

    pub fn accepts(&self, input: &str) -> bool {
        let mut state = self.start;
        for c in input.chars() {
            match self.target(state, c) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.accept_states.contains(&state)
    }

    /// Re-expresses the minimized automaton as a plain DFA, renumbering the
    /// kept blocks densely in order.
    pub fn to_dfa(&self) -> Dfa {
        let index: BTreeMap<usize, usize> = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();

        let states = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| DfaState {
                id: i,
                label: s.label.clone(),
                nfa_states: BTreeSet::from([i]),
            })
            .collect();

        let transitions = self
            .transitions
            .iter()
            .filter_map(|(from, row)| {
                let from = *index.get(from)?;
                let row = row
                    .iter()
                    .filter_map(|(c, to)| index.get(to).map(|to| (*c, *to)))
                    .collect();
                Some((from, row))
            })
            .collect();

        Dfa {
            states,
            alphabet: self.alphabet.clone(),
            transitions,
            start: index.get(&self.start).cloned().unwrap_or(0),
            accept_states: self
                .accept_states
                .iter()
                .filter_map(|s| index.get(s).cloned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThompsonStep {
    pub description: String,
    pub sub_expression: String,
    pub nfa: Nfa,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetConstructionStep {
    pub description: String,
    pub dfa_state: usize,
    pub nfa_states: Vec<usize>,
    pub symbol: Option<char>,
    pub target_nfa_states: Option<Vec<usize>>,
    pub target_dfa_state: Option<usize>,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpsilonClosureDetail {
    pub dfa_state: usize,
    pub input_states: Vec<usize>,
    pub closure: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinimizationStep {
    pub description: String,
    /// Blocks of DFA-state labels.
    pub partition: Vec<Vec<String>>,
    pub split_block: Option<Vec<String>>,
    pub split_symbol: Option<char>,
    pub new_blocks: Option<Vec<Vec<String>>>,
}

/// Everything the regex pipeline produces for one expression.
#[derive(Debug, Clone, Serialize)]
pub struct AutomataOutput {
    pub regex: String,
    pub nfa: Nfa,
    pub thompson_steps: Vec<ThompsonStep>,
    pub dfa: Dfa,
    pub subset_steps: Vec<SubsetConstructionStep>,
    pub closure_details: Vec<EpsilonClosureDetail>,
    pub min_dfa: MinDfa,
    pub minimization_steps: Vec<MinimizationStep>,
}

pub fn build_automata(regex: &str) -> crate::error::Result<AutomataOutput> {
    let ast = parse_regex(regex)?;
    let (nfa, thompson_steps) = thompson_construction(&ast);
    let (dfa, subset_steps, closure_details) = subset_construction(&nfa);
    let (min_dfa, minimization_steps) = minimize_dfa(&dfa);
    log::debug!(
        "{}: NFA {} states, DFA {} states, minimized {} states",
        ast,
        nfa.states.len(),
        dfa.states.len(),
        min_dfa.states.len()
    );

    Ok(AutomataOutput {
        regex: ast.to_string(),
        nfa,
        thompson_steps,
        dfa,
        subset_steps,
        closure_details,
        min_dfa,
        minimization_steps,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn pipeline(regex: &str) -> (Nfa, Dfa, MinDfa) {
        let ast = parse_regex(regex).unwrap();
        let (nfa, _) = thompson_construction(&ast);
        let (dfa, _, _) = subset_construction(&nfa);
        let (min_dfa, _) = minimize_dfa(&dfa);
        (nfa, dfa, min_dfa)
    }

    #[test]
    fn parse_precedence() {
        let ast = parse_regex("ab|c*").unwrap();
        assert_eq!(
            ast,
            RegexNode::Union(
                Box::new(RegexNode::Concat(
                    Box::new(RegexNode::Literal('a')),
                    Box::new(RegexNode::Literal('b'))
                )),
                Box::new(RegexNode::Star(Box::new(RegexNode::Literal('c'))))
            )
        );
        assert_eq!(ast.to_string(), "ab|c*");
    }

    #[test]
    fn parse_char_class_and_escape() {
        let ast = parse_regex("[a-c]\\*").unwrap();
        assert_eq!(ast.to_string(), "(a|b|c)\\*");
        let (nfa, _, min_dfa) = pipeline("[a-c]\\*");
        assert!(nfa.accepts("b*"));
        assert!(min_dfa.accepts("c*"));
        assert!(!min_dfa.accepts("c"));
    }

    #[test]
    fn parse_epsilon_word() {
        assert_eq!(parse_regex("epsilon").unwrap(), RegexNode::Epsilon);
        assert_eq!(parse_regex("ε").unwrap(), RegexNode::Epsilon);
        let (_, _, min_dfa) = pipeline("a|epsilon");
        assert!(min_dfa.accepts(""));
        assert!(min_dfa.accepts("a"));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            parse_regex("(ab"),
            Err(crate::Error::Regex { position: 3, .. })
        ));
        assert!(matches!(
            parse_regex("ab)"),
            Err(crate::Error::Regex { position: 2, .. })
        ));
        assert!(parse_regex("[ab").is_err());
        // the word epsilon and leading spaces keep their width in positions
        assert!(matches!(
            parse_regex("epsilon)"),
            Err(crate::Error::Regex { position: 7, .. })
        ));
        assert!(matches!(
            parse_regex("  a)"),
            Err(crate::Error::Regex { position: 3, .. })
        ));
        assert_eq!(
            parse_regex("aepsilonb").unwrap(),
            parse_regex("aεb").unwrap()
        );
        assert!(parse_regex("[]").is_err());
        assert!(parse_regex("[z-a]").is_err());
        assert!(parse_regex("a\\").is_err());
    }

    #[test]
    fn thompson_fragment_shape() {
        let (nfa, steps) = thompson_construction(&parse_regex("a*").unwrap());
        assert_eq!(nfa.accept_states.len(), 1);
        assert!(nfa.transitions.iter().all(|t| t.to != nfa.start));
        assert!(nfa
            .transitions
            .iter()
            .all(|t| t.from != nfa.accept_states[0]));
        // literal first, then the star around it
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].sub_expression, "a");
        assert_eq!(steps[1].sub_expression, "a*");
    }

    #[test]
    fn thompson_counter_is_per_build() {
        let ast = parse_regex("ab").unwrap();
        let (first, _) = thompson_construction(&ast);
        let (second, _) = thompson_construction(&ast);
        assert_eq!(first, second);
        assert_eq!(first.start, 0);
    }

    #[test]
    fn concat_merges_states() {
        let (nfa, _) = thompson_construction(&parse_regex("ab").unwrap());
        assert_eq!(nfa.states.len(), 3);
        assert_eq!(nfa.transitions.len(), 2);
    }

    #[test]
    fn epsilon_closure_idempotent() {
        let (nfa, _, _) = pipeline("(a|b)*abb");
        for s in &nfa.states {
            let once = epsilon_closure(&nfa, &BTreeSet::from([*s]));
            let twice = epsilon_closure(&nfa, &once);
            assert_eq!(once, twice);
        }
        let all: BTreeSet<usize> = nfa.states.iter().cloned().collect();
        assert_eq!(epsilon_closure(&nfa, &all), all);
    }

    #[test]
    fn subset_construction_is_deterministic() {
        let (nfa, dfa, _) = pipeline("(a|b)*abb");
        let mut seen = BTreeSet::new();
        for (from, row) in &dfa.transitions {
            for c in row.keys() {
                assert!(seen.insert((*from, *c)));
            }
        }
        let labels: BTreeSet<&String> = dfa.states.iter().map(|s| &s.label).collect();
        assert_eq!(labels.len(), dfa.states.len());
        for word in ["abb", "aabb", "babb", "ab", "a", ""] {
            assert_eq!(nfa.accepts(word), dfa.accepts(word), "{}", word);
        }
    }

    fn check_a_or_b(accepts: impl Fn(&str) -> bool) {
        assert!(accepts("a"));
        assert!(accepts("b"));
        assert!(!accepts(""));
        assert!(!accepts("ab"));
        assert!(!accepts("c"));
    }

    #[test]
    fn union_language() {
        let (nfa, dfa, min_dfa) = pipeline("a|b");
        check_a_or_b(|w| nfa.accepts(w));
        check_a_or_b(|w| dfa.accepts(w));
        check_a_or_b(|w| min_dfa.accepts(w));
    }

    #[test]
    fn classic_abb() {
        let (_, _, min_dfa) = pipeline("(a|b)*abb");
        assert_eq!(min_dfa.states.len(), 4);
        assert_eq!(min_dfa.accept_states.len(), 1);
        assert!(min_dfa.accepts("abb"));
        assert!(min_dfa.accepts("aabb"));
        assert!(min_dfa.accepts("babb"));
        assert!(!min_dfa.accepts("ab"));
        assert!(!min_dfa.accepts("a"));
    }

    #[test]
    fn minimization_drops_sink() {
        let (_, dfa, min_dfa) = pipeline("ab");
        assert_eq!(dfa.states.len(), 3);
        assert_eq!(min_dfa.states.len(), 3);
        assert!(min_dfa
            .states
            .iter()
            .all(|s| s.dfa_states.iter().all(|d| d.is_some())));
        assert_eq!(min_dfa.alphabet, vec!['a', 'b']);
    }

    #[test]
    fn minimization_is_a_fixpoint() {
        for regex in ["(a|b)*abb", "a+b?", "(ab|ac)*", "[a-c]+x"] {
            let (_, _, min_dfa) = pipeline(regex);
            let (again, _) = minimize_dfa(&min_dfa.to_dfa());
            assert_eq!(again.states.len(), min_dfa.states.len(), "{}", regex);
            assert_eq!(again.transition_count(), min_dfa.transition_count());
            assert_eq!(again.accept_states.len(), min_dfa.accept_states.len());
            for word in ["", "a", "ab", "abb", "aabb", "acab", "bx", "abcx", "aab"] {
                assert_eq!(again.accepts(word), min_dfa.accepts(word), "{}", word);
            }
        }
    }

    #[test]
    fn plus_and_optional() {
        let (_, _, min_dfa) = pipeline("a+b?");
        assert!(min_dfa.accepts("a"));
        assert!(min_dfa.accepts("aaab"));
        assert!(!min_dfa.accepts(""));
        assert!(!min_dfa.accepts("b"));
        assert!(!min_dfa.accepts("abb"));
    }

    #[test]
    fn build_automata_reports_errors() {
        assert!(build_automata("(a").is_err());
        let output = build_automata(" a|b ").unwrap();
        assert_eq!(output.regex, "a|b");
        assert!(!output.thompson_steps.is_empty());
        assert!(!output.subset_steps.is_empty());
        assert!(!output.minimization_steps.is_empty());
    }
}
