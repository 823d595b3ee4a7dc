//! Thompson's construction.
//!
//! Every fragment has exactly one start and one accept state, no edges into
//! its start and no edges out of its accept.

use std::collections::BTreeSet;

use super::{Nfa, NfaTransition, RegexNode, ThompsonStep};

struct Fragment {
    start: usize,
    accept: usize,
    transitions: Vec<NfaTransition>,
    states: Vec<usize>,
}

impl Fragment {
    fn to_nfa(&self, alphabet: &BTreeSet<char>) -> Nfa {
        let mut states = self.states.clone();
        states.sort_unstable();
        Nfa {
            states,
            alphabet: alphabet.iter().cloned().collect(),
            transitions: self.transitions.clone(),
            start: self.start,
            accept_states: vec![self.accept],
        }
    }
}

fn epsilon(from: usize, to: usize) -> NfaTransition {
    NfaTransition {
        from,
        to,
        symbol: None,
    }
}

/// State of a single construction. The id counter lives here, so two builds
/// never share numbering.
struct ThompsonBuilder {
    next_state: usize,
    alphabet: BTreeSet<char>,
    steps: Vec<ThompsonStep>,
}

impl ThompsonBuilder {
    fn new() -> Self {
        Self {
            next_state: 0,
            alphabet: BTreeSet::new(),
            steps: Vec::new(),
        }
    }

    fn new_state(&mut self) -> usize {
        let s = self.next_state;
        self.next_state += 1;
        s
    }

    fn record(&mut self, description: String, node: &RegexNode, fragment: &Fragment) {
        log::trace!("{}", description);
        self.steps.push(ThompsonStep {
            description,
            sub_expression: node.to_string(),
            nfa: fragment.to_nfa(&self.alphabet),
        });
    }

    /// Wraps `child` in a fresh start/accept pair. `bypass` adds start → accept,
    /// `repeat` adds child accept → child start.
    fn wrap(&mut self, child: Fragment, bypass: bool, repeat: bool) -> Fragment {
        let s = self.new_state();
        let f = self.new_state();
        let mut transitions = child.transitions;
        transitions.push(epsilon(s, child.start));
        if bypass {
            transitions.push(epsilon(s, f));
        }
        transitions.push(epsilon(child.accept, f));
        if repeat {
            transitions.push(epsilon(child.accept, child.start));
        }
        let mut states = child.states;
        states.extend([s, f]);
        Fragment {
            start: s,
            accept: f,
            transitions,
            states,
        }
    }

    fn build(&mut self, node: &RegexNode) -> Fragment {
        match node {
            RegexNode::Epsilon | RegexNode::Literal(_) => {
                let s = self.new_state();
                let f = self.new_state();
                let symbol = match node {
                    RegexNode::Literal(c) => {
                        self.alphabet.insert(*c);
                        Some(*c)
                    }
                    _ => None,
                };
                let fragment = Fragment {
                    start: s,
                    accept: f,
                    transitions: vec![NfaTransition { from: s, to: f, symbol }],
                    states: vec![s, f],
                };
                let description = match symbol {
                    Some(c) => format!(
                        "Base case: '{}' → transition on '{}' from state {} to state {}",
                        c, c, s, f
                    ),
                    None => format!("Base case: ε → ε-transition from state {} to state {}", s, f),
                };
                self.record(description, node, &fragment);
                fragment
            }
            RegexNode::Union(l, r) => {
                let left = self.build(l);
                let right = self.build(r);
                let s = self.new_state();
                let f = self.new_state();
                let mut transitions = left.transitions;
                transitions.extend(right.transitions);
                transitions.extend([
                    epsilon(s, left.start),
                    epsilon(s, right.start),
                    epsilon(left.accept, f),
                    epsilon(right.accept, f),
                ]);
                let mut states = left.states;
                states.extend(right.states);
                states.extend([s, f]);
                let fragment = Fragment {
                    start: s,
                    accept: f,
                    transitions,
                    states,
                };
                self.record(
                    format!(
                        "Union: ({} | {}) → new start {}, new accept {}, ε-branches to both sub-NFAs",
                        l, r, s, f
                    ),
                    node,
                    &fragment,
                );
                fragment
            }
            RegexNode::Concat(l, r) => {
                let left = self.build(l);
                let right = self.build(r);
                // right's start is folded into left's accept
                let rename = |s: usize| if s == right.start { left.accept } else { s };
                let mut transitions = left.transitions;
                transitions.extend(right.transitions.iter().map(|t| NfaTransition {
                    from: rename(t.from),
                    to: rename(t.to),
                    symbol: t.symbol,
                }));
                let mut states = left.states;
                states.extend(right.states.iter().filter(|s| **s != right.start));
                let fragment = Fragment {
                    start: left.start,
                    accept: right.accept,
                    transitions,
                    states,
                };
                self.record(
                    format!(
                        "Concatenation: ({} · {}) → merge accept of left ({}) with start of right ({})",
                        l, r, left.accept, right.start
                    ),
                    node,
                    &fragment,
                );
                fragment
            }
            RegexNode::Star(c) => {
                let child = self.build(c);
                let fragment = self.wrap(child, true, true);
                self.record(
                    format!(
                        "Kleene star: ({})* → new start {}, new accept {}, ε-loop and ε-bypass",
                        c, fragment.start, fragment.accept
                    ),
                    node,
                    &fragment,
                );
                fragment
            }
            RegexNode::Plus(c) => {
                let child = self.build(c);
                let fragment = self.wrap(child, false, true);
                self.record(
                    format!(
                        "Plus: ({})+ → new start {}, new accept {}, ε-loop without bypass",
                        c, fragment.start, fragment.accept
                    ),
                    node,
                    &fragment,
                );
                fragment
            }
            RegexNode::Optional(c) => {
                let child = self.build(c);
                let fragment = self.wrap(child, true, false);
                self.record(
                    format!(
                        "Optional: ({})? → new start {}, new accept {}, ε-bypass without loop",
                        c, fragment.start, fragment.accept
                    ),
                    node,
                    &fragment,
                );
                fragment
            }
        }
    }
}

/// Builds the NFA of `ast` along with one step per AST node, children first.
pub fn thompson_construction(ast: &RegexNode) -> (Nfa, Vec<ThompsonStep>) {
    let mut builder = ThompsonBuilder::new();
    let fragment = builder.build(ast);
    let nfa = fragment.to_nfa(&builder.alphabet);
    log::debug!(
        "thompson: {} states, {} transitions",
        nfa.states.len(),
        nfa.transitions.len()
    );
    (nfa, builder.steps)
}
