use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::Grammar;

use super::{nullable_first_follow::FirstFollow, ProductionRef, EPSILON_INDEX};

/// An LR item `[A → α·β]`, with a lookahead set for LR(1) and LALR.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Debug)]
pub struct DotProduction {
    pub production: ProductionRef,
    /// Dot position in the body with ε removed.
    pub position: usize,
    pub lookahead: Option<BTreeSet<usize>>,
}

impl DotProduction {
    pub fn new(production: ProductionRef, lookahead: Option<BTreeSet<usize>>) -> Self {
        Self {
            production,
            position: 0,
            lookahead,
        }
    }

    pub fn generate_next(&self) -> Self {
        Self {
            production: self.production,
            position: self.position + 1,
            lookahead: self.lookahead.clone(),
        }
    }

    /// Head and dotted body, lookahead excluded.
    pub fn core(&self) -> (ProductionRef, usize) {
        (self.production, self.position)
    }

    pub fn next_symbol(&self, g: &Grammar) -> Option<usize> {
        g.body(self.production).get(self.position).cloned()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.position >= g.body(self.production).len()
    }
}

/// A state of the automaton: kernel items carried over by a transition, body
/// items added by closure, and outgoing edges in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LRItem {
    pub kernel: Vec<DotProduction>,
    pub extend: Vec<DotProduction>,
    pub edges: Vec<(usize, usize)>,
}

impl LRItem {
    fn new(kernel: Vec<DotProduction>) -> Self {
        Self {
            kernel,
            extend: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &DotProduction> {
        self.kernel.iter().chain(self.extend.iter())
    }

    pub fn edge(&self, symbol: usize) -> Option<usize> {
        self.edges
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, target)| *target)
    }

    /// Adds `[B → ·γ]` for every B right after a dot, to a fixpoint.
    ///
    /// One lookahead set is kept per non-terminal, since all of B's body items
    /// share it. For LR(1) a non-terminal goes back on the queue whenever its
    /// set grows; sets are bounded by |T| + 1, so the queue drains.
    fn calculate_extend(&mut self, g: &Grammar, ff: &FirstFollow) {
        #[derive(Default)]
        struct Extend {
            order: Vec<usize>,
            lookahead: HashMap<usize, BTreeSet<usize>>,
            q: VecDeque<usize>,
        }

        impl Extend {
            fn add(&mut self, nt: usize, lookahead: BTreeSet<usize>) {
                match self.lookahead.get_mut(&nt) {
                    None => {
                        self.order.push(nt);
                        self.lookahead.insert(nt, lookahead);
                        self.q.push_back(nt);
                    }
                    Some(existing) => {
                        let before = existing.len();
                        existing.extend(lookahead);
                        if existing.len() != before && !self.q.contains(&nt) {
                            self.q.push_back(nt);
                        }
                    }
                }
            }
        }

        let is_lr1 = self.kernel.iter().any(|c| c.lookahead.is_some());
        let mut extend = Extend::default();

        // FIRST(β Δ) \ {ε}
        let lookahead_of = |rest: &[usize], inherited: &BTreeSet<usize>| -> BTreeSet<usize> {
            if !is_lr1 {
                return BTreeSet::new();
            }
            let mut first = ff.first_of_sequence(rest);
            if first.remove(&EPSILON_INDEX) {
                first.extend(inherited.iter().cloned());
            }
            first
        };

        let empty = BTreeSet::new();
        for c in &self.kernel {
            if let Some(symbol) = c.next_symbol(g).filter(|s| g.is_non_terminal(*s)) {
                let body = g.body(c.production);
                let inherited = c.lookahead.as_ref().unwrap_or(&empty);
                extend.add(symbol, lookahead_of(&body[c.position + 1..], inherited));
            }
        }

        while let Some(s_idx) = extend.q.pop_front() {
            let inherited = extend.lookahead.get(&s_idx).cloned().unwrap_or_default();
            for index in 0..g.productions(s_idx).len() {
                let body = g.body(ProductionRef { head: s_idx, index });
                if let Some(&symbol) = body.first().filter(|s| g.is_non_terminal(**s)) {
                    let lookahead = lookahead_of(&body[1..], &inherited);
                    log::trace!(
                        "closure: {} via {}",
                        g.get_symbol_name(symbol),
                        g.get_symbol_name(s_idx)
                    );
                    extend.add(symbol, lookahead);
                }
            }
        }

        for nt in extend.order {
            let lookahead = extend.lookahead.remove(&nt).filter(|_| is_lr1);
            for index in 0..g.productions(nt).len() {
                self.extend.push(DotProduction::new(
                    ProductionRef { head: nt, index },
                    lookahead.clone(),
                ));
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum LRFSMType {
    /// LR(0) items with FOLLOW-based reductions, i.e. SLR(1).
    LR0,
    LR1,
    LALR,
}

impl LRFSMType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lr0" | "slr" => Some(LRFSMType::LR0),
            "lr1" => Some(LRFSMType::LR1),
            "lalr" => Some(LRFSMType::LALR),
            _ => None,
        }
    }
}

/// One entry of the build log: either a new state, or a transition that
/// landed on an existing state with the given kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LRStep {
    pub state: usize,
    /// (source state, symbol); `None` for the initial state.
    pub from: Option<(usize, usize)>,
    pub kernel: Vec<DotProduction>,
    pub is_existing_state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReducingLabel {
    pub production: ProductionRef,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct LRFSM {
    pub t: LRFSMType,
    /// The input grammar plus `S' → S`, which is the start production.
    pub grammar: Grammar,
    pub accept_production: ProductionRef,
    pub first_follow: FirstFollow,
    pub states: Vec<LRItem>,
    pub start: usize,
    pub steps: Vec<LRStep>,
    pub reducing_labels: Vec<ReducingLabel>,
    /// LALR only: merged state → the LR(1) states it was made from.
    pub merge_map: Option<Vec<Vec<usize>>>,
}

impl LRFSM {
    pub fn reducing_label(&self, production: ProductionRef) -> Option<&str> {
        self.reducing_labels
            .iter()
            .find(|r| r.production == production)
            .map(|r| r.label.as_str())
    }

    pub fn is_accept_item(&self, item: &DotProduction) -> bool {
        item.production == self.accept_production && item.is_complete(&self.grammar)
    }

    fn label_reductions(&mut self, state: usize) {
        let complete: Vec<ProductionRef> = self.states[state]
            .items()
            .filter(|item| item.is_complete(&self.grammar) && !self.is_accept_item(item))
            .map(|item| item.production)
            .collect();
        for production in complete {
            if self.reducing_label(production).is_none() {
                let label = format!("r{}", self.reducing_labels.len() + 1);
                self.reducing_labels.push(ReducingLabel { production, label });
            }
        }
    }

    /// Groups LR(1) states with equal cores, in order of their smallest
    /// member, and unions the lookaheads of corresponding items.
    fn to_lalr(self) -> LRFSM {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of: Vec<usize> = vec![0; self.states.len()];
        let mut by_core: BTreeMap<BTreeSet<(ProductionRef, usize)>, usize> = BTreeMap::new();
        for (i, state) in self.states.iter().enumerate() {
            let core: BTreeSet<_> = state.kernel.iter().map(|c| c.core()).collect();
            let group = *by_core.entry(core).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(i);
            group_of[i] = group;
        }

        let merge = |items: &[DotProduction], members: &[usize], pick: fn(&LRItem) -> &[DotProduction]| {
            items
                .iter()
                .map(|item| {
                    let mut merged = item.clone();
                    for member in members {
                        for other in pick(&self.states[*member]) {
                            if other.core() == item.core() {
                                if let (Some(la), Some(other_la)) =
                                    (merged.lookahead.as_mut(), other.lookahead.as_ref())
                                {
                                    la.extend(other_la.iter().cloned());
                                }
                            }
                        }
                    }
                    merged
                })
                .collect::<Vec<_>>()
        };

        let states: Vec<LRItem> = groups
            .iter()
            .map(|members| {
                let first = &self.states[members[0]];
                LRItem {
                    kernel: merge(&first.kernel, members, |s| s.kernel.as_slice()),
                    extend: merge(&first.extend, members, |s| s.extend.as_slice()),
                    edges: first
                        .edges
                        .iter()
                        .map(|(symbol, target)| (*symbol, group_of[*target]))
                        .collect(),
                }
            })
            .collect();

        log::debug!(
            "LALR: merged {} LR(1) states into {}",
            self.states.len(),
            states.len()
        );

        LRFSM {
            t: LRFSMType::LALR,
            states,
            start: group_of[self.start],
            merge_map: Some(groups),
            ..self
        }
    }
}

impl Grammar {
    /// The grammar with a fresh start `S'` and `S' → S`.
    pub fn augment(&self) -> Result<(Grammar, ProductionRef)> {
        let start = self.start_symbol.ok_or(Error::MissingStartProduction)?;
        if self.productions(start).is_empty() {
            return Err(Error::MissingStartProduction);
        }
        let mut g = self.clone();
        let name = g.get_symbol_prime_name(g.get_symbol_name(start).to_string());
        let augmented = g.add_non_terminal(&name);
        g.add_production(augmented, vec![start]);
        g.start_symbol = Some(augmented);
        Ok((
            g,
            ProductionRef {
                head: augmented,
                index: 0,
            },
        ))
    }

    pub fn to_lr_fsm(&self, t: LRFSMType) -> Result<LRFSM> {
        let (g, accept_production) = self.augment()?;
        let ff = g.calculate_nullable_first_follow();
        let is_lr1 = t != LRFSMType::LR0;

        let mut fsm = LRFSM {
            t,
            grammar: g,
            accept_production,
            first_follow: ff,
            states: Vec::new(),
            start: 0,
            steps: Vec::new(),
            reducing_labels: Vec::new(),
            merge_map: None,
        };

        let start_kernel = vec![DotProduction::new(
            accept_production,
            is_lr1.then(|| BTreeSet::from([super::END_MARK_INDEX])),
        )];
        let mut start_state = LRItem::new(start_kernel.clone());
        start_state.calculate_extend(&fsm.grammar, &fsm.first_follow);
        fsm.states.push(start_state);
        fsm.label_reductions(0);
        fsm.steps.push(LRStep {
            state: 0,
            from: None,
            kernel: start_kernel.clone(),
            is_existing_state: false,
        });

        let mut ids: BTreeMap<BTreeSet<DotProduction>, usize> = BTreeMap::new();
        ids.insert(start_kernel.into_iter().collect(), 0);
        let mut q: VecDeque<usize> = VecDeque::from([0]);

        while let Some(u) = q.pop_front() {
            // goto targets in order of first appearance, kernel items first
            let mut edges: Vec<(usize, Vec<DotProduction>)> = Vec::new();
            for item in fsm.states[u].items() {
                let symbol = match item.next_symbol(&fsm.grammar) {
                    Some(symbol) => symbol,
                    None => continue,
                };
                let next = item.generate_next();
                let slot = match edges.iter().position(|(s, _)| *s == symbol) {
                    Some(slot) => slot,
                    None => {
                        edges.push((symbol, Vec::new()));
                        edges.len() - 1
                    }
                };
                let kernel = &mut edges[slot].1;
                match kernel.iter_mut().find(|k| k.core() == next.core()) {
                    Some(existing) => {
                        if let (Some(la), Some(next_la)) =
                            (existing.lookahead.as_mut(), next.lookahead.as_ref())
                        {
                            la.extend(next_la.iter().cloned());
                        }
                    }
                    None => kernel.push(next),
                }
            }

            for (symbol, kernel) in edges {
                let key: BTreeSet<DotProduction> = kernel.iter().cloned().collect();
                let (target, is_existing_state) = match ids.get(&key) {
                    Some(&target) => (target, true),
                    None => {
                        let mut state = LRItem::new(kernel.clone());
                        state.calculate_extend(&fsm.grammar, &fsm.first_follow);
                        fsm.states.push(state);
                        let target = fsm.states.len() - 1;
                        ids.insert(key, target);
                        fsm.label_reductions(target);
                        q.push_back(target);
                        (target, false)
                    }
                };
                log::trace!(
                    "I{} --{}--> I{}{}",
                    u,
                    fsm.grammar.get_symbol_name(symbol),
                    target,
                    if is_existing_state { " (existing)" } else { "" }
                );
                fsm.steps.push(LRStep {
                    state: target,
                    from: Some((u, symbol)),
                    kernel,
                    is_existing_state,
                });
                fsm.states[u].edges.push((symbol, target));
            }
        }

        log::debug!("{:?} automaton: {} states", t, fsm.states.len());

        Ok(if t == LRFSMType::LALR {
            fsm.to_lalr()
        } else {
            fsm
        })
    }
}
