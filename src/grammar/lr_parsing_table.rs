use std::collections::HashMap;

use super::{
    lr_dfa::{LRFSMType, LRFSM},
    ProductionRef, END_MARK_INDEX,
};

/// One cell of an LR action/goto table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCell {
    Shift(usize),
    Reduce(ProductionRef),
    Goto(usize),
    Accept,
    Error,
    /// Competing moves, accept first, then shifts, then reduces.
    Conflict(Vec<TableCell>),
}

impl TableCell {
    fn rank(&self) -> u8 {
        match self {
            TableCell::Accept => 0,
            TableCell::Shift(_) => 1,
            TableCell::Reduce(_) => 2,
            TableCell::Goto(_) | TableCell::Error | TableCell::Conflict(_) => 3,
        }
    }

    /// The move a driver takes: accept, else shift, else the first reduce.
    pub fn resolve(&self) -> &TableCell {
        match self {
            // min_by_key keeps the first of equal ranks
            TableCell::Conflict(moves) => moves
                .iter()
                .min_by_key(|m| m.rank())
                .unwrap_or(&ERROR_CELL),
            _ => self,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TableCell::Conflict(_))
    }

    /// Adds `new` to the cell. Returns whether this produced or extended a
    /// conflict.
    fn merge_move(&mut self, new: TableCell) -> bool {
        match self {
            TableCell::Error => {
                *self = new;
                false
            }
            TableCell::Conflict(moves) => {
                if moves.contains(&new) {
                    return false;
                }
                moves.push(new);
                moves.sort_by_key(|m| m.rank());
                true
            }
            existing if *existing == new => false,
            existing => {
                let mut moves = vec![existing.clone(), new];
                moves.sort_by_key(|m| m.rank());
                *existing = TableCell::Conflict(moves);
                true
            }
        }
    }
}

pub(super) static ERROR_CELL: TableCell = TableCell::Error;

/// Action and goto table over the automaton's augmented grammar. Missing
/// entries are errors.
#[derive(Debug, Clone)]
pub struct LRParsingTable<'a> {
    pub fsm: &'a LRFSM,
    pub terminals: Vec<usize>,
    /// Goto columns; the augmented start symbol never has one.
    pub non_terminals: Vec<usize>,
    pub rows: Vec<HashMap<usize, TableCell>>,
    pub has_conflicts: bool,
}

impl LRParsingTable<'_> {
    pub fn cell(&self, state: usize, symbol: usize) -> &TableCell {
        self.rows
            .get(state)
            .and_then(|row| row.get(&symbol))
            .unwrap_or(&ERROR_CELL)
    }
}

impl LRFSM {
    /// Shift and goto from transitions, accept on `$` for `[S' → S·]`, then a
    /// reduce for every complete item on FOLLOW(head) (LR(0), i.e. SLR) or on
    /// the item's own lookahead (LR(1), LALR).
    pub fn to_parsing_table(&self) -> LRParsingTable<'_> {
        let g = &self.grammar;
        let mut has_conflicts = false;
        let mut rows: Vec<HashMap<usize, TableCell>> = vec![HashMap::new(); self.states.len()];

        for (i, state) in self.states.iter().enumerate() {
            let row = &mut rows[i];
            for &(symbol, target) in &state.edges {
                if g.is_non_terminal(symbol) {
                    row.insert(symbol, TableCell::Goto(target));
                } else {
                    has_conflicts |= row
                        .entry(symbol)
                        .or_insert(TableCell::Error)
                        .merge_move(TableCell::Shift(target));
                }
            }

            if state.items().any(|item| self.is_accept_item(item)) {
                has_conflicts |= row
                    .entry(END_MARK_INDEX)
                    .or_insert(TableCell::Error)
                    .merge_move(TableCell::Accept);
            }

            for item in state.items() {
                if !item.is_complete(g) || self.is_accept_item(item) {
                    continue;
                }
                let lookahead: Vec<usize> = match (self.t, &item.lookahead) {
                    (LRFSMType::LR0, _) | (_, None) => self.first_follow.follow
                        [item.production.head]
                        .iter()
                        .cloned()
                        .collect(),
                    (_, Some(lookahead)) => lookahead.iter().cloned().collect(),
                };
                for symbol in lookahead {
                    let conflict = row
                        .entry(symbol)
                        .or_insert(TableCell::Error)
                        .merge_move(TableCell::Reduce(item.production));
                    if conflict {
                        log::debug!(
                            "conflict in state {} on {}",
                            i,
                            g.get_symbol_name(symbol)
                        );
                    }
                    has_conflicts |= conflict;
                }
            }
        }

        LRParsingTable {
            fsm: self,
            terminals: g.terminal_columns(),
            non_terminals: g
                .non_terminal_indices()
                .into_iter()
                .filter(|nt| *nt != self.accept_production.head)
                .collect(),
            rows,
            has_conflicts,
        }
    }
}
