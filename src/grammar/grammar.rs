use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{END_MARK, END_MARK_INDEX, EPSILON, EPSILON_INDEX};

#[derive(Debug, Clone)]
pub struct NonTerminal {
    pub index: usize,
    pub name: String,
    pub productions: Vec<Vec<usize>>,
}

impl NonTerminal {
    pub fn new(index: usize, name: String) -> Self {
        Self {
            index,
            name,
            productions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    /// Empty body sentinel, always at `EPSILON_INDEX`.
    Epsilon,
    /// `$`, always at `END_MARK_INDEX`.
    EndMark,
    NonTerminal(NonTerminal),
    Terminal(String),
}

impl Symbol {
    pub fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    pub fn mut_non_terminal(&mut self) -> Option<&mut NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies a production by its head and its position among the head's
/// alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductionRef {
    pub head: usize,
    pub index: usize,
}

/// A context-free grammar (N, T, S, P) over an interned symbol arena.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    pub symbol_table: HashMap<String, usize>,
    pub start_symbol: Option<usize>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        let mut g = Self {
            symbols: vec![Symbol::Epsilon, Symbol::EndMark],
            symbol_table: HashMap::new(),
            start_symbol: None,
        };
        g.symbol_table.insert(EPSILON.to_string(), EPSILON_INDEX);
        g.symbol_table.insert(END_MARK.to_string(), END_MARK_INDEX);
        g
    }

    pub fn terminal_iter(&self) -> impl Iterator<Item = (usize, &String)> {
        self.symbols.iter().enumerate().filter_map(|(i, s)| {
            if let Symbol::Terminal(name) = s {
                Some((i, name))
            } else {
                None
            }
        })
    }

    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &NonTerminal> {
        self.symbols.iter().filter_map(|s| s.non_terminal())
    }

    pub fn non_terminal_indices(&self) -> Vec<usize> {
        self.non_terminal_iter().map(|nt| nt.index).collect()
    }

    /// Terminal indices followed by `$`: the column order of every table.
    pub fn terminal_columns(&self) -> Vec<usize> {
        self.terminal_iter()
            .map(|(i, _)| i)
            .chain(std::iter::once(END_MARK_INDEX))
            .collect()
    }

    pub fn get_symbol_index(&self, name: &str) -> Option<usize> {
        self.symbol_table.get(name).cloned()
    }

    pub fn get_symbol_name(&self, index: usize) -> &str {
        match &self.symbols[index] {
            Symbol::Epsilon => EPSILON,
            Symbol::EndMark => END_MARK,
            Symbol::NonTerminal(e) => e.name.as_str(),
            Symbol::Terminal(e) => e.as_str(),
        }
    }

    pub fn is_non_terminal(&self, index: usize) -> bool {
        matches!(self.symbols.get(index), Some(Symbol::NonTerminal(_)))
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        matches!(
            self.symbols.get(index),
            Some(Symbol::Terminal(_)) | Some(Symbol::EndMark)
        )
    }

    pub fn non_terminal(&self, index: usize) -> &NonTerminal {
        self.symbols[index]
            .non_terminal()
            .expect("symbol index is not a non-terminal")
    }

    pub fn productions(&self, index: usize) -> &[Vec<usize>] {
        self.symbols[index]
            .non_terminal()
            .map(|nt| nt.productions.as_slice())
            .unwrap_or(&[])
    }

    pub fn production(&self, production: ProductionRef) -> &[usize] {
        &self.productions(production.head)[production.index]
    }

    /// Every production in head order, then alternative order.
    pub fn production_refs(&self) -> Vec<ProductionRef> {
        self.non_terminal_iter()
            .flat_map(|nt| {
                (0..nt.productions.len()).map(move |index| ProductionRef {
                    head: nt.index,
                    index,
                })
            })
            .collect()
    }

    /// The body with the ε sentinel removed; empty for an ε production.
    pub fn body(&self, production: ProductionRef) -> Vec<usize> {
        self.production(production)
            .iter()
            .cloned()
            .filter(|s| *s != EPSILON_INDEX)
            .collect()
    }

    pub fn add_non_terminal(&mut self, name: &str) -> usize {
        let idx = self.symbols.len();
        self.symbols
            .push(Symbol::NonTerminal(NonTerminal::new(idx, name.to_string())));
        self.symbol_table.insert(name.to_string(), idx);
        idx
    }

    pub fn add_terminal(&mut self, name: String) -> usize {
        if let Some(idx) = self.get_symbol_index(&name) {
            return idx;
        }
        let idx = self.symbols.len();
        self.symbols.push(Symbol::Terminal(name.clone()));
        self.symbol_table.insert(name, idx);
        idx
    }

    /// Appends `right` to `left`'s alternatives unless an equal body exists.
    /// Returns whether the production was added.
    pub fn add_production(&mut self, left: usize, right: Vec<usize>) -> bool {
        let nt = self.symbols[left]
            .mut_non_terminal()
            .expect("production head is not a non-terminal");
        if nt.productions.contains(&right) {
            return false;
        }
        nt.productions.push(right);
        true
    }

    pub fn set_productions(&mut self, left: usize, productions: Vec<Vec<usize>>) {
        if let Some(nt) = self.symbols[left].mut_non_terminal() {
            nt.productions = Vec::new();
        }
        for production in productions {
            self.add_production(left, production);
        }
    }

    pub fn get_symbol_prime_name(&self, mut name: String) -> String {
        while self.symbol_table.contains_key(&name) {
            name.push('\'');
        }
        name
    }

    pub fn production_to_vec_str(&self, production: &[usize]) -> Vec<&str> {
        production
            .iter()
            .map(|idx| self.get_symbol_name(*idx))
            .collect()
    }

    /// `A → α` with symbols separated by spaces.
    pub fn production_to_string(&self, production: ProductionRef) -> String {
        format!(
            "{} → {}",
            self.get_symbol_name(production.head),
            self.production_to_vec_str(self.production(production))
                .join(" ")
        )
    }

    /// A copy keeping only the non-terminals in `keep`, in their original order.
    /// Productions mentioning a dropped non-terminal go with it, and terminals
    /// nothing refers to any more disappear.
    pub fn retain_non_terminals(&self, keep: &HashSet<usize>) -> Grammar {
        let mut g = Grammar::new();
        let mut map: HashMap<usize, usize> = HashMap::new();
        for nt in self.non_terminal_iter().filter(|nt| keep.contains(&nt.index)) {
            map.insert(nt.index, g.add_non_terminal(&nt.name));
        }

        for nt in self.non_terminal_iter().filter(|nt| keep.contains(&nt.index)) {
            for production in &nt.productions {
                let mentions_dropped = production
                    .iter()
                    .any(|s| self.is_non_terminal(*s) && !map.contains_key(s));
                if mentions_dropped {
                    continue;
                }
                let right = production
                    .iter()
                    .map(|s| match &self.symbols[*s] {
                        Symbol::Terminal(name) => g.add_terminal(name.clone()),
                        Symbol::NonTerminal(_) => map[s],
                        Symbol::Epsilon | Symbol::EndMark => *s,
                    })
                    .collect();
                g.add_production(map[&nt.index], right);
            }
        }

        g.start_symbol = self.start_symbol.and_then(|s| map.get(&s).cloned());
        g
    }
}
