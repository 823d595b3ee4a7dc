use crowbook_text_processing::escape::tex as escape_tex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::Grammar;

use super::{pretty_print::ProductionOutput, ProductionRef, EPSILON_INDEX};

/// `cells[(A, a)]` is the production to expand A with on lookahead a.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LL1ParsingTable {
    pub cells: BTreeMap<(usize, usize), ProductionRef>,
    /// Set when two productions competed for a cell. The first one installed
    /// was kept.
    pub not_ll1: bool,
}

impl LL1ParsingTable {
    pub fn get(&self, non_terminal: usize, terminal: usize) -> Option<ProductionRef> {
        self.cells.get(&(non_terminal, terminal)).cloned()
    }

    pub fn to_output<'a>(&self, g: &'a Grammar) -> LL1ParsingTableOutput<'a> {
        let columns = g.terminal_columns();
        let terminals = columns.iter().map(|t| g.get_symbol_name(*t)).collect();
        let rows = g
            .non_terminal_iter()
            .map(|nt| {
                let row = columns
                    .iter()
                    .map(|t| {
                        self.get(nt.index, *t).map(|p| ProductionOutput {
                            left: nt.name.as_str(),
                            rights: vec![g.production_to_vec_str(g.production(p))],
                        })
                    })
                    .collect();
                (nt.name.as_str(), row)
            })
            .collect();
        LL1ParsingTableOutput {
            terminals,
            rows,
            not_ll1: self.not_ll1,
        }
    }
}

#[derive(Serialize)]
pub struct LL1ParsingTableOutput<'a> {
    terminals: Vec<&'a str>,
    rows: Vec<(&'a str, Vec<Option<ProductionOutput<'a>>>)>,
    not_ll1: bool,
}

impl LL1ParsingTableOutput<'_> {
    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.terminals.iter().map(|&t| t.to_string()));
        let mut output: Vec<Vec<String>> = vec![header];
        for (left, row) in &self.rows {
            let mut line: Vec<String> = vec![left.to_string()];
            line.extend(row.iter().map(|production| match production {
                Some(p) => p.to_plaintext(left.chars().count(), false),
                None => String::new(),
            }));
            output.push(line);
        }

        let width: Vec<usize> = (0..output[0].len())
            .map(|j| {
                output
                    .iter()
                    .map(|line| line[j].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let mut table = output
            .iter()
            .map(|line| {
                line.iter()
                    .enumerate()
                    .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        if self.not_ll1 {
            table.push_str("\n(not LL(1): conflicting entries were dropped)");
        }
        table
    }

    pub fn to_latex(&self) -> String {
        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.terminals.len()),
        )];
        header.extend(
            self.terminals
                .iter()
                .map(|&t| format!("\\text{{{}}}", escape_tex(t))),
        );
        let header = header.join(" & ");

        let terminal_set: HashSet<&str> = self.terminals.iter().cloned().collect();
        let output = self
            .rows
            .iter()
            .map(|(left, row)| {
                std::iter::once(escape_tex(*left).to_string())
                    .chain(row.iter().map(|production| match production {
                        Some(p) => p.to_latex(false, &terminal_set),
                        None => String::new(),
                    }))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }
}

impl Grammar {
    /// A → γ goes to [A, a] for a ∈ FIRST(γ) \ {ε}, and to [A, b] for
    /// b ∈ FOLLOW(A) when γ is nullable. The first production placed in a cell
    /// stays there.
    pub fn generate_ll1_parsing_table(&self) -> LL1ParsingTable {
        let ff = self.calculate_nullable_first_follow();
        let mut table = LL1ParsingTable {
            cells: BTreeMap::new(),
            not_ll1: false,
        };

        for production in self.production_refs() {
            let first = ff.first_of_sequence(self.production(production));
            let mut lookaheads: Vec<usize> = first
                .iter()
                .cloned()
                .filter(|t| *t != EPSILON_INDEX)
                .collect();
            if first.contains(&EPSILON_INDEX) {
                lookaheads.extend(ff.follow[production.head].iter().cloned());
            }

            for t in lookaheads {
                match table.cells.get(&(production.head, t)) {
                    None => {
                        table.cells.insert((production.head, t), production);
                    }
                    Some(existing) if *existing != production => {
                        log::debug!(
                            "LL(1) conflict at [{}, {}]: keeping {}, dropping {}",
                            self.get_symbol_name(production.head),
                            self.get_symbol_name(t),
                            self.production_to_string(*existing),
                            self.production_to_string(production)
                        );
                        table.not_ll1 = true;
                    }
                    Some(_) => {}
                }
            }
        }

        table
    }
}
