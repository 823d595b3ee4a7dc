use std::collections::HashSet;

use crowbook_text_processing::escape;
use serde::Serialize;

use super::{
    lr_dfa::{DotProduction, LRItem, LRStep, LRFSM},
    lr_parsing_table::{LRParsingTable, TableCell},
    nullable_first_follow::FirstFollow,
    sort_symbols, Grammar, EPSILON,
};

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    pub rights: Vec<Vec<&'a str>>,
}

impl ProductionOutput<'_> {
    pub fn to_plaintext(&self, left_width: usize, multiline: bool) -> String {
        self.rights
            .iter()
            .map(|right| right.join(" "))
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else if multiline {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                } else {
                    format!(" | {}", right)
                }
            })
            .collect::<Vec<_>>()
            .join(if multiline { "\n" } else { "" })
    }

    /// Terminals in `terminal_set` are set upright with `\text`.
    pub fn to_latex(&self, and_sign: bool, terminal_set: &HashSet<&str>) -> String {
        if self.rights.is_empty() {
            return String::new();
        }

        let left = if and_sign {
            format!("{} & \\rightarrow &", escape::tex(self.left))
        } else {
            format!("{} \\rightarrow ", escape::tex(self.left))
        };
        let right = self
            .rights
            .iter()
            .map(|right| {
                right
                    .iter()
                    .map(|s| symbol_to_latex(s, terminal_set))
                    .collect::<Vec<_>>()
                    .join(" \\ ")
            })
            .collect::<Vec<_>>()
            .join(" \\mid ");

        left + &right
    }
}

fn symbol_to_latex(s: &str, terminal_set: &HashSet<&str>) -> String {
    if s == EPSILON {
        "\\epsilon".to_string()
    } else if terminal_set.contains(s) {
        format!("\\text{{{}}}", escape::tex(s))
    } else {
        escape::tex(s).to_string()
    }
}

#[derive(Serialize)]
pub struct ProductionOutputVec<'a> {
    start: Option<&'a str>,
    non_terminals: Vec<&'a str>,
    terminals: Vec<&'a str>,
    productions: Vec<ProductionOutput<'a>>,
    #[serde(skip)]
    terminal_set: HashSet<&'a str>,
}

impl ProductionOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len, true))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(
                self.productions
                    .iter()
                    .map(|s| s.to_latex(true, &self.terminal_set)),
            )
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    pub fn to_production_output_vec(&self) -> ProductionOutputVec {
        let productions = self
            .non_terminal_iter()
            .map(|nt| ProductionOutput {
                left: nt.name.as_str(),
                rights: nt
                    .productions
                    .iter()
                    .map(|production| self.production_to_vec_str(production))
                    .collect(),
            })
            .collect();
        let terminals: Vec<&str> = self.terminal_iter().map(|(_, t)| t.as_str()).collect();
        ProductionOutputVec {
            start: self.start_symbol.map(|s| self.get_symbol_name(s)),
            non_terminals: self.non_terminal_iter().map(|nt| nt.name.as_str()).collect(),
            terminal_set: terminals.iter().cloned().collect(),
            terminals,
            productions,
        }
    }
}

#[derive(Serialize)]
struct NonTerminalOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl NonTerminalOutput<'_> {
    fn to_plaintext(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            self.first.join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        fn f(a: &[&str]) -> String {
            a.iter()
                .map(|s| {
                    if *s == EPSILON {
                        r"$\epsilon$".to_string()
                    } else {
                        escape::tex(*s).to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(r"\ ")
        }

        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            f(&self.first),
            f(&self.follow)
        )
    }
}

#[derive(Serialize)]
pub struct NonTerminalOutputVec<'a> {
    data: Vec<NonTerminalOutput<'a>>,
}

impl NonTerminalOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n ");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl Grammar {
    pub fn to_non_terminal_output_vec(&self, ff: &FirstFollow) -> NonTerminalOutputVec {
        let names = |set: &std::collections::BTreeSet<usize>| {
            let mut names: Vec<&str> = set.iter().map(|i| self.get_symbol_name(*i)).collect();
            sort_symbols(&mut names);
            names
        };
        let data = self
            .non_terminal_iter()
            .map(|nt| NonTerminalOutput {
                name: nt.name.as_str(),
                nullable: ff.nullable(nt.index),
                first: names(&ff.first[nt.index]),
                follow: names(&ff.follow[nt.index]),
            })
            .collect();
        NonTerminalOutputVec { data }
    }
}

impl DotProduction {
    fn lookahead_names<'a>(&self, g: &'a Grammar) -> Option<Vec<&'a str>> {
        self.lookahead.as_ref().map(|lookahead| {
            let mut names: Vec<&str> = lookahead.iter().map(|i| g.get_symbol_name(*i)).collect();
            sort_symbols(&mut names);
            names
        })
    }

    /// `A -> a . B c, $/a`
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let body = g.body(self.production);
        let mut right: Vec<&str> = body.iter().map(|s| g.get_symbol_name(*s)).collect();
        right.insert(self.position.min(right.len()), ".");

        let mut output = format!(
            "{} -> {}",
            g.get_symbol_name(self.production.head),
            right.join(" ")
        );
        if let Some(lookahead) = self.lookahead_names(g) {
            output.push_str(", ");
            output.push_str(&lookahead.join("/"));
        }
        output
    }

    pub fn to_latex(&self, g: &Grammar) -> String {
        let body = g.body(self.production);
        let mut right: Vec<String> = body
            .iter()
            .map(|s| escape::tex(g.get_symbol_name(*s)).to_string())
            .collect();
        right.insert(self.position.min(right.len()), "\\cdot".to_string());
        let left = escape::tex(g.get_symbol_name(self.production.head));

        match self.lookahead_names(g) {
            Some(lookahead) => format!(
                "${} \\rightarrow {}$, {}",
                left,
                right.join(" "),
                lookahead
                    .iter()
                    .map(|s| escape::tex(*s))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            None => format!("${} \\rightarrow {}$", left, right.join(" ")),
        }
    }
}

impl LRItem {
    pub fn to_plaintext(&self, g: &Grammar) -> String {
        let kernel = self
            .kernel
            .iter()
            .map(|c| c.to_plaintext(g))
            .collect::<Vec<_>>()
            .join("\n");

        let extend = if !self.extend.is_empty() {
            format!(
                "\n---\n{}",
                self.extend
                    .iter()
                    .map(|c| c.to_plaintext(g))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            String::new()
        };

        let edges = if !self.edges.is_empty() {
            format!(
                "\n===\n{}",
                self.edges
                    .iter()
                    .map(|(k, v)| format!("- {} -> {}", g.get_symbol_name(*k), v))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        } else {
            String::new()
        };

        format!("{}{}{}", kernel, extend, edges)
    }

    pub fn node_to_latex(&self, g: &Grammar, id: usize) -> String {
        let content = self
            .items()
            .map(|e| e.to_latex(g))
            .collect::<Vec<_>>()
            .join(" \\\\ \n");
        format!(
            "\\node [block] (I_{}){}\n{{\n$I_{}$\\\\\n{}\n}};",
            id,
            if id > 0 {
                if id % 2 == 0 {
                    format!(" [below of = I_{}] ", id - 2)
                } else {
                    format!(" [right of = I_{}] ", id - 1)
                }
            } else {
                String::new()
            },
            id,
            content
        )
    }

    pub fn edge_to_latex(&self, g: &Grammar, id: usize) -> String {
        self.edges
            .iter()
            .map(|(e, v)| {
                format!(
                    "\\path [->] (I_{}) edge {} node [above]{{{}}} (I_{});",
                    id,
                    if id == *v { "[loop left]" } else { "[right]" },
                    escape::tex(g.get_symbol_name(*e)),
                    v
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
struct LRStateOutput<'a> {
    kernel: Vec<String>,
    body: Vec<String>,
    edges: Vec<(&'a str, usize)>,
}

#[derive(Serialize)]
struct LRStepOutput<'a> {
    state: usize,
    from: Option<usize>,
    symbol: Option<&'a str>,
    kernel: Vec<String>,
    is_existing_state: bool,
}

#[derive(Serialize)]
struct ReducingLabelOutput<'a> {
    label: &'a str,
    production: String,
}

#[derive(Serialize)]
pub struct LRFSMOutput<'a> {
    kind: super::lr_dfa::LRFSMType,
    start: usize,
    states: Vec<LRStateOutput<'a>>,
    steps: Vec<LRStepOutput<'a>>,
    reducing_labels: Vec<ReducingLabelOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_map: Option<&'a Vec<Vec<usize>>>,
}

impl LRFSM {
    pub fn to_plaintext(&self) -> String {
        let g = &self.grammar;
        let states = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let merged = match &self.merge_map {
                    Some(map) => format!(
                        " (from {})",
                        map[i]
                            .iter()
                            .map(|s| format!("I{}", s))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    None => String::new(),
                };
                format!("I{}{}\n{}", i, merged, s.to_plaintext(g))
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let labels = self
            .reducing_labels
            .iter()
            .map(|r| format!("{}: {}", r.label, g.production_to_string(r.production)))
            .collect::<Vec<_>>()
            .join("\n");

        format!("{}\n\nstart: {}\n\n{}", states, self.start, labels)
    }

    pub fn to_latex(&self) -> String {
        let g = &self.grammar;
        format!(
            "\\begin{{tikzpicture}}[node distance=5cm,block/.style={{state, rectangle, text width=6em}}]\n{}\n\\end{{tikzpicture}}",
            self.states
                .iter()
                .enumerate()
                .map(|(i, s)| s.node_to_latex(g, i))
                .chain(self.states.iter().enumerate().map(|(i, s)| s.edge_to_latex(g, i)))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }

    pub fn to_output(&self) -> LRFSMOutput {
        let g = &self.grammar;
        let items = |items: &[DotProduction]| -> Vec<String> {
            items.iter().map(|c| c.to_plaintext(g)).collect()
        };
        LRFSMOutput {
            kind: self.t,
            start: self.start,
            states: self
                .states
                .iter()
                .map(|s| LRStateOutput {
                    kernel: items(&s.kernel),
                    body: items(&s.extend),
                    edges: s
                        .edges
                        .iter()
                        .map(|(symbol, target)| (g.get_symbol_name(*symbol), *target))
                        .collect(),
                })
                .collect(),
            steps: self
                .steps
                .iter()
                .map(|step: &LRStep| LRStepOutput {
                    state: step.state,
                    from: step.from.map(|(from, _)| from),
                    symbol: step.from.map(|(_, symbol)| g.get_symbol_name(symbol)),
                    kernel: items(&step.kernel),
                    is_existing_state: step.is_existing_state,
                })
                .collect(),
            reducing_labels: self
                .reducing_labels
                .iter()
                .map(|r| ReducingLabelOutput {
                    label: r.label.as_str(),
                    production: g.production_to_string(r.production),
                })
                .collect(),
            merge_map: self.merge_map.as_ref(),
        }
    }
}

impl TableCell {
    pub fn to_plaintext(&self, fsm: &LRFSM) -> String {
        match self {
            TableCell::Shift(s) => format!("s{}", s),
            TableCell::Reduce(r) => fsm
                .reducing_label(*r)
                .map(|l| l.to_string())
                .unwrap_or_else(|| format!("r({})", fsm.grammar.production_to_string(*r))),
            TableCell::Goto(s) => s.to_string(),
            TableCell::Accept => "acc".to_string(),
            TableCell::Error => String::new(),
            TableCell::Conflict(moves) => moves
                .iter()
                .map(|m| m.to_plaintext(fsm))
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    pub fn to_latex(&self, fsm: &LRFSM) -> String {
        match self {
            TableCell::Reduce(r) => {
                let g = &fsm.grammar;
                let terminal_set: HashSet<&str> =
                    g.terminal_iter().map(|(_, t)| t.as_str()).collect();
                let body = g.production_to_vec_str(g.production(*r));
                format!(
                    "reduce ${} \\rightarrow {}$",
                    escape::tex(g.get_symbol_name(r.head)),
                    body.iter()
                        .map(|s| symbol_to_latex(s, &terminal_set))
                        .collect::<Vec<_>>()
                        .join(" \\  ")
                )
            }
            TableCell::Shift(s) => format!("shift {}", s),
            TableCell::Accept => "accept".to_string(),
            TableCell::Goto(s) => s.to_string(),
            TableCell::Error => String::new(),
            TableCell::Conflict(moves) => format!(
                "{{\\color{{red}}{}}}",
                moves
                    .iter()
                    .map(|m| m.to_latex(fsm))
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    }
}

#[derive(Serialize)]
pub struct LRParsingTableOutput<'a> {
    terminals: Vec<&'a str>,
    non_terminals: Vec<&'a str>,
    /// One row per state: action cells, then goto cells.
    rows: Vec<Vec<String>>,
    has_conflicts: bool,
}

impl<'a> LRParsingTable<'a> {
    fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.terminals
            .iter()
            .chain(self.non_terminals.iter())
            .cloned()
    }

    fn header(&self) -> Vec<&'a str> {
        let g: &'a Grammar = &self.fsm.grammar;
        self.columns().map(|s| g.get_symbol_name(s)).collect()
    }

    pub fn to_output(&self) -> LRParsingTableOutput<'a> {
        let g: &'a Grammar = &self.fsm.grammar;
        LRParsingTableOutput {
            terminals: self.terminals.iter().map(|s| g.get_symbol_name(*s)).collect(),
            non_terminals: self
                .non_terminals
                .iter()
                .map(|s| g.get_symbol_name(*s))
                .collect(),
            rows: (0..self.rows.len())
                .map(|i| {
                    self.columns()
                        .map(|s| self.cell(i, s).to_plaintext(self.fsm))
                        .collect()
                })
                .collect(),
            has_conflicts: self.has_conflicts,
        }
    }

    pub fn to_plaintext(&self) -> String {
        let mut output: Vec<Vec<String>> = Vec::new();
        output.push(
            std::iter::once(String::new())
                .chain(self.header().into_iter().map(|s| s.to_string()))
                .collect(),
        );
        for i in 0..self.rows.len() {
            output.push(
                std::iter::once(i.to_string())
                    .chain(self.columns().map(|s| self.cell(i, s).to_plaintext(self.fsm)))
                    .collect(),
            );
        }

        let width: Vec<usize> = (0..output[0].len())
            .map(|j| {
                output
                    .iter()
                    .map(|row| row[j].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        output
            .iter()
            .map(|line| {
                line.iter()
                    .enumerate()
                    .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let header: String = format!(
            "\\begin{{tabular}}{{c{}}}\n & \\multicolumn{{{}}}{{c}}{{action}} & \\multicolumn{{{}}}{{|c}}{{goto}}\\\\",
            "|l".repeat(self.terminals.len() + self.non_terminals.len()),
            self.terminals.len(),
            self.non_terminals.len(),
        );

        let first_row = std::iter::once(String::new())
            .chain(self.header().into_iter().map(|s| escape::tex(s).to_string()))
            .collect::<Vec<_>>()
            .join(" & ");

        let content = (0..self.rows.len())
            .map(|i| {
                std::iter::once(i.to_string())
                    .chain(self.columns().map(|s| self.cell(i, s).to_latex(self.fsm)))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join(" \\\\\n");

        format!(
            "{}\n{} \\\\\\hline\n{}\n\\end{{tabular}}",
            header, first_row, content
        )
    }
}
