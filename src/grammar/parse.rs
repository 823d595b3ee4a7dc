use crate::error::{Error, Result};
use crate::Grammar;

use super::{END_MARK, EPSILON, EPSILON_INDEX, EPSILON_WORD};

impl Grammar {
    pub fn parse(grammar: &str) -> Result<Self> {
        Self::parse_with_start(grammar, None)
    }

    /// Reads `A -> α | β` rules, one per line. A line starting with `|`
    /// continues the previous rule. The start symbol is `start` if given,
    /// otherwise the head of the first rule.
    pub fn parse_with_start(grammar: &str, start: Option<&str>) -> Result<Self> {
        let mut g = Self::new();

        let mut raw_productions: Vec<(usize, usize, &str)> = Vec::new();

        let mut previous_left: Option<usize> = None;
        for (i, line) in grammar.lines().enumerate() {
            let line_no = i + 1;
            if line.chars().all(|c| c.is_whitespace()) {
                continue;
            }
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() > 2 {
                return Err(Error::grammar(line_no, "too many \"->\""));
            }
            let (left, rights): (usize, &str) = if parts.len() == 2 {
                let left_str = parts[0].trim();
                if left_str.is_empty() {
                    return Err(Error::grammar(line_no, "empty left side"));
                } else if left_str.split_whitespace().count() != 1 {
                    return Err(Error::grammar(line_no, "left side contains whitespace"));
                } else if left_str == END_MARK || left_str == EPSILON || left_str == EPSILON_WORD
                {
                    return Err(Error::grammar(
                        line_no,
                        format!("\"{}\" is reserved", left_str),
                    ));
                }
                let left = match g.get_symbol_index(left_str) {
                    Some(idx) => idx,
                    None => g.add_non_terminal(left_str),
                };
                (left, parts[1].trim())
            } else {
                let continuation = parts[0].trim();
                match (continuation.strip_prefix('|'), previous_left) {
                    (Some(rest), Some(idx)) => (idx, rest.trim()),
                    (Some(_), None) => {
                        return Err(Error::grammar(line_no, "cannot find left side"))
                    }
                    (None, _) => return Err(Error::grammar(line_no, "missing \"->\"")),
                }
            };

            previous_left = Some(left);

            raw_productions.push((line_no, left, rights));
        }

        // every head is known now, so the remaining names are terminals
        for (line_no, left, rights) in raw_productions {
            for right in rights.split('|') {
                let mut symbols: Vec<usize> = Vec::new();
                for s in right.split_whitespace() {
                    let idx = match s {
                        EPSILON | EPSILON_WORD => continue,
                        END_MARK => {
                            return Err(Error::grammar(line_no, "\"$\" is reserved"));
                        }
                        _ => match g.get_symbol_index(s) {
                            Some(idx) => idx,
                            None => g.add_terminal(s.to_string()),
                        },
                    };
                    symbols.push(idx);
                }
                if symbols.is_empty() {
                    if right.trim().is_empty() {
                        log::warn!(
                            "line {}: empty production for \"{}\" read as {}",
                            line_no,
                            g.get_symbol_name(left),
                            EPSILON
                        );
                    }
                    symbols.push(EPSILON_INDEX);
                }
                g.add_production(left, symbols);
            }
        }

        g.start_symbol = match start {
            Some(name) => match g.get_symbol_index(name) {
                Some(idx) if g.is_non_terminal(idx) => Some(idx),
                _ => return Err(Error::InvalidStartSymbol(name.to_string())),
            },
            None => g.non_terminal_iter().next().map(|nt| nt.index),
        };

        log::debug!(
            "grammar: {} non-terminals, {} terminals, {} productions",
            g.non_terminal_iter().count(),
            g.terminal_iter().count(),
            g.production_refs().len()
        );

        Ok(g)
    }
}
