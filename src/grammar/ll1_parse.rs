use crate::Grammar;

use super::{
    ll1_parsing_table::LL1ParsingTable,
    parse_tree::{ParseResult, ParseStep, ParseTreeNode},
    tokenize, END_MARK, END_MARK_INDEX, EPSILON, MAX_PARSE_STEPS,
};

/// Nodes are created top-down before their children are known, so the tree
/// is grown in an arena and nested at the end.
struct TreeArena {
    nodes: Vec<(String, Vec<usize>)>,
}

impl TreeArena {
    fn add(&mut self, symbol: &str) -> usize {
        self.nodes.push((symbol.to_string(), Vec::new()));
        self.nodes.len() - 1
    }

    fn attach(&mut self, parent: usize, symbol: &str) -> usize {
        let child = self.add(symbol);
        self.nodes[parent].1.push(child);
        child
    }

    fn build(&self, node: usize) -> ParseTreeNode {
        let (symbol, children) = &self.nodes[node];
        ParseTreeNode {
            symbol: symbol.clone(),
            children: children.iter().map(|c| self.build(*c)).collect(),
        }
    }
}

impl LL1ParsingTable {
    /// Table-driven predictive parse of whitespace-separated `input`.
    pub fn parse(&self, g: &Grammar, input: &str) -> ParseResult<ParseStep> {
        let tokens = tokenize(input);
        let mut trace: Vec<ParseStep> = Vec::new();
        let start = match g.start_symbol {
            Some(start) => start,
            None => return ParseResult::failed(trace, "grammar has no start symbol".to_string()),
        };

        let mut arena = TreeArena { nodes: Vec::new() };
        let root = arena.add(g.get_symbol_name(start));
        // (symbol, tree node); `$` at the bottom has no node
        let mut stack: Vec<(usize, Option<usize>)> = vec![(END_MARK_INDEX, None), (start, Some(root))];
        let mut pos = 0;

        let snapshot = |stack: &[(usize, Option<usize>)], pos: usize, production: Option<String>| {
            ParseStep {
                stack: stack
                    .iter()
                    .map(|(s, _)| g.get_symbol_name(*s).to_string())
                    .collect(),
                input: tokens[pos..].to_vec(),
                production,
            }
        };
        trace.push(snapshot(&stack, pos, None));

        while let Some((symbol, node)) = stack.pop() {
            if trace.len() > MAX_PARSE_STEPS {
                log::warn!("LL(1) parse stopped after {} steps", MAX_PARSE_STEPS);
                return ParseResult::failed(
                    trace,
                    format!("Parse step limit reached ({})", MAX_PARSE_STEPS),
                );
            }
            let token = tokens[pos].as_str();
            let lookahead = g.get_symbol_index(token).filter(|t| g.is_terminal(*t));

            if symbol == END_MARK_INDEX {
                if token != END_MARK || pos + 1 != tokens.len() {
                    return ParseResult::failed(
                        trace,
                        format!(
                            "Invalid input: unexpected tokens \"{}\"",
                            tokens[pos..tokens.len() - 1].join(" ")
                        ),
                    );
                }
                trace.push(snapshot(&stack, pos, Some(format!("match {}", END_MARK))));
                break;
            }

            if g.is_terminal(symbol) {
                if lookahead != Some(symbol) {
                    return ParseResult::failed(
                        trace,
                        format!(
                            "Unexpected token \"{}\", expected \"{}\"",
                            token,
                            g.get_symbol_name(symbol)
                        ),
                    );
                }
                pos += 1;
                trace.push(snapshot(&stack, pos, Some(format!("match {}", token))));
                continue;
            }

            let production = match lookahead.and_then(|t| self.get(symbol, t)) {
                Some(production) => production,
                None => {
                    return ParseResult::failed(
                        trace,
                        format!(
                            "Unable to parse: no production rule for {} with token \"{}\"",
                            g.get_symbol_name(symbol),
                            token
                        ),
                    )
                }
            };

            let body = g.body(production);
            if let Some(parent) = node {
                if body.is_empty() {
                    arena.attach(parent, EPSILON);
                } else {
                    let children: Vec<usize> = body
                        .iter()
                        .map(|s| arena.attach(parent, g.get_symbol_name(*s)))
                        .collect();
                    for (s, child) in body.iter().zip(children).rev() {
                        stack.push((*s, Some(child)));
                    }
                }
            }
            trace.push(snapshot(
                &stack,
                pos,
                Some(g.production_to_string(production)),
            ));
        }

        ParseResult::accepted(arena.build(root), trace)
    }
}
