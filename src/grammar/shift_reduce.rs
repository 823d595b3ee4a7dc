use super::{
    lr_parsing_table::{LRParsingTable, TableCell, ERROR_CELL},
    parse_tree::{ParseResult, ParseTreeNode, ShiftReduceStep},
    tokenize, MAX_PARSE_STEPS,
};

impl LRParsingTable<'_> {
    fn format_action(&self, cell: &TableCell) -> String {
        let g = &self.fsm.grammar;
        match cell {
            TableCell::Accept => "accept".to_string(),
            TableCell::Error => "error".to_string(),
            TableCell::Goto(state) => format!("goto {}", state),
            TableCell::Shift(state) => format!("shift {}", state),
            TableCell::Reduce(production) => format!(
                "reduce {} ({})",
                self.fsm.reducing_label(*production).unwrap_or("r?"),
                g.production_to_string(*production)
            ),
            TableCell::Conflict(_) => format!("{} (conflict resolved)", self.format_action(cell.resolve())),
        }
    }

    /// Shift-reduce parse of whitespace-separated `input`. The state, symbol
    /// and node stacks move in lock-step.
    pub fn parse(&self, input: &str) -> ParseResult<ShiftReduceStep> {
        let g = &self.fsm.grammar;
        let tokens = tokenize(input);
        let mut pos = 0;

        let mut state_stack: Vec<usize> = vec![self.fsm.start];
        let mut symbol_stack: Vec<String> = Vec::new();
        let mut node_stack: Vec<ParseTreeNode> = Vec::new();
        let mut trace: Vec<ShiftReduceStep> = Vec::new();

        let snapshot = |state_stack: &[usize], symbol_stack: &[String], pos: usize, action: String| {
            ShiftReduceStep {
                state_stack: state_stack.to_vec(),
                symbol_stack: symbol_stack.to_vec(),
                input: tokens[pos..].to_vec(),
                action,
            }
        };
        trace.push(snapshot(&state_stack, &symbol_stack, pos, "start".to_string()));

        loop {
            if trace.len() > MAX_PARSE_STEPS {
                log::warn!("shift-reduce parse stopped after {} steps", MAX_PARSE_STEPS);
                return ParseResult::failed(
                    trace,
                    format!("Parse step limit reached ({})", MAX_PARSE_STEPS),
                );
            }

            let state = state_stack.last().cloned().unwrap_or(self.fsm.start);
            let token = tokens[pos].as_str();
            let cell = match g.get_symbol_index(token).filter(|t| g.is_terminal(*t)) {
                Some(t) => self.cell(state, t),
                None => &ERROR_CELL,
            };
            let action = self.format_action(cell);

            match cell.resolve() {
                TableCell::Accept => {
                    // a literal `$` in the input is not the end of it
                    if pos + 1 != tokens.len() {
                        return ParseResult::failed(
                            trace,
                            format!(
                                "Invalid input: unexpected tokens \"{}\"",
                                tokens[pos..tokens.len() - 1].join(" ")
                            ),
                        );
                    }
                    trace.push(snapshot(&state_stack, &symbol_stack, pos, action));
                    return match node_stack.pop() {
                        Some(tree) => ParseResult::accepted(tree, trace),
                        None => ParseResult::failed(trace, "Accepted with an empty stack".to_string()),
                    };
                }
                TableCell::Shift(next) => {
                    trace.push(snapshot(&state_stack, &symbol_stack, pos, action));
                    state_stack.push(*next);
                    symbol_stack.push(token.to_string());
                    node_stack.push(ParseTreeNode::leaf(token));
                    pos += 1;
                }
                TableCell::Reduce(production) => {
                    trace.push(snapshot(&state_stack, &symbol_stack, pos, action));
                    let len = g.body(*production).len();
                    if len > state_stack.len() - 1 || len > node_stack.len() {
                        return ParseResult::failed(
                            trace,
                            format!("Stack underflow reducing {}", g.production_to_string(*production)),
                        );
                    }
                    state_stack.truncate(state_stack.len() - len);
                    symbol_stack.truncate(symbol_stack.len() - len);
                    let children = node_stack.split_off(node_stack.len() - len);

                    let head = production.head;
                    let exposed = state_stack.last().cloned().unwrap_or(self.fsm.start);
                    let target = match self.cell(exposed, head) {
                        TableCell::Goto(target) => *target,
                        _ => {
                            log::error!(
                                "no goto from state {} on {}",
                                exposed,
                                g.get_symbol_name(head)
                            );
                            return ParseResult::failed(
                                trace,
                                format!(
                                    "Goto error: no goto for state {}, non-terminal '{}'",
                                    exposed,
                                    g.get_symbol_name(head)
                                ),
                            );
                        }
                    };
                    state_stack.push(target);
                    symbol_stack.push(g.get_symbol_name(head).to_string());
                    node_stack.push(ParseTreeNode {
                        symbol: g.get_symbol_name(head).to_string(),
                        children,
                    });
                }
                TableCell::Error | TableCell::Goto(_) | TableCell::Conflict(_) => {
                    trace.push(snapshot(
                        &state_stack,
                        &symbol_stack,
                        pos,
                        format!("error: no action for state {}, symbol '{}'", state, token),
                    ));
                    return ParseResult::failed(
                        trace,
                        format!("Syntax error: unexpected '{}' in state {}", token, state),
                    );
                }
            }
        }
    }
}
