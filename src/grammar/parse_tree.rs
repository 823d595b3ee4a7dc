use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseTreeNode {
    pub symbol: String,
    pub children: Vec<ParseTreeNode>,
}

impl ParseTreeNode {
    pub fn leaf(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            children: Vec::new(),
        }
    }

    /// Leaf symbols, left to right.
    pub fn frontier(&self) -> Vec<&str> {
        if self.children.is_empty() {
            return vec![self.symbol.as_str()];
        }
        self.children.iter().flat_map(|c| c.frontier()).collect()
    }

    /// Indented outline, one node per line.
    pub fn to_plaintext(&self) -> String {
        fn walk(node: &ParseTreeNode, depth: usize, out: &mut Vec<String>) {
            out.push(format!("{}{}", "  ".repeat(depth), node.symbol));
            for child in &node.children {
                walk(child, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(self, 0, &mut out);
        out.join("\n")
    }
}

/// One row of a predictive parse trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStep {
    /// Bottom to top.
    pub stack: Vec<String>,
    pub input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<String>,
}

/// One row of a shift-reduce trace: the configuration before `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftReduceStep {
    pub state_stack: Vec<usize>,
    pub symbol_stack: Vec<String>,
    pub input: Vec<String>,
    pub action: String,
}

/// Outcome of running a table against sample input. Never an `Err`: failures
/// carry the trace up to the fault and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult<S> {
    pub tree: Option<ParseTreeNode>,
    pub trace: Vec<S>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<S> ParseResult<S> {
    pub fn accepted(tree: ParseTreeNode, trace: Vec<S>) -> Self {
        Self {
            tree: Some(tree),
            trace,
            success: true,
            error: None,
        }
    }

    pub fn failed(trace: Vec<S>, error: String) -> Self {
        log::debug!("parse failed: {}", error);
        Self {
            tree: None,
            trace,
            success: false,
            error: Some(error),
        }
    }
}
