use std::fmt;

/// Construction-time failures. Parse drivers never produce these, they report
/// through `ParseResult` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed regular expression, with the character position of the fault.
    Regex { message: String, position: usize },
    /// Malformed grammar line (1-based).
    Grammar { line: usize, message: String },
    /// The requested start symbol is not a non-terminal of the grammar.
    InvalidStartSymbol(String),
    /// The grammar has no start symbol, or the start symbol has no production.
    MissingStartProduction,
}

impl Error {
    pub fn regex(message: impl Into<String>, position: usize) -> Self {
        Error::Regex {
            message: message.into(),
            position,
        }
    }

    pub fn grammar(line: usize, message: impl Into<String>) -> Self {
        Error::Grammar {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Regex { message, position } => {
                write!(f, "Regex syntax error at position {}: {}", position, message)
            }
            Error::Grammar { line, message } => write!(f, "Line {}: {}", line, message),
            Error::InvalidStartSymbol(name) => {
                write!(f, "Start symbol '{}' is not a non-terminal", name)
            }
            Error::MissingStartProduction => write!(f, "Grammar must have a start production"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
