//! Recursive-descent regex parser.
//!
//! Precedence from low to high: union, concatenation, postfix (`*` `+` `?`),
//! then atoms: groups, `[..]` classes, `\` escapes, `ε` and literals.

use std::fmt;

use serde::Serialize;

use super::EPSILON_CHAR;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexNode {
    Literal(char),
    Epsilon,
    Concat(Box<RegexNode>, Box<RegexNode>),
    Union(Box<RegexNode>, Box<RegexNode>),
    Star(Box<RegexNode>),
    Plus(Box<RegexNode>),
    Optional(Box<RegexNode>),
}

const EPSILON_WORD: &str = "epsilon";

const SPECIAL: &[char] = &['|', '*', '+', '?', '(', ')', '[', ']', '\\'];

impl fmt::Display for RegexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(node: &RegexNode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match node {
                RegexNode::Union(..) => write!(f, "({})", node),
                _ => write!(f, "{}", node),
            }
        }
        fn postfix(node: &RegexNode, op: char, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match node {
                RegexNode::Union(..) | RegexNode::Concat(..) => write!(f, "({}){}", node, op),
                _ => write!(f, "{}{}", node, op),
            }
        }

        match self {
            RegexNode::Literal(c) if SPECIAL.contains(c) || *c == EPSILON_CHAR => {
                write!(f, "\\{}", c)
            }
            RegexNode::Literal(c) => write!(f, "{}", c),
            RegexNode::Epsilon => write!(f, "{}", EPSILON_CHAR),
            RegexNode::Concat(l, r) => {
                operand(l, f)?;
                operand(r, f)
            }
            RegexNode::Union(l, r) => write!(f, "{}|{}", l, r),
            RegexNode::Star(c) => postfix(c, '*', f),
            RegexNode::Plus(c) => postfix(c, '+', f),
            RegexNode::Optional(c) => postfix(c, '?', f),
        }
    }
}

struct RegexParser {
    input: Vec<char>,
    pos: usize,
}

impl RegexParser {
    /// Leading whitespace is skipped rather than trimmed, so error positions
    /// index into `input` as given.
    fn new(input: &str) -> Self {
        let input: Vec<char> = input.trim_end().chars().collect();
        let pos = input.iter().take_while(|c| c.is_whitespace()).count();
        Self { input, pos }
    }

    fn at_word(&self, word: &str) -> bool {
        let mut i = self.pos;
        for w in word.chars() {
            if self.input.get(i) != Some(&w) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).cloned()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn parse(&mut self) -> Result<RegexNode> {
        let node = self.parse_union()?;
        if let Some(c) = self.peek() {
            return Err(Error::regex(
                format!("unexpected character '{}'", c),
                self.pos,
            ));
        }
        Ok(node)
    }

    fn parse_union(&mut self) -> Result<RegexNode> {
        let mut left = self.parse_concat()?;
        while self.peek() == Some('|') {
            self.bump();
            let right = self.parse_concat()?;
            left = RegexNode::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// An empty concatenation (as in `a|` or `()`) is ε.
    fn parse_concat(&mut self) -> Result<RegexNode> {
        let mut result: Option<RegexNode> = None;
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let part = self.parse_postfix()?;
            result = Some(match result {
                Some(left) => RegexNode::Concat(Box::new(left), Box::new(part)),
                None => part,
            });
        }
        Ok(result.unwrap_or(RegexNode::Epsilon))
    }

    fn parse_postfix(&mut self) -> Result<RegexNode> {
        let mut node = self.parse_atom()?;
        loop {
            node = match self.peek() {
                Some('*') => RegexNode::Star(Box::new(node)),
                Some('+') => RegexNode::Plus(Box::new(node)),
                Some('?') => RegexNode::Optional(Box::new(node)),
                _ => break,
            };
            self.bump();
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<RegexNode> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let node = self.parse_union()?;
                if self.peek() != Some(')') {
                    return Err(Error::regex("expected ')'", self.pos));
                }
                self.bump();
                Ok(node)
            }
            Some('[') => self.parse_char_class(),
            Some(_) if self.at_word(EPSILON_WORD) => {
                self.pos += EPSILON_WORD.chars().count();
                Ok(RegexNode::Epsilon)
            }
            Some(EPSILON_CHAR) => {
                self.bump();
                Ok(RegexNode::Epsilon)
            }
            Some('\\') => {
                self.bump();
                match self.bump() {
                    Some(c) => Ok(RegexNode::Literal(c)),
                    None => Err(Error::regex("unexpected end of input after '\\'", self.pos)),
                }
            }
            Some(c @ ('*' | '+' | '?')) => Err(Error::regex(
                format!("'{}' has nothing to repeat", c),
                self.pos,
            )),
            None | Some(')') | Some('|') => {
                Err(Error::regex("unexpected character", self.pos))
            }
            Some(c) => {
                self.bump();
                Ok(RegexNode::Literal(c))
            }
        }
    }

    /// `[a-z]`, `[abc]`, `[a-zA-Z0-9]`: expanded eagerly into a union of
    /// literals. A `-` right before `]` is a literal.
    fn parse_char_class(&mut self) -> Result<RegexNode> {
        let open = self.pos;
        self.bump();
        let mut chars: Vec<char> = Vec::new();

        while let Some(start) = self.peek() {
            if start == ']' {
                break;
            }
            self.bump();
            let is_range = self.peek() == Some('-')
                && matches!(self.input.get(self.pos + 1), Some(c) if *c != ']');
            if is_range {
                self.bump();
                let end = self.bump().unwrap_or(start);
                if start > end {
                    return Err(Error::regex(
                        format!("invalid range [{}-{}]", start, end),
                        self.pos - 3,
                    ));
                }
                chars.extend(start..=end);
            } else {
                chars.push(start);
            }
        }

        if self.peek() != Some(']') {
            return Err(Error::regex("expected ']'", self.pos));
        }
        self.bump();

        let mut chars = chars.into_iter();
        let first = chars
            .next()
            .ok_or_else(|| Error::regex("empty character class []", open))?;
        Ok(chars.fold(RegexNode::Literal(first), |node, c| {
            RegexNode::Union(Box::new(node), Box::new(RegexNode::Literal(c)))
        }))
    }
}

/// Parses a regular expression. Surrounding whitespace is ignored and the word
/// `epsilon` is read as `ε`.
pub fn parse_regex(input: &str) -> Result<RegexNode> {
    RegexParser::new(input).parse()
}
