pub mod cnf;
pub mod eliminate_left_recursion;
pub mod grammar;
pub mod left_factorization;
pub mod ll1_parse;
pub mod ll1_parsing_table;
pub mod lr_dfa;
pub mod lr_parsing_table;
pub mod nullable_first_follow;
pub mod parse;
pub mod parse_tree;
pub mod pretty_print;
pub mod shift_reduce;
pub use grammar::{Grammar, ProductionRef};

pub const EPSILON: &str = "ε";
pub const EPSILON_WORD: &str = "epsilon";
pub const END_MARK: &str = "$";

pub const EPSILON_INDEX: usize = 0;
pub const END_MARK_INDEX: usize = 1;

/// Upper bound on driver iterations. A conflicted table resolved by policy can
/// otherwise loop forever.
pub const MAX_PARSE_STEPS: usize = 10_000;

/// Ordinary symbols alphabetically, then `ε`, then `$`.
pub fn sort_symbols(symbols: &mut [&str]) {
    symbols.sort_by_key(|s| match *s {
        EPSILON => (1, *s),
        END_MARK => (2, *s),
        _ => (0, *s),
    });
}

/// Splits sample input on whitespace and appends the end marker.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .split_whitespace()
        .map(|s| s.to_string())
        .chain(std::iter::once(END_MARK.to_string()))
        .collect()
}
