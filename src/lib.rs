extern crate wasm_bindgen;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod automaton;
pub mod error;
pub mod grammar;
pub use error::{Error, Result};
pub use grammar::Grammar;

use grammar::lr_dfa::LRFSMType;

fn error_json(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

fn to_json<T: Serialize>(value: Result<T>) -> String {
    match value {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|e| error_json(e)),
        Err(e) => error_json(e),
    }
}

/// `action` is one of `""`, `"elf"` (eliminate left recursion), `"lf"` (left
/// factor) or `"cnf"`.
fn transformed(grammar: &str, action: &str) -> Result<Grammar> {
    let g = Grammar::parse(grammar)?;
    Ok(match action {
        "elf" => g.eliminate_left_recursion(),
        "lf" => g.left_factor(),
        "cnf" => g.transform_to_cnf(),
        _ => g,
    })
}

fn lr_fsm(grammar: &str, kind: &str) -> std::result::Result<grammar::lr_dfa::LRFSM, String> {
    let t = LRFSMType::from_name(kind).ok_or_else(|| format!("unknown LR kind '{}'", kind))?;
    Grammar::parse(grammar)
        .and_then(|g| g.to_lr_fsm(t))
        .map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn regex_to_automata_json(regex: &str) -> String {
    to_json(automaton::build_automata(regex))
}

#[wasm_bindgen]
pub fn productions_to_json(grammar: &str, action: &str) -> String {
    match transformed(grammar, action) {
        Ok(g) => to_json(Ok(g.to_production_output_vec())),
        Err(e) => error_json(e),
    }
}

#[wasm_bindgen]
pub fn nullable_first_follow_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => {
            let ff = g.calculate_nullable_first_follow();
            to_json(Ok(g.to_non_terminal_output_vec(&ff)))
        }
        Err(e) => error_json(e),
    }
}

#[wasm_bindgen]
pub fn ll1_table_to_json(grammar: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => to_json(Ok(g.generate_ll1_parsing_table().to_output(&g))),
        Err(e) => error_json(e),
    }
}

#[derive(Serialize)]
struct LRTableOutput<'a> {
    automaton: grammar::pretty_print::LRFSMOutput<'a>,
    table: grammar::pretty_print::LRParsingTableOutput<'a>,
}

/// `kind` is `lr0` (or `slr`), `lr1` or `lalr`. Returns the automaton and its
/// table.
#[wasm_bindgen]
pub fn lr_table_to_json(grammar: &str, kind: &str) -> String {
    let fsm = match lr_fsm(grammar, kind) {
        Ok(fsm) => fsm,
        Err(e) => return error_json(e),
    };
    let table = fsm.to_parsing_table();
    to_json(Ok(LRTableOutput {
        automaton: fsm.to_output(),
        table: table.to_output(),
    }))
}

#[wasm_bindgen]
pub fn ll1_parse_to_json(grammar: &str, input: &str) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => to_json(Ok(g.generate_ll1_parsing_table().parse(&g, input))),
        Err(e) => error_json(e),
    }
}

#[wasm_bindgen]
pub fn lr_parse_to_json(grammar: &str, kind: &str, input: &str) -> String {
    match lr_fsm(grammar, kind) {
        Ok(fsm) => to_json(Ok(fsm.to_parsing_table().parse(input))),
        Err(e) => error_json(e),
    }
}

#[cfg(test)]
mod test_util {
    use std::collections::BTreeSet;

    use crate::grammar::sort_symbols;
    use crate::Grammar;

    pub fn names<'a>(g: &'a Grammar, set: &BTreeSet<usize>) -> Vec<&'a str> {
        let mut names: Vec<&str> = set.iter().map(|i| g.get_symbol_name(*i)).collect();
        sort_symbols(&mut names);
        names
    }

    pub fn bodies<'a>(g: &'a Grammar, name: &str) -> Vec<Vec<&'a str>> {
        let idx = g.get_symbol_index(name).unwrap();
        g.productions(idx)
            .iter()
            .map(|p| g.production_to_vec_str(p))
            .collect()
    }

    pub const EXPRESSION: &str = "E -> T E'
E' -> + T E' | ε
T -> F T'
T' -> * F T' | ε
F -> ( E ) | id";

    pub const LEFT_RECURSIVE_EXPRESSION: &str = "E -> E + T | T
T -> T * F | F
F -> ( E ) | id";
}

#[cfg(test)]
mod parse_tests {
    use crate::grammar::{EPSILON, EPSILON_INDEX};
    use crate::test_util::bodies;

    #[test]
    fn simple_parse() {
        let g = crate::Grammar::parse("S -> a").unwrap();

        let s = g.symbol_table.get("S").unwrap().clone();
        let a = g.symbol_table.get("a").unwrap().clone();
        let epsilon = g.symbol_table.get(EPSILON).unwrap().clone();

        assert_eq!(g.get_symbol_name(s), "S");
        assert_eq!(g.get_symbol_name(a), "a");
        assert_eq!(epsilon, EPSILON_INDEX);
        assert_eq!(g.start_symbol, Some(s));

        assert_eq!(g.symbols[s].non_terminal().unwrap().productions[0], vec![a]);
    }

    #[test]
    fn simple_parse_with_space() {
        let g = crate::Grammar::parse("  S -> a ").unwrap();

        let s = g.symbol_table.get("S").unwrap().clone();
        let a = g.symbol_table.get("a").unwrap().clone();

        assert_eq!(g.symbols[s].non_terminal().unwrap().productions[0], vec![a]);
    }

    #[test]
    fn simple_parse_with_space_and_newline() {
        let g = crate::Grammar::parse("  S -> a \n | b c").unwrap();

        let s = g.symbol_table.get("S").unwrap().clone();
        let a = g.symbol_table.get("a").unwrap().clone();
        let b = g.symbol_table.get("b").unwrap().clone();
        let c = g.symbol_table.get("c").unwrap().clone();

        assert_eq!(g.symbols[s].non_terminal().unwrap().productions[0], vec![a]);
        assert_eq!(
            g.symbols[s].non_terminal().unwrap().productions[1],
            vec![b, c]
        );
    }

    #[test]
    fn heads_declared_later_are_non_terminals() {
        let g = crate::Grammar::parse("S -> A b\nA -> a").unwrap();
        let a = g.get_symbol_index("A").unwrap();
        assert!(g.is_non_terminal(a));
        assert_eq!(g.terminal_iter().count(), 2);
    }

    #[test]
    fn epsilon_forms() {
        let g = crate::Grammar::parse("S -> a S | epsilon | ε\nA -> b |").unwrap();
        assert_eq!(bodies(&g, "S"), vec![vec!["a", "S"], vec![EPSILON]]);
        assert_eq!(bodies(&g, "A"), vec![vec!["b"], vec![EPSILON]]);
    }

    #[test]
    fn repeated_rules_merge() {
        let g = crate::Grammar::parse("S -> a | b\nS -> a | c").unwrap();
        assert_eq!(bodies(&g, "S"), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn start_override() {
        let g = crate::Grammar::parse_with_start("S -> A\nA -> a", Some("A")).unwrap();
        assert_eq!(g.start_symbol, g.get_symbol_index("A"));

        assert_eq!(
            crate::Grammar::parse_with_start("S -> a", Some("a")).unwrap_err(),
            crate::Error::InvalidStartSymbol("a".to_string())
        );
        assert!(crate::Grammar::parse_with_start("S -> a", Some("X")).is_err());
    }

    #[test]
    fn error_reports_line() {
        let e = crate::Grammar::parse("S -> a\n\nS a").unwrap_err();
        assert!(matches!(e, crate::Error::Grammar { line: 3, .. }));
    }

    #[test]
    fn empty_parse() {
        let g = crate::Grammar::parse("  \n  ").unwrap();
        assert_eq!(g.start_symbol, None);
    }

    #[test]
    #[should_panic]
    fn two_rightarrows_parse() {
        let _g = crate::Grammar::parse("S -> a -> b").unwrap();
    }

    #[test]
    #[should_panic]
    fn no_left_parse() {
        let _g = crate::Grammar::parse("-> a b").unwrap();
    }

    #[test]
    #[should_panic]
    fn no_previous_left_parse() {
        let _g = crate::Grammar::parse("| a b\n S -> a").unwrap();
    }

    #[test]
    #[should_panic]
    fn left_contain_space() {
        let _g = crate::Grammar::parse("S a S -> x").unwrap();
    }

    #[test]
    #[should_panic]
    fn end_mark_is_reserved() {
        let _g = crate::Grammar::parse("S -> a $").unwrap();
    }
}

#[cfg(test)]
mod nullable_first_follow_test {
    use crate::grammar::EPSILON;
    use crate::test_util::{names, EXPRESSION};
    use crate::Grammar;

    #[test]
    fn expression_first_follow() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let ff = g.calculate_nullable_first_follow();
        let idx = |name: &str| g.get_symbol_index(name).unwrap();

        assert_eq!(names(&g, &ff.first[idx("E")]), vec!["(", "id"]);
        assert_eq!(names(&g, &ff.first[idx("E'")]), vec!["+", EPSILON]);
        assert_eq!(names(&g, &ff.first[idx("T'")]), vec!["*", EPSILON]);
        assert!(ff.nullable(idx("E'")));
        assert!(!ff.nullable(idx("T")));

        assert_eq!(names(&g, &ff.follow[idx("E")]), vec![")", "$"]);
        assert_eq!(names(&g, &ff.follow[idx("E'")]), vec![")", "$"]);
        assert_eq!(names(&g, &ff.follow[idx("T")]), vec![")", "+", "$"]);
        assert_eq!(names(&g, &ff.follow[idx("F")]), vec![")", "*", "+", "$"]);
    }

    #[test]
    fn sequence_first() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let ff = g.calculate_nullable_first_follow();
        let e1 = g.get_symbol_index("E'").unwrap();
        let t1 = g.get_symbol_index("T'").unwrap();

        assert_eq!(names(&g, &ff.first_of_sequence(&[])), vec![EPSILON]);
        assert_eq!(
            names(&g, &ff.first_of_sequence(&[t1, e1])),
            vec!["*", "+", EPSILON]
        );
    }

    #[test]
    fn mutual_recursion_terminates() {
        let g = Grammar::parse("A -> B c | ε\nB -> A d | e").unwrap();
        let ff = g.calculate_nullable_first_follow();
        let a = g.get_symbol_index("A").unwrap();
        let b = g.get_symbol_index("B").unwrap();
        assert_eq!(names(&g, &ff.first[a]), vec!["d", "e", EPSILON]);
        assert_eq!(names(&g, &ff.first[b]), vec!["d", "e"]);
        assert_eq!(names(&g, &ff.follow[b]), vec!["c"]);
    }

    #[test]
    fn first_follow_output() {
        let g = Grammar::parse("S -> a S | ε").unwrap();
        let ff = g.calculate_nullable_first_follow();
        let output = g.to_non_terminal_output_vec(&ff);
        assert_eq!(output.to_plaintext(), "S | true | a, ε | $");
    }
}

#[cfg(test)]
mod normalization_tests {
    use crate::grammar::EPSILON;
    use crate::test_util::{bodies, LEFT_RECURSIVE_EXPRESSION};
    use crate::Grammar;

    fn assert_no_left_recursion(g: &Grammar) {
        for nt in g.non_terminal_iter() {
            for production in &nt.productions {
                assert_ne!(production.first(), Some(&nt.index), "{}", nt.name);
            }
        }
    }

    fn assert_cnf(g: &Grammar) {
        let start = g.start_symbol.unwrap();
        for p in g.production_refs() {
            let body = g.production(p);
            let ok = match body {
                [t] => g.is_terminal(*t) || (p.head == start && *t == 0),
                [a, b] => g.is_non_terminal(*a) && g.is_non_terminal(*b),
                _ => false,
            };
            assert!(ok, "{}", g.production_to_string(p));
        }
    }

    #[test]
    fn direct_left_recursion() {
        let g = Grammar::parse(LEFT_RECURSIVE_EXPRESSION)
            .unwrap()
            .eliminate_left_recursion();
        assert_no_left_recursion(&g);
        assert_eq!(bodies(&g, "E"), vec![vec!["T", "E'"]]);
        assert_eq!(bodies(&g, "E'"), vec![vec!["+", "T", "E'"], vec![EPSILON]]);
        assert_eq!(bodies(&g, "T'"), vec![vec!["*", "F", "T'"], vec![EPSILON]]);
        assert!(!g.generate_ll1_parsing_table().not_ll1);
    }

    #[test]
    fn indirect_left_recursion() {
        let g = Grammar::parse("S -> A a | b\nA -> S c | d")
            .unwrap()
            .eliminate_left_recursion();
        assert_no_left_recursion(&g);
        assert_eq!(bodies(&g, "A"), vec![vec!["b", "c", "A'"], vec!["d", "A'"]]);
        assert_eq!(bodies(&g, "A'"), vec![vec!["a", "c", "A'"], vec![EPSILON]]);
    }

    #[test]
    fn left_recursion_helper_name_is_fresh() {
        let g = Grammar::parse("A -> A x | y\nA' -> z")
            .unwrap()
            .eliminate_left_recursion();
        assert_eq!(bodies(&g, "A"), vec![vec!["y", "A''"]]);
        assert_eq!(bodies(&g, "A'"), vec![vec!["z"]]);
    }

    #[test]
    fn input_grammar_is_untouched() {
        let g = Grammar::parse(LEFT_RECURSIVE_EXPRESSION).unwrap();
        let _ = g.eliminate_left_recursion();
        let _ = g.left_factor();
        let _ = g.transform_to_cnf();
        assert_eq!(bodies(&g, "E"), vec![vec!["E", "+", "T"], vec!["T"]]);
        assert!(g.get_symbol_index("E'").is_none());
    }

    #[test]
    fn left_factor_longest_prefix() {
        let g = Grammar::parse("S -> a b c | a b d | e").unwrap().left_factor();
        assert_eq!(bodies(&g, "S"), vec![vec!["a", "b", "S'"], vec!["e"]]);
        assert_eq!(bodies(&g, "S'"), vec![vec!["c"], vec!["d"]]);
    }

    #[test]
    fn left_factor_nested() {
        let g = Grammar::parse("S -> a | a b").unwrap().left_factor();
        assert_eq!(bodies(&g, "S"), vec![vec!["a", "S'"]]);
        assert_eq!(bodies(&g, "S'"), vec![vec![EPSILON], vec!["b"]]);
        assert!(!g.generate_ll1_parsing_table().not_ll1);

        let g = Grammar::parse("S -> a b c | a b d | a e").unwrap().left_factor();
        assert_eq!(bodies(&g, "S"), vec![vec!["a", "S''"]]);
        assert_eq!(bodies(&g, "S''"), vec![vec!["b", "S'"], vec!["e"]]);
        assert_eq!(bodies(&g, "S'"), vec![vec!["c"], vec!["d"]]);
    }

    #[test]
    fn cnf_balanced() {
        let g = Grammar::parse("S -> a S b | ε").unwrap().transform_to_cnf();
        assert_cnf(&g);
        assert_eq!(
            bodies(&g, "S"),
            vec![vec!["A₁", "A₀"], vec!["A₂", "A₀"], vec![EPSILON]]
        );
        assert_eq!(bodies(&g, "A₀"), vec![vec!["b"]]);
        assert_eq!(bodies(&g, "A₁"), vec![vec!["A₂", "S"]]);
        assert_eq!(bodies(&g, "A₂"), vec![vec!["a"]]);
    }

    #[test]
    fn cnf_units_and_unreachable() {
        let g = Grammar::parse("S -> A | b\nA -> a\nB -> c")
            .unwrap()
            .transform_to_cnf();
        assert_cnf(&g);
        assert_eq!(bodies(&g, "S"), vec![vec!["b"], vec!["a"]]);
        assert_eq!(g.non_terminal_iter().count(), 1);
        assert!(g.get_symbol_index("c").is_none());
    }

    #[test]
    fn cnf_nullable_loop_terminates() {
        let g = Grammar::parse("S -> S S | ε").unwrap().transform_to_cnf();
        assert_cnf(&g);
        assert_eq!(bodies(&g, "S"), vec![vec!["S", "S"], vec![EPSILON]]);
    }

    #[test]
    fn cnf_keeps_only_reachable_non_terminals() {
        let g = Grammar::parse("S -> A b\nA -> ε").unwrap().transform_to_cnf();
        assert_cnf(&g);
        assert_eq!(bodies(&g, "S"), vec![vec!["b"]]);

        let start = g.start_symbol.unwrap();
        let mut reached = vec![start];
        let mut i = 0;
        while i < reached.len() {
            for p in g.productions(reached[i]) {
                for s in p {
                    if g.is_non_terminal(*s) && !reached.contains(s) {
                        reached.push(*s);
                    }
                }
            }
            i += 1;
        }
        assert_eq!(reached.len(), g.non_terminal_iter().count());
        assert!(g.get_symbol_index("A₀").is_none());
    }

    #[test]
    fn left_recursion_without_base_case() {
        let g = Grammar::parse("S -> A c | d\nA -> A x")
            .unwrap()
            .eliminate_left_recursion();
        assert_eq!(bodies(&g, "S"), vec![vec!["d"]]);
        assert!(g.get_symbol_index("A").is_none());
        assert!(g.get_symbol_index("A'").is_none());

        let g = Grammar::parse("S -> S a").unwrap().eliminate_left_recursion();
        assert_eq!(g.non_terminal_iter().count(), 0);
        assert_eq!(g.start_symbol, None);
    }

    #[test]
    fn cnf_expression() {
        let g = Grammar::parse(LEFT_RECURSIVE_EXPRESSION)
            .unwrap()
            .transform_to_cnf();
        assert_cnf(&g);
        assert!(g.get_symbol_index("T").is_some());
    }
}

#[cfg(test)]
mod ll1_tests {
    use crate::grammar::{ProductionRef, EPSILON};
    use crate::test_util::EXPRESSION;
    use crate::Grammar;

    #[test]
    fn expression_table() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let table = g.generate_ll1_parsing_table();
        let idx = |name: &str| g.get_symbol_index(name).unwrap();

        assert!(!table.not_ll1);
        let p = table.get(idx("E"), idx("id")).unwrap();
        assert_eq!(g.production_to_string(p), "E → T E'");
        let p = table.get(idx("E'"), idx(")")).unwrap();
        assert_eq!(g.production_to_string(p), format!("E' → {}", EPSILON));
        assert!(table.get(idx("E"), idx("+")).is_none());
    }

    #[test]
    fn first_installed_wins() {
        let g = Grammar::parse("S -> a | a b").unwrap();
        let s = g.get_symbol_index("S").unwrap();
        let a = g.get_symbol_index("a").unwrap();
        let table = g.generate_ll1_parsing_table();

        assert!(table.not_ll1);
        assert_eq!(table.cells.len(), 1);
        assert_eq!(table.get(s, a), Some(ProductionRef { head: s, index: 0 }));
    }

    #[test]
    fn predictive_parse() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let result = g.generate_ll1_parsing_table().parse(&g, "id + id * id");

        assert!(result.success, "{:?}", result.error);
        let tree = result.tree.unwrap();
        assert_eq!(tree.symbol, "E");
        let leaves: Vec<&str> = tree
            .frontier()
            .into_iter()
            .filter(|s| *s != EPSILON)
            .collect();
        assert_eq!(leaves, vec!["id", "+", "id", "*", "id"]);

        assert_eq!(result.trace[0].stack, vec!["$", "E"]);
        assert_eq!(result.trace[1].production.as_deref(), Some("E → T E'"));
        assert_eq!(
            result.trace.last().unwrap().production.as_deref(),
            Some("match $")
        );
    }

    #[test]
    fn epsilon_leaf() {
        let g = Grammar::parse("S -> a S | ε").unwrap();
        let result = g.generate_ll1_parsing_table().parse(&g, "a");
        let tree = result.tree.unwrap();
        assert_eq!(tree.frontier(), vec!["a", EPSILON]);
    }

    #[test]
    fn predictive_errors() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let table = g.generate_ll1_parsing_table();

        let result = table.parse(&g, "id +");
        assert!(!result.success);
        assert!(result.tree.is_none());
        assert!(result.error.unwrap().contains("no production rule for T"));

        let result = table.parse(&g, "id ?");
        assert!(!result.success);

        let g = Grammar::parse("S -> a").unwrap();
        let result = g.generate_ll1_parsing_table().parse(&g, "a a");
        assert_eq!(
            result.error.as_deref(),
            Some("Invalid input: unexpected tokens \"a\"")
        );
        assert!(result.trace.len() > 1);
    }
}

#[cfg(test)]
mod lr_tests {
    use crate::grammar::{
        lr_dfa::LRFSMType,
        lr_parsing_table::TableCell,
        parse_tree::ParseTreeNode,
    };
    use crate::test_util::LEFT_RECURSIVE_EXPRESSION;
    use crate::Grammar;

    const ASSIGNMENT: &str = "S -> L = R | R
L -> * R | id
R -> L";

    const REDUCE_REDUCE: &str = "S -> a A d | b B d | a B e | b A e
A -> c
B -> c";

    #[test]
    fn slr_parentheses() {
        let fsm = Grammar::parse("S -> ( S ) | a")
            .unwrap()
            .to_lr_fsm(LRFSMType::LR0)
            .unwrap();
        let table = fsm.to_parsing_table();

        assert!(!table.has_conflicts);
        for input in ["a", "( a )", "( ( a ) )"] {
            assert!(table.parse(input).success, "{}", input);
        }
        for input in ["( a", "a )", ""] {
            let result = table.parse(input);
            assert!(!result.success, "{}", input);
            assert!(result.error.unwrap().starts_with("Syntax error"));
        }
    }

    #[test]
    fn slr_single_production() {
        let fsm = Grammar::parse("S -> a").unwrap().to_lr_fsm(LRFSMType::LR0).unwrap();
        let result = fsm.to_parsing_table().parse("a");

        assert!(result.success);
        assert_eq!(
            result.tree,
            Some(ParseTreeNode {
                symbol: "S".to_string(),
                children: vec![ParseTreeNode::leaf("a")],
            })
        );
        let actions: Vec<&str> = result.trace.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["start", "shift 2", "reduce r1 (S → a)", "accept"]);
    }

    #[test]
    fn augmented_start() {
        let fsm = Grammar::parse("S -> a\nS' -> b").unwrap().to_lr_fsm(LRFSMType::LR0).unwrap();
        let head = fsm.accept_production.head;
        assert_eq!(fsm.grammar.get_symbol_name(head), "S''");
        assert_eq!(fsm.states[0].kernel.len(), 1);
        assert_eq!(fsm.states[0].extend.len(), 1);
    }

    #[test]
    fn reducing_labels_follow_state_order() {
        let fsm = Grammar::parse("S -> ( S ) | a")
            .unwrap()
            .to_lr_fsm(LRFSMType::LR0)
            .unwrap();
        let labels: Vec<(&str, String)> = fsm
            .reducing_labels
            .iter()
            .map(|r| (r.label.as_str(), fsm.grammar.production_to_string(r.production)))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("r1", "S → a".to_string()),
                ("r2", "S → ( S )".to_string())
            ]
        );
    }

    #[test]
    fn slr_conflict_lr1_resolves() {
        let g = Grammar::parse(ASSIGNMENT).unwrap();

        let slr = g.to_lr_fsm(LRFSMType::LR0).unwrap();
        let table = slr.to_parsing_table();
        assert!(table.has_conflicts);
        let conflict = (0..slr.states.len())
            .flat_map(|i| table.rows[i].values())
            .find(|c| c.is_conflict())
            .unwrap();
        match conflict {
            TableCell::Conflict(moves) => {
                assert!(matches!(moves[0], TableCell::Shift(_)));
                assert!(matches!(moves[1], TableCell::Reduce(_)));
                assert_eq!(conflict.resolve(), &moves[0]);
            }
            _ => unreachable!(),
        }

        let lr1 = g.to_lr_fsm(LRFSMType::LR1).unwrap();
        assert!(!lr1.to_parsing_table().has_conflicts);
        assert_eq!(lr1.states.len(), 14);

        let lalr = g.to_lr_fsm(LRFSMType::LALR).unwrap();
        let lalr_table = lalr.to_parsing_table();
        assert!(!lalr_table.has_conflicts);
        assert_eq!(lalr.states.len(), 10);
        assert!(lalr_table.parse("* id = id").success);
        assert!(!lalr_table.parse("id = = id").success);

        let merge_map = lalr.merge_map.as_ref().unwrap();
        assert_eq!(merge_map[0], vec![0]);
        assert_eq!(merge_map.iter().map(|m| m.len()).sum::<usize>(), 14);
    }

    #[test]
    fn lalr_never_has_more_states() {
        for grammar in [ASSIGNMENT, REDUCE_REDUCE, LEFT_RECURSIVE_EXPRESSION, "S -> ( S ) | a"] {
            let g = Grammar::parse(grammar).unwrap();
            let lr1 = g.to_lr_fsm(LRFSMType::LR1).unwrap();
            let lalr = g.to_lr_fsm(LRFSMType::LALR).unwrap();
            assert!(lalr.states.len() <= lr1.states.len(), "{}", grammar);
        }
    }

    #[test]
    fn lalr_merge_adds_reduce_reduce_conflict() {
        let g = Grammar::parse(REDUCE_REDUCE).unwrap();
        let lr1 = g.to_lr_fsm(LRFSMType::LR1).unwrap();
        assert!(!lr1.to_parsing_table().has_conflicts);

        let lalr = g.to_lr_fsm(LRFSMType::LALR).unwrap();
        let table = lalr.to_parsing_table();
        assert!(table.has_conflicts);
        let reduce_reduce = table.rows.iter().flat_map(|r| r.values()).any(|c| match c {
            TableCell::Conflict(moves) => moves.iter().all(|m| matches!(m, TableCell::Reduce(_))),
            _ => false,
        });
        assert!(reduce_reduce);
        // resolution picks the first reduce, so the parse still completes
        assert!(table.parse("a c d").success);
    }

    #[test]
    fn left_recursive_expression() {
        let g = Grammar::parse(LEFT_RECURSIVE_EXPRESSION).unwrap();
        for t in [LRFSMType::LR0, LRFSMType::LR1, LRFSMType::LALR] {
            let fsm = g.to_lr_fsm(t).unwrap();
            let table = fsm.to_parsing_table();
            assert!(!table.has_conflicts, "{:?}", t);
            let result = table.parse("id + id * id");
            assert!(result.success, "{:?}", t);
            assert_eq!(
                result.tree.unwrap().frontier(),
                vec!["id", "+", "id", "*", "id"]
            );
        }
    }

    #[test]
    fn epsilon_reduction() {
        let fsm = Grammar::parse("S -> A b\nA -> ε").unwrap().to_lr_fsm(LRFSMType::LR1).unwrap();
        let result = fsm.to_parsing_table().parse("b");
        assert!(result.success);
        let tree = result.tree.unwrap();
        assert_eq!(tree.children[0], ParseTreeNode::leaf("A"));
        assert_eq!(tree.children[1], ParseTreeNode::leaf("b"));
    }

    #[test]
    fn ambiguous_grammar_prefers_shift() {
        let fsm = Grammar::parse("E -> E + E | id").unwrap().to_lr_fsm(LRFSMType::LR0).unwrap();
        let table = fsm.to_parsing_table();
        assert!(table.has_conflicts);
        let result = table.parse("id + id + id");
        assert!(result.success);
        // shifting first groups to the right
        let tree = result.tree.unwrap();
        assert_eq!(tree.children[0].frontier(), vec!["id"]);
        assert!(result.trace.iter().any(|s| s.action.ends_with("(conflict resolved)")));
    }

    #[test]
    fn end_mark_inside_input_is_rejected() {
        let g = Grammar::parse("S -> a").unwrap();
        for t in [LRFSMType::LR0, LRFSMType::LR1, LRFSMType::LALR] {
            let fsm = g.to_lr_fsm(t).unwrap();
            let result = fsm.to_parsing_table().parse("a $ b");
            assert!(!result.success, "{:?}", t);
            assert!(result.tree.is_none());
            assert_eq!(
                result.error.as_deref(),
                Some("Invalid input: unexpected tokens \"$ b\"")
            );
            assert!(fsm.to_parsing_table().parse("a").success, "{:?}", t);
        }
        let result = g.generate_ll1_parsing_table().parse(&g, "a $ b");
        assert!(!result.success);
    }

    #[test]
    fn missing_start_production() {
        let g = Grammar::parse("").unwrap();
        assert_eq!(
            g.to_lr_fsm(LRFSMType::LR0).unwrap_err(),
            crate::Error::MissingStartProduction
        );
    }

    #[test]
    fn json_exports() {
        let json = crate::lr_table_to_json("S -> a", "slr");
        assert!(json.contains("\"has_conflicts\":false"));
        let json = crate::lr_parse_to_json("S -> a", "lalr", "a");
        assert!(json.contains("\"success\":true"));
        let json = crate::ll1_parse_to_json("S -> a -> b", "a");
        assert!(json.starts_with("{\"error\":"));
        let json = crate::regex_to_automata_json("(a|b)*abb");
        assert!(json.contains("\"min_dfa\""));
    }
}
