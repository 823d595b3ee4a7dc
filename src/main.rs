use compiler_algorithms::{
    automaton,
    grammar::{
        lr_dfa::LRFSMType,
        parse_tree::{ParseResult, ParseStep, ShiftReduceStep},
    },
    Grammar,
};
use serde::Serialize;
use std::{fs, io::Read, process};

const OUTPUTS: [&str; 9] = [
    "prod",
    "nff",
    "ll1",
    "lr0fsm",
    "lr1fsm",
    "lalrfsm",
    "lr0table",
    "lr1table",
    "lalrtable",
];

fn print_help() {
    println!("Usage: compiler-algorithms [actions] outputs [options] [grammar file]");
    println!("       compiler-algorithms -r REGEX [-j]");
    println!("actions:");
    println!("  elf: Eliminate left recursion");
    println!("  lf: Left factorization");
    println!("  cnf: Chomsky normal form");
    println!("outputs:");
    println!("  prod: Productions");
    println!("  nff: Nullable first and follow");
    println!("  ll1: LL(1) parsing table");
    println!("  lr0fsm: LR(0) Automata");
    println!("  lr1fsm: LR(1) Automata");
    println!("  lalrfsm: LALR Automata");
    println!("  lr0table: SLR parsing table");
    println!("  lr1table: LR(1) parsing table");
    println!("  lalrtable: LALR parsing table");
    println!("options:");
    println!("  -h: Print this help");
    println!("  -l: Print in LaTeX format");
    println!("  -j: Print in JSON format");
    println!("  -s START: Use START as the start symbol");
    println!("  -p INPUT: Parse space separated INPUT with every table output");
    println!("  -r REGEX: Print the automata of REGEX instead of a grammar");
}

enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn json<T: Serialize>(t: &T) -> String {
    serde_json::to_string(t).unwrap_or_else(|e| fail(e))
}

fn print_regex(regex: &str, output_format: &OutputFormat) {
    let output = automaton::build_automata(regex).unwrap_or_else(|e| fail(e));
    match output_format {
        OutputFormat::JSON => println!("{}", json(&output)),
        _ => {
            println!(
                "NFA: {} states, {} transitions",
                output.nfa.states.len(),
                output.nfa.transitions.len()
            );
            println!(
                "DFA: {} states, {} transitions",
                output.dfa.states.len(),
                output.dfa.transition_count()
            );
            println!(
                "Minimized DFA: {} states, {} transitions",
                output.min_dfa.states.len(),
                output.min_dfa.transition_count()
            );
            for (from, row) in &output.min_dfa.transitions {
                for (symbol, to) in row {
                    let accept = if output.min_dfa.accept_states.contains(to) { " (accept)" } else { "" };
                    println!("  {} --{}--> {}{}", from, symbol, to, accept);
                }
            }
        }
    }
}

fn print_ll1_parse(result: &ParseResult<ParseStep>, output_format: &OutputFormat) {
    if let OutputFormat::JSON = output_format {
        println!("{}", json(result));
        return;
    }
    for step in &result.trace {
        println!(
            "{} | {} | {}",
            step.stack.join(" "),
            step.input.join(" "),
            step.production.as_deref().unwrap_or("")
        );
    }
    print_outcome(result);
}

fn print_lr_parse(result: &ParseResult<ShiftReduceStep>, output_format: &OutputFormat) {
    if let OutputFormat::JSON = output_format {
        println!("{}", json(result));
        return;
    }
    for step in &result.trace {
        let states: Vec<String> = step.state_stack.iter().map(|s| s.to_string()).collect();
        println!(
            "{} | {} | {} | {}",
            states.join(" "),
            step.symbol_stack.join(" "),
            step.input.join(" "),
            step.action
        );
    }
    print_outcome(result);
}

fn print_outcome<S>(result: &ParseResult<S>) {
    match (&result.tree, &result.error) {
        (Some(tree), _) => println!("{}", tree.to_plaintext()),
        (None, Some(error)) => println!("{}", error),
        (None, None) => {}
    }
}

fn main() {
    env_logger::init();

    let mut actions: Vec<&str> = Vec::new();
    let mut outputs: Vec<&str> = Vec::new();
    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let mut i: usize = 0;
    while i < args.len() && ["elf", "lf", "cnf"].contains(&args[i].as_str()) {
        actions.push(args[i].as_str());
        i += 1;
    }
    while i < args.len() && OUTPUTS.contains(&args[i].as_str()) {
        outputs.push(args[i].as_str());
        i += 1;
    }

    let mut output_format = OutputFormat::Plain;
    let mut start: Option<&str> = None;
    let mut sample: Option<&str> = None;
    let mut regex: Option<&str> = None;

    while i < args.len() && args[i].starts_with('-') {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-l" => output_format = OutputFormat::LaTeX,
            "-j" => output_format = OutputFormat::JSON,
            flag @ ("-s" | "-p" | "-r") => {
                i += 1;
                let value = match args.get(i) {
                    Some(value) => value.as_str(),
                    None => fail(format!("{} needs a value", flag)),
                };
                match flag {
                    "-s" => start = Some(value),
                    "-p" => sample = Some(value),
                    _ => regex = Some(value),
                }
            }
            other => fail(format!("unknown option {}", other)),
        }
        i += 1;
    }

    if let Some(regex) = regex {
        print_regex(regex, &output_format);
        return;
    }

    if i + 1 < args.len() || outputs.is_empty() {
        print_help();
        return;
    }

    let input: String = if i == args.len() {
        let mut input = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut input) {
            fail(e);
        }
        input
    } else {
        fs::read_to_string(args[i].as_str()).unwrap_or_else(|e| fail(format!("{}: {}", args[i], e)))
    };

    let mut g = Grammar::parse_with_start(&input, start).unwrap_or_else(|e| fail(e));

    for action in actions {
        g = match action {
            "elf" => g.eliminate_left_recursion(),
            "lf" => g.left_factor(),
            _ => g.transform_to_cnf(),
        };
    }

    for output in outputs {
        match output {
            "prod" => {
                let t = g.to_production_output_vec();
                println!(
                    "{}",
                    match output_format {
                        OutputFormat::Plain => t.to_plaintext(),
                        OutputFormat::LaTeX => t.to_latex(),
                        OutputFormat::JSON => json(&t),
                    }
                );
            }
            "nff" => {
                let ff = g.calculate_nullable_first_follow();
                let t = g.to_non_terminal_output_vec(&ff);
                println!(
                    "{}",
                    match output_format {
                        OutputFormat::Plain => t.to_plaintext(),
                        OutputFormat::LaTeX => t.to_latex(),
                        OutputFormat::JSON => json(&t),
                    }
                );
            }
            "ll1" => {
                let table = g.generate_ll1_parsing_table();
                let t = table.to_output(&g);
                println!(
                    "{}",
                    match output_format {
                        OutputFormat::Plain => t.to_plaintext(),
                        OutputFormat::LaTeX => t.to_latex(),
                        OutputFormat::JSON => json(&t),
                    }
                );
                if let Some(sample) = sample {
                    print_ll1_parse(&table.parse(&g, sample), &output_format);
                }
            }
            "lr0fsm" | "lr1fsm" | "lalrfsm" => {
                let kind = output.trim_end_matches("fsm");
                let t = LRFSMType::from_name(kind)
                    .ok_or_else(|| format!("unknown automaton {}", kind))
                    .and_then(|t| g.to_lr_fsm(t).map_err(|e| e.to_string()))
                    .unwrap_or_else(|e| fail(e));
                println!(
                    "{}",
                    match output_format {
                        OutputFormat::Plain => t.to_plaintext(),
                        OutputFormat::LaTeX => t.to_latex(),
                        OutputFormat::JSON => json(&t.to_output()),
                    }
                );
            }
            _ => {
                let kind = output.trim_end_matches("table");
                let fsm = LRFSMType::from_name(kind)
                    .ok_or_else(|| format!("unknown automaton {}", kind))
                    .and_then(|t| g.to_lr_fsm(t).map_err(|e| e.to_string()))
                    .unwrap_or_else(|e| fail(e));
                let t = fsm.to_parsing_table();
                println!(
                    "{}",
                    match output_format {
                        OutputFormat::Plain => t.to_plaintext(),
                        OutputFormat::LaTeX => t.to_latex(),
                        OutputFormat::JSON => json(&t.to_output()),
                    }
                );
                if let Some(sample) = sample {
                    print_lr_parse(&t.parse(sample), &output_format);
                }
            }
        }
    }
}
