use nfa_regex::Regex;

use std::process;

fn print_usage() {
    eprintln!("Usage: nfa-regex <pattern> <string>");
}

fn compile_pattern(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        eprintln!("error: failed to compile pattern: {e}");
        process::exit(1);
    })
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [pattern, subject] = args.as_slice() else {
        print_usage();
        process::exit(1);
    };

    let regex = compile_pattern(pattern);
    match regex.match_prefix(subject) {
        Some(m) => println!("{m}"),
        None => println!("No match found."),
    }
}
