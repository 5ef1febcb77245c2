//! Interactive REPL for the Zwerg engine: reads one query per line, runs it
//! against an empty starting stack with the demo vocabulary, and prints
//! every result stack.

use std::io::{self, Write};
use std::process::ExitCode;

use zwerg::builtins::demo::demo_vocabulary;
use zwerg::diagnostics::CollectingSink;
use zwerg::resource::NoLimitTracker;
use zwerg::{Query, Stack};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let voc = demo_vocabulary();

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                eprintln!("error reading {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        return run_line(&source, &voc);
    }

    loop {
        let Some(line) = read_line(">>> ") else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        run_line(&line, &voc);
    }

    ExitCode::SUCCESS
}

fn run_line(src: &str, voc: &zwerg::Vocabulary) -> ExitCode {
    let query = match Query::compile(src, voc) {
        Ok(q) => q,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut results = query.start_with(Stack::new(), CollectingSink::new(), NoLimitTracker);
    let mut count = 0usize;
    for stack in &mut results {
        let rendered: Vec<String> = stack.values().iter().map(|v| v.show(false)).collect();
        println!("[{}]", rendered.join(", "));
        count += 1;
    }
    for diagnostic in &results.diagnostics().diagnostics {
        eprintln!("warning: {}", diagnostic.error);
    }
    if count == 0 {
        eprintln!("(no results)");
    }
    ExitCode::SUCCESS
}

/// Reads one line from stdin after printing a prompt. Returns `None` on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
