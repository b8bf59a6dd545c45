#![deny(clippy::expect_used)]
#![allow(clippy::print_stderr)]
//! `rill` command-line entry point: one-file batch mode and an
//! interactive read-eval-print loop.
//!
//! Uses `rustyline` for line editing (`Editor` setup, history file under
//! `$HOME`) and a hand-rolled `Args::parse`, no `clap`. The REPL alternates
//! two prompts (`"> "` fresh, `". "` mid-statement) and exits on an "exit"
//! sentinel line.

use rill_runtime::context::RuntimeContext;
use rill_vm::driver::Jit;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug)]
struct Args {
    file: Option<String>,
    show_help: bool,
    show_version: bool,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut file = None;
        let mut show_help = false;
        let mut show_version = false;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "-h" | "--help" => show_help = true,
                "-v" | "--version" => show_version = true,
                other if !other.starts_with('-') => {
                    if file.is_some() {
                        return Err(format!("unexpected extra argument '{other}'"));
                    }
                    file = Some(other.to_string());
                }
                other => return Err(format!("unknown option '{other}'")),
            }
        }
        Ok(Args {
            file,
            show_help,
            show_version,
        })
    }
}

fn print_help() {
    println!(
        "rill {VERSION}\n\n\
         USAGE:\n    \
         rill [FILE]\n\n\
         With a FILE argument, type-checks, compiles and runs it, exiting 1 on error.\n\
         With no arguments, starts an interactive prompt; submit a statement and press\n\
         enter, or type \"exit\" to quit."
    );
}

fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("rill: {message}");
            process::exit(1);
        }
    };

    if args.show_help {
        print_help();
        return;
    }
    if args.show_version {
        println!("rill {VERSION}");
        return;
    }

    match args.file {
        Some(path) => run_file(&path),
        None => run_repl(),
    }
}

/// File mode (§6): read the whole file as one submission, exit 1 on any
/// parse/logic/runtime error.
fn run_file(path: &str) {
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("rill: cannot read '{path}': {e}");
        process::exit(1);
    });

    let mut jit = Jit::new().unwrap_or_else(|e| {
        eprintln!("rill: {e}");
        process::exit(1);
    });
    let mut ctx = RuntimeContext::with_stdio();

    if let Err(e) = jit.run(&source, &mut ctx) {
        ctx.flush();
        eprintln!("rill: {e}");
        process::exit(1);
    }
    ctx.flush();
}

/// Interactive mode (§6): accumulates lines into one submission until the
/// parser reports a complete statement sequence, alternating the `"> "`/
/// `". "` prompts; each complete submission is compiled and run immediately
/// so its globals and instantiations persist into later submissions (§4.5,
/// §5). A submission that fails to parse or to run is discarded and the
/// prompt returns to `"> "` — per §6 "REPL skips to end of input" / "a REPL
/// run discards the current input and returns to the prompt" (§7).
fn run_repl() {
    println!("rill {VERSION} — a small JIT-compiled language. Type \"exit\" to quit.\n");

    let mut jit = Jit::new().unwrap_or_else(|e| {
        eprintln!("rill: {e}");
        process::exit(1);
    });
    let mut ctx = RuntimeContext::with_stdio();

    let mut rl = DefaultEditor::new().unwrap_or_else(|e| {
        eprintln!("rill: failed to start the line editor: {e}");
        process::exit(1);
    });
    let history_path = env::var("HOME").ok().map(|home| std::path::PathBuf::from(home).join(".rill_history"));
    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ". " };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && line.trim() == "exit" {
                    break;
                }
                let _ = rl.add_history_entry(line.as_str());
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                match rill_parser::parse(&buffer) {
                    Ok(_) => {
                        if let Err(e) = jit.run(&buffer, &mut ctx) {
                            ctx.flush();
                            eprintln!("rill: {e}");
                        } else {
                            ctx.flush();
                        }
                        buffer.clear();
                    }
                    Err(e) if is_incomplete(&e) => {
                        // Ran out of tokens mid-statement: keep accumulating.
                    }
                    Err(e) => {
                        eprintln!("rill: {e}");
                        buffer.clear();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("rill: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }
}

/// A statement cut off mid-way always fails with `expect`/`expect_ident`
/// reporting a token it "found" was absent — those format `Option<&Token>`
/// with `{:?}`, so `None` prints literally as the word `None`. A genuine
/// syntax error instead names the offending token. This distinguishes "the
/// submission isn't finished yet" from "this input is malformed" without
/// the parser needing its own lookahead-aware continuation check.
fn is_incomplete(err: &rill_parser::ParseError) -> bool {
    err.message.ends_with("found None")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_incomplete_vs_malformed_input() {
        let incomplete = rill_parser::parse("if x < 1").unwrap_err();
        assert!(is_incomplete(&incomplete));

        let malformed = rill_parser::parse("let = 1;").unwrap_err();
        assert!(!is_incomplete(&malformed));
    }
}
