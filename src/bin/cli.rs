//! SQL-Air - CLI Client
//!
//! Runs commands against a local engine, one command per line.

use std::io::{self, Write};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sqlair::catalog::TableCache;
use sqlair::executor::ExecutionEngine;
use tracing_subscriber::EnvFilter;

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
 SQL-Air - a lightweight CSV table store
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit SQL-Air
  .tables            List loaded tables
  .recent            Show the most recently used table

SQL-Air Commands:
  select [wait] <cols|*> [from <file-or-url>] [where <col> <op> <value>]
  update [wait] [<file-or-url>] set <col> = <value>, ... [where <col> <op> <value>]
  save               Write the most recently used table back to its file

  Omitting the source reuses the most recently used table.
  'wait' blocks until at least one row matches.

Examples:
  select * from people.csv where age >= 21
  update set city = Oxford where name = Alice
"#
    );
}

/// Execute one command and print its output
fn execute_command(command: &str, engine: &ExecutionEngine) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = engine.process(command, &mut stdout) {
        eprintln!("Error: {}", e);
    }
    stdout.flush().ok();
}

/// Handle special dot commands. Returns false when the shell should exit.
fn handle_special_command(cmd: &str, engine: &ExecutionEngine) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let cache = engine.cache();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return false,
        Some(".tables") => {
            let sources = cache.sources();
            if sources.is_empty() {
                println!("No tables loaded.");
            } else {
                println!("Tables:");
                for source in sources {
                    let rows = cache.get(&source).map_or(0, |t| t.row_count());
                    println!("  {} ({} rows)", source, rows);
                }
            }
        }
        Some(".recent") => match cache.recent() {
            Some(source) => println!("{}", source),
            None => println!("No table used yet."),
        },
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    true
}

/// Main REPL loop
fn run_repl() -> anyhow::Result<()> {
    let engine = ExecutionEngine::new(Arc::new(TableCache::new()));
    let mut editor = DefaultEditor::new()?;

    print_banner();

    loop {
        let line = match editor.readline("sql-air> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        editor.add_history_entry(trimmed)?;

        if trimmed.starts_with('.') {
            if !handle_special_command(trimmed, &engine) {
                break;
            }
            continue;
        }

        execute_command(trimmed, &engine);
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    run_repl()
}
