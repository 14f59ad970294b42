use crate::parser;
use crate::runner::{execute_report, Session};
use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};

pub async fn run_shell(session: &mut Session) -> Result<()> {
    println!("\n{}", "=== fiori-pilot Interactive Shell ===".bold().green());
    println!("Type commands (e.g., 'start', 'setFilter CompanyCode 1000', 'pressGo', 'getRows') or 'exit' to quit.");
    println!("Tip: 'help' lists every command; YAML steps like 'selectRow: 0' work too.\n");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{} ", "fiori-pilot>".blue().bold());
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line == "exit" || line == "quit" {
            break;
        }

        if line == "help" {
            println!(
                "Commands: {}",
                parser::command_names().collect::<Vec<_>>().join(", ")
            );
            continue;
        }

        match parser::parse_line(line) {
            Ok(cmd) => {
                println!("{} Executing: {}", "▶".green(), cmd.display_name().cyan());
                let report = execute_report(session, &cmd).await;
                match &report.error {
                    None => {
                        println!("{}", serde_json::to_string_pretty(&report.data)?);
                        println!("{} Command passed.", "✅".green());
                    }
                    Some(error) => {
                        println!("{} Error: {}", "❌".red(), error.message);
                        if !error.alternatives.is_empty() {
                            println!("   {} {}", "Available:".yellow(), error.alternatives.join(", "));
                        }
                    }
                }
            }
            Err(e) => {
                println!("{} Parse error: {:#}", "❌".red(), e);
            }
        }
    }

    session.close().await?;
    println!("\nExiting shell. Goodbye!");
    Ok(())
}
