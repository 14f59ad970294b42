pub mod json;
pub mod types;

pub use types::{CommandReport, ErrorPayload, RunSummary};

use colored::Colorize;

/// One-line status for interactive output
pub fn print_status(report: &CommandReport) {
    match &report.error {
        None => println!(
            "{} {} ({}ms)",
            "✅".green(),
            report.command.cyan(),
            report.duration_ms
        ),
        Some(error) if error.expected => {
            println!("{} {}: {}", "⚠".yellow(), report.command.cyan(), error.message.yellow());
            if !error.alternatives.is_empty() {
                println!("   {} {}", "Available:".yellow(), error.alternatives.join(", "));
            }
        }
        Some(error) => {
            log::error!("{} failed ({}): {}", report.command, error.kind, error.message);
            println!("{} {}: {}", "❌".red(), report.command.cyan(), error.message.red());
            if !error.alternatives.is_empty() {
                println!("   {} {}", "Available:".yellow(), error.alternatives.join(", "));
            }
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "═══════════════════════════════════════".dimmed());
    println!(
        "{} {} passed, {} failed",
        "📊".blue(),
        summary.passed.to_string().green(),
        summary.failed.to_string().red()
    );
    println!("{}", "═══════════════════════════════════════".dimmed());
}
