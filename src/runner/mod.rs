pub mod commands;
pub mod executor;
pub mod scenario;
pub mod session;
pub mod shell;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use commands::{execute, Command};
pub use session::Session;

use crate::parser;
use crate::report::{self, CommandReport, RunSummary};

/// Execute one command and wrap the outcome in a report
pub async fn execute_report(session: &mut Session, command: &Command) -> CommandReport {
    let started = Instant::now();
    let result = execute(session, command).await;
    CommandReport::from_result(command.name(), result, started.elapsed().as_millis() as u64)
}

/// Run one command in a fresh session: start when needed, execute, close
///
/// Metadata-dependent commands fail on a missing metadata file before any
/// browser is launched.
pub async fn run_once(session: &mut Session, command: Command) -> CommandReport {
    if command.needs_metadata() {
        if let Err(e) = session.metadata() {
            return CommandReport::from_result(command.name(), Err(e), 0);
        }
    }

    let needs_start = !matches!(
        command,
        Command::Start { .. } | Command::Close | Command::Extract { .. }
    );
    if needs_start {
        let started = execute_report(session, &Command::Start { url: None }).await;
        if !started.ok {
            return started;
        }
    }
    let report = execute_report(session, &command).await;
    if let Err(e) = session.close().await {
        log::debug!("Ignoring close error: {:#}", e);
    }
    report
}

/// Collect script files from a file or directory
pub fn collect_scripts(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Run a script file (or every script in a directory) against one session
///
/// Steps run strictly in order; the first failing step stops its script
/// unless `continue_on_failure` is set.
pub async fn run_scripts(
    session: &mut Session,
    path: &Path,
    continue_on_failure: bool,
) -> Result<Vec<RunSummary>> {
    let files = collect_scripts(path);
    if files.is_empty() {
        println!("{} No script files found.", "ℹ".blue());
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for file in files {
        println!("\n{} {}", "📄 Script:".bold(), file.display());
        let script = parser::parse_script_file(&file)?;
        let summary = run_script(session, &file.display().to_string(), script, continue_on_failure).await;
        report::print_summary(&summary);
        summaries.push(summary);
    }
    Ok(summaries)
}

pub async fn run_script(
    session: &mut Session,
    name: &str,
    script: parser::Script,
    continue_on_failure: bool,
) -> RunSummary {
    let mut summary = RunSummary::new(name);

    let mut steps = script.steps;
    if script.url.is_some() || !session.is_started() {
        let needs_start = !matches!(steps.first(), Some(Command::Start { .. }));
        if needs_start {
            steps.insert(0, Command::Start { url: script.url });
        }
    }

    for (i, command) in steps.iter().enumerate() {
        println!(
            "{} [{}/{}] {}",
            "▶".green(),
            i + 1,
            steps.len(),
            command.display_name().cyan()
        );
        let outcome = execute_report(session, command).await;
        report::print_status(&outcome);
        let failed = !outcome.ok;
        summary.push(outcome);
        if failed && !continue_on_failure {
            break;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeLauncher, FakePage};
    use crate::ui5::scripts;
    use crate::utils::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn session(page: &FakePage) -> Session {
        let mut config = Config::default();
        config.timeouts.framework_ready_ms = 50;
        config.timeouts.element_ms = 50;
        config.timeouts.poll_interval_ms = 5;
        config.metadata_path = std::env::temp_dir().join(format!("none-{}.json", uuid::Uuid::new_v4()));
        Session::new(config, Arc::new(FakeLauncher::new(page.clone())))
    }

    #[tokio::test]
    async fn test_script_starts_then_stops_on_failure() {
        let page = FakePage::new();
        page.on_evaluate(scripts::FRAMEWORK_READY, json!(true));
        page.on_evaluate(scripts::VIEW_ELEMENT_RENDERED, json!(true));
        let mut session = session(&page);

        let script = parser::parse_script("url: https://host/app\nsteps:\n  - pressGo\n  - getMessages\n").unwrap();
        let summary = run_script(&mut session, "orders.yaml", script, false).await;

        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.steps[1].error.as_ref().unwrap().kind, "metadata_missing");
        assert_eq!(page.navigations(), vec!["https://host/app"]);
    }

    #[tokio::test]
    async fn test_script_continue_on_failure() {
        let page = FakePage::new();
        page.on_evaluate(scripts::FRAMEWORK_READY, json!(true));
        page.on_evaluate(scripts::VIEW_ELEMENT_RENDERED, json!(true));
        let mut session = session(&page);

        let script = parser::parse_script("url: https://host/app\nsteps:\n  - pressGo\n  - getMessages\n").unwrap();
        let summary = run_script(&mut session, "orders.yaml", script, true).await;
        assert_eq!(summary.steps.len(), 3);
        assert_eq!(summary.passed, 2);
        assert!(!summary.success());
    }

    #[tokio::test]
    async fn test_run_once_checks_metadata_before_launch() {
        let page = FakePage::new();
        let launcher = FakeLauncher::new(page.clone());
        let mut config = Config::default();
        config.url = Some("https://host/app".into());
        config.metadata_path = std::env::temp_dir().join(format!("none-{}.json", uuid::Uuid::new_v4()));
        let mut session = Session::new(config, Arc::new(launcher.clone()));

        let report = run_once(
            &mut session,
            Command::SetFilter {
                property_key: "Plant".into(),
                value: "1000".into(),
            },
        )
        .await;

        assert!(!report.ok);
        assert_eq!(report.command, "setFilter");
        let error = report.error.as_ref().unwrap();
        assert_eq!(error.kind, "metadata_missing");
        assert!(error.message.contains("run extraction first"));
        assert_eq!(launcher.launches(), 0);
        assert!(page.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_starts_and_closes() {
        let page = FakePage::new();
        page.on_evaluate(scripts::FRAMEWORK_READY, json!(true));
        page.on_evaluate(scripts::VIEW_ELEMENT_RENDERED, json!(true));
        let mut config = Config::default();
        config.url = Some("https://host/app".into());
        config.timeouts.framework_ready_ms = 50;
        config.timeouts.element_ms = 50;
        config.timeouts.poll_interval_ms = 5;
        let mut session = Session::new(config, Arc::new(FakeLauncher::new(page.clone())));

        let report = run_once(&mut session, Command::GetMessages).await;
        assert!(report.ok, "{:?}", report.error);
        assert_eq!(page.navigations(), vec!["https://host/app"]);
        assert!(page.is_closed());
    }

    #[test]
    fn test_collect_scripts_filters_yaml() {
        let dir = std::env::temp_dir().join(format!("fiori-scripts-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.yaml"), "- pressGo").unwrap();
        std::fs::write(dir.join("nested/a.yml"), "- getRows").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();

        let files = collect_scripts(&dir);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().is_some_and(|e| e != "txt")));
        std::fs::remove_dir_all(dir).ok();
    }
}
