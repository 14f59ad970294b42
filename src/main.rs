use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use fiori_pilot::driver::web::{WebDriverConfig, WebLauncher};
use fiori_pilot::metadata::store;
use fiori_pilot::report::{self, CommandReport};
use fiori_pilot::runner::{self, session, Command, Session};
use fiori_pilot::server::{self, ToolServer};
use fiori_pilot::{parser, Config};

#[derive(Parser)]
#[command(name = "fiori-pilot")]
#[command(version = "0.1.0")]
#[command(about = "Drive and extract Fiori list-report applications", long_about = None)]
struct Cli {
    /// Config file (defaults to ./fiori-pilot.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Application URL (overrides config and FIORI_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Run the browser headless
    #[arg(long, global = true, default_value = "false")]
    headless: bool,

    /// Metadata file
    #[arg(short, long, global = true)]
    metadata: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the application and save reconciled filter/table metadata
    Extract {
        /// Skip opening the column settings dialog of each table
        #[arg(long, default_value = "false")]
        skip_dialog: bool,

        /// Merge into the existing metadata file
        #[arg(long, default_value = "false")]
        merge: bool,

        /// Also write the command report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the UI5 controls of the start page
    Scan {
        /// Keep launchpad shell and framework-internal controls
        #[arg(long, default_value = "false")]
        internals: bool,
    },

    /// Execute one command, e.g. `exec setFilter CompanyCode 1000`
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Run a YAML command script or a directory of scripts
    Run {
        path: PathBuf,

        /// Continue on failure
        #[arg(long, default_value = "false")]
        continue_on_failure: bool,

        /// Write the run summary JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive shell
    Shell,

    /// Serve the tool-dispatch API
    Serve {
        #[arg(long, default_value_t = server::DEFAULT_PORT)]
        port: u16,
    },

    /// Print the tool descriptors generated from the metadata file
    Tools,

    /// Manage the persistent browser profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Delete the profile (logs out); succeeds if it does not exist
    Clear,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(ref url) = cli.url {
        config.url = Some(url.clone());
    }
    if cli.headless {
        config.headless = true;
    }
    if let Some(ref path) = cli.metadata {
        config.metadata_path = path.clone();
    }
    Ok(config)
}

fn new_session(config: Config) -> Session {
    let launcher = WebLauncher::new(WebDriverConfig::from_config(&config));
    Session::new(config, Arc::new(launcher))
}

fn finish(report: &CommandReport, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    report::json::write(report, None)?;
    if output.is_some() {
        report::json::write(report, output)?;
    }
    report::print_status(report);
    if !report.ok {
        std::process::exit(report.exit_code());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Extract {
            skip_dialog,
            merge,
            output,
        } => {
            println!("{} Extracting metadata", "▶".green().bold());
            println!("  Metadata: {}", config.metadata_path.display().to_string().cyan());
            let mut session = new_session(config);
            let report = runner::run_once(
                &mut session,
                Command::Extract {
                    url: None,
                    skip_dialog,
                    merge,
                },
            )
            .await;
            finish(&report, output.as_deref())?;
        }

        Commands::Scan { internals } => {
            let mut session = new_session(config);
            let report = runner::run_once(
                &mut session,
                Command::Scan {
                    include_internals: internals,
                },
            )
            .await;
            finish(&report, None)?;
        }

        Commands::Exec { args } => {
            let command = parser::parse_tokens(&args)?;
            println!("{} Executing: {}", "▶".green(), command.display_name().cyan());
            let mut session = new_session(config);
            let report = runner::run_once(&mut session, command).await;
            finish(&report, None)?;
        }

        Commands::Run {
            path,
            continue_on_failure,
            output,
        } => {
            println!("{} Running scripts from: {}", "▶".green().bold(), path.display());
            let mut session = new_session(config);
            let summaries = runner::run_scripts(&mut session, &path, continue_on_failure).await;
            session.close().await.ok();
            let summaries = summaries?;

            if output.is_some() {
                report::json::write(&summaries, output.as_deref())?;
            }
            if summaries.iter().any(|s| !s.success()) {
                std::process::exit(1);
            }
        }

        Commands::Shell => {
            println!("{} Starting interactive shell...", "🐚".to_string().blue());
            let mut session = new_session(config);
            runner::shell::run_shell(&mut session).await?;
        }

        Commands::Serve { port } => {
            let session = new_session(config);
            ToolServer::new(port).start(session).await?;
        }

        Commands::Tools => {
            let metadata = store::load(&config.metadata_path)?;
            report::json::write(&server::generate_tools(&metadata), None)?;
        }

        Commands::Profile { command } => match command {
            ProfileCommands::Clear => {
                if session::dispose_profile(&config.profile_dir)? {
                    println!("{} Removed {}", "🗑".green(), config.profile_dir.display());
                } else {
                    println!("{} Nothing to remove at {}", "ℹ".blue(), config.profile_dir.display());
                }
            }
        },
    }

    Ok(())
}
