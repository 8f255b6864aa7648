//! Procpilot Control - conversational CLI for PM2-managed processes
//!
//! Without a subcommand, starts the interactive chat.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procpilot_common::{AiProvider, HttpAiProvider, PilotConfig, Pm2Client};
use procpilotctl::{logging, repl, Display, Reply, Session, VERSION};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "procpilotctl")]
#[command(about = "Procpilot - talk to your PM2 processes", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Config file (default: $PROCPILOT_CONFIG or ~/.config/procpilot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run without the AI backend
    #[arg(long, global = true)]
    no_ai: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default)
    Chat,

    /// Run one request and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Confirm risky actions up front
        #[arg(short, long)]
        yes: bool,
    },

    /// Show how a request is understood, without running it
    Analyze {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Analyse recent errors of one process, or all of them
    Diagnose {
        process: Option<String>,

        /// Log lines to read
        #[arg(short = 'n', long)]
        lines: Option<usize>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process table
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = PilotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let display = Display::from_mode(config.output.color);

    let pm = Arc::new(Pm2Client::with_bin(config.assistant.pm2_bin.clone()));
    let ai = build_ai(&config, cli.no_ai);
    let mut session = Session::new(pm, ai, &config);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            repl::run(&mut session, display).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { text, yes } => {
            session.refresh_known_processes().await;
            let reply = session.ask(&text.join(" "), yes).await;
            if let Some(rendered) = display.render(&reply) {
                println!("{}", rendered);
            }
            Ok(exit_code(&reply, yes))
        }
        Commands::Analyze { text } => {
            let analysis = session.analyze(&text.join(" ")).await;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diagnose {
            process,
            lines,
            json,
        } => {
            let lines = lines.unwrap_or(config.assistant.log_lines);
            let analysis = session
                .diagnose(process.as_deref(), lines)
                .await
                .context("Failed to read process logs")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{}", display.analysis(&analysis));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            let result = session.status().await;
            println!("{}", display.result(&result));
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Provider from config, unless disabled or unusable
fn build_ai(config: &PilotConfig, no_ai: bool) -> Option<Arc<dyn AiProvider>> {
    if no_ai || !config.llm.is_enabled() {
        return None;
    }
    match HttpAiProvider::from_config(&config.llm) {
        Ok(provider) => {
            info!(
                "AI backend {} with model {}",
                config.llm.backend.as_str(),
                provider.model()
            );
            Some(Arc::new(provider))
        }
        Err(e) => {
            warn!("AI backend unavailable, continuing without it: {}", e);
            None
        }
    }
}

/// Failures exit 1; a confirmation the user did not give exits 2
fn exit_code(reply: &Reply, yes: bool) -> ExitCode {
    match reply {
        Reply::Confirm(_) if !yes => {
            eprintln!("Re-run with --yes to confirm.");
            ExitCode::from(2)
        }
        Reply::Executed(results) if results.iter().any(|r| !r.success) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
