//! Signal Shell CLI.
//!
//! Reads commands from stdin (or a script file) and drives a network of
//! reactive signals. Type `help` for the command list.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use signal_shell::{parse, Flow, NetworkConfig, Shell};

#[derive(Parser)]
#[command(name = "signal-shell")]
#[command(version)]
#[command(about = "Glitch-free asynchronous reactive signals")]
struct Cli {
    /// JSON file of signals to create at startup
    #[arg(long)]
    network: Option<PathBuf>,

    /// How long to wait for a new signal to finish discovery (milliseconds)
    #[arg(long = "ready-timeout-ms", env = "SIGNAL_READY_TIMEOUT_MS", default_value = "2000")]
    ready_timeout_ms: u64,

    /// Run commands from this file instead of stdin, then exit
    #[arg(long)]
    script: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Run one line; returns `false` when the shell should stop.
async fn run_line(shell: &mut Shell, line: &str) -> bool {
    if line.trim().is_empty() {
        return true;
    }

    let command = match parse(line) {
        Ok(command) => command,
        Err(e) => {
            warn!("{}", e);
            return true;
        }
    };

    match command.execute(shell).await {
        Ok(Flow::Continue) => true,
        Ok(Flow::Exit) => false,
        Err(e) => {
            warn!("{:#}", e);
            true
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut shell = Shell::launch(Duration::from_millis(cli.ready_timeout_ms)).await;

    if let Some(path) = &cli.network {
        let network = NetworkConfig::load(path)?;
        shell.load_network(&network).await?;
    }

    match &cli.script {
        Some(path) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            for line in script.lines() {
                if !run_line(&mut shell, line).await {
                    break;
                }
            }
        }
        None => {
            info!("Signal shell ready; type 'help' for commands");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if !run_line(&mut shell, &line).await {
                    break;
                }
            }
        }
    }

    // Let in-flight updates settle before stopping the actors
    tokio::time::sleep(Duration::from_millis(100)).await;
    shell.shutdown().await
}
