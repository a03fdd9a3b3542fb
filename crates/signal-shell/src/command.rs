//! Shell commands and their execution against the signal network.

use acton_reactive::prelude::*;
use anyhow::Result;
use tracing::info;

use signal_kernel::messages::{Block, Increment, PrintGraph, PrintValue, SetGlitchAvoidance};
use signal_kernel::{SignalConfig, SignalId};

use crate::shell::Shell;

pub const HELP: &str = "\
Commands:
  x = 1          create signal x with initial value 1
  y = x          create signal y mirroring x
  z = x + y      create signal z combining x and y (+ or -)
  x              print the value of x
  x++            increment x (signals without dependencies only)
  graph x        print the dependency graph of x
  block x        stop x publishing updates
  unblock x      resume publishing
  glitch x       disable glitch avoidance on x
  noglitch x     enable glitch avoidance on x
  help           show this text
  exit           leave the shell";

/// One parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(SignalConfig),
    Print(SignalId),
    Increment(SignalId),
    PrintGraph(SignalId),
    Block { id: SignalId, blocked: bool },
    GlitchAvoidance { id: SignalId, enabled: bool },
    Help,
    Exit,
}

/// Whether the REPL should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl Command {
    pub async fn execute(self, shell: &mut Shell) -> Result<Flow> {
        match self {
            Command::Create(config) => {
                let id = config.id.clone();
                shell.create(config).await?;
                info!(signal = %id, "Signal created");
            }
            Command::Print(id) => {
                shell.handle(&id)?.send(PrintValue).await;
            }
            Command::Increment(id) => {
                shell.handle(&id)?.send(Increment).await;
            }
            Command::PrintGraph(id) => {
                shell.handle(&id)?.send(PrintGraph).await;
            }
            Command::Block { id, blocked } => {
                shell.handle(&id)?.send(Block { blocked }).await;
            }
            Command::GlitchAvoidance { id, enabled } => {
                shell
                    .handle(&id)?
                    .send(SetGlitchAvoidance { enabled })
                    .await;
            }
            Command::Help => {
                for line in HELP.lines() {
                    info!("{}", line);
                }
            }
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_command() {
        for word in [
            "x = 1", "y = x", "z = x + y", "x++", "graph", "block", "unblock", "glitch",
            "noglitch", "help", "exit",
        ] {
            assert!(HELP.contains(word), "help is missing {word:?}");
        }
        assert!(HELP.lines().all(|line| !line.trim().is_empty()));
    }
}
