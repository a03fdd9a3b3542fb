//! REPL grammar: one line of input to one [`Command`].

use anyhow::Result;
use regex::Regex;

use signal_kernel::{CombineOperator, SignalConfig};

use crate::command::Command;

/// Identifiers start with a letter, so `y=3` is always a leaf.
const ID: &str = r"[A-Za-z][A-Za-z0-9]*";

/// Parse one line of shell input.
///
/// Unrecognised input yields an `Invalid command: <text>` error.
pub fn parse(line: &str) -> Result<Command> {
    let text = line.trim();

    match text {
        "help" => return Ok(Command::Help),
        "exit" => return Ok(Command::Exit),
        _ => {}
    }

    // x = -3
    let leaf = Regex::new(&format!(r"^({ID})\s*=\s*(-?\d+)$"))?;
    if let Some(caps) = leaf.captures(text) {
        let value: i64 = caps[2]
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid command: {} (value out of range)", text))?;
        return Ok(Command::Create(SignalConfig::leaf(&caps[1], value)));
    }

    // z = x + y
    let combine = Regex::new(&format!(r"^({ID})\s*=\s*({ID})\s*([+-])\s*({ID})$"))?;
    if let Some(caps) = combine.captures(text) {
        let operator: CombineOperator = caps[3].parse()?;
        return Ok(Command::Create(SignalConfig::combine(
            &caps[1], &caps[2], &caps[4], operator,
        )));
    }

    // y = x
    let map = Regex::new(&format!(r"^({ID})\s*=\s*({ID})$"))?;
    if let Some(caps) = map.captures(text) {
        return Ok(Command::Create(SignalConfig::map(&caps[1], &caps[2])));
    }

    let increment = Regex::new(&format!(r"^({ID})\s*\+\+$"))?;
    if let Some(caps) = increment.captures(text) {
        return Ok(Command::Increment(caps[1].to_string()));
    }

    let keyword = Regex::new(&format!(r"^(graph|block|unblock|glitch|noglitch)\s+({ID})$"))?;
    if let Some(caps) = keyword.captures(text) {
        let id = caps[2].to_string();
        return Ok(match &caps[1] {
            "graph" => Command::PrintGraph(id),
            "block" => Command::Block { id, blocked: true },
            "unblock" => Command::Block { id, blocked: false },
            "glitch" => Command::GlitchAvoidance { id, enabled: false },
            _ => Command::GlitchAvoidance { id, enabled: true },
        });
    }

    let print = Regex::new(&format!(r"^({ID})$"))?;
    if let Some(caps) = print.captures(text) {
        return Ok(Command::Print(caps[1].to_string()));
    }

    anyhow::bail!("Invalid command: {}", text)
}
