//! Network bootstrap file: signals created at startup, in file order.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use signal_kernel::SignalConfig;

/// A set of signals to create before the shell starts reading commands.
///
/// ```json
/// { "signals": [ { "id": "x", "initialValue": 1 }, { "id": "y", "dependencies": ["x"] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

impl NetworkConfig {
    /// Load a network from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network file {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse network file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Every dependency must be declared earlier in the file, and ids must be unique.
    fn validate(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for signal in &self.signals {
            if seen.contains(&signal.id.as_str()) {
                anyhow::bail!("Signal {} declared twice", signal.id);
            }
            for dep in &signal.dependencies {
                if !seen.contains(&dep.as_str()) {
                    anyhow::bail!(
                        "Signal {} depends on {}, which is not declared before it",
                        signal.id,
                        dep
                    );
                }
            }
            if signal.dependencies.len() > 1 && signal.operator.is_none() {
                anyhow::bail!("Signal {} combines two signals but has no operator", signal.id);
            }
            seen.push(&signal.id);
        }
        Ok(())
    }
}
