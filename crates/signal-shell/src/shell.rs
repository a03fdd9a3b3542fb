//! Shell session: the actor runtime plus everything needed to address signals.

use std::collections::HashSet;
use std::time::Duration;

use acton_reactive::prelude::*;
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use signal_kernel::{SignalActor, SignalConfig, SignalDirectory, SignalId};

use crate::network::NetworkConfig;
use crate::ready_waiter::ReadyWaiter;

/// Default bound on waiting for a new signal to finish discovery.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(2000);

/// A running signal network driven by shell commands.
pub struct Shell {
    runtime: ActorRuntime,
    directory: SignalDirectory,
    ready_rx: mpsc::Receiver<SignalId>,
    ready: HashSet<SignalId>,
    ready_timeout: Duration,
}

impl Shell {
    /// Launch a fresh runtime with an empty network.
    pub async fn launch(ready_timeout: Duration) -> Self {
        let mut runtime = ActonApp::launch_async().await;

        let (tx, ready_rx) = mpsc::channel(64);
        ReadyWaiter::new(tx).spawn(&mut runtime).await;

        Self {
            runtime,
            directory: SignalDirectory::new(),
            ready_rx,
            ready: HashSet::new(),
            ready_timeout,
        }
    }

    /// The runtime hosting the network, for spawning observers alongside it.
    pub fn runtime_mut(&mut self) -> &mut ActorRuntime {
        &mut self.runtime
    }

    pub fn directory(&self) -> &SignalDirectory {
        &self.directory
    }

    /// Handle of a registered signal.
    pub fn handle(&self, id: &str) -> Result<ActorHandle> {
        self.directory
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown signal: {}", id))
    }

    /// Create a signal and wait (bounded) for it to finish discovery.
    ///
    /// Fails without creating anything if the id is taken or a dependency
    /// does not exist.
    pub async fn create(&mut self, config: SignalConfig) -> Result<ActorHandle> {
        if self.directory.contains(&config.id) {
            anyhow::bail!("Signal {} already exists", config.id);
        }
        for dep in &config.dependencies {
            if !self.directory.contains(dep) {
                anyhow::bail!("Unknown signal: {}", dep);
            }
        }

        let id = config.id.clone();
        let handle = SignalActor::new(config, self.directory.clone())
            .spawn(&mut self.runtime)
            .await?;

        if !self.wait_ready(&id).await {
            warn!(
                signal = %id,
                timeout_ms = self.ready_timeout.as_millis() as u64,
                "Signal not ready yet; discovery continues in the background"
            );
        }
        Ok(handle)
    }

    /// Create every signal of `network`, in order.
    pub async fn load_network(&mut self, network: &NetworkConfig) -> Result<()> {
        for config in &network.signals {
            self.create(config.clone()).await?;
        }
        info!(signals = network.signals.len(), "Network loaded");
        Ok(())
    }

    /// Whether `id` has broadcast its readiness, draining pending notices.
    pub fn is_ready(&mut self, id: &str) -> bool {
        while let Ok(ready) = self.ready_rx.try_recv() {
            self.ready.insert(ready);
        }
        self.ready.contains(id)
    }

    async fn wait_ready(&mut self, id: &str) -> bool {
        if self.ready.contains(id) {
            return true;
        }

        let deadline = tokio::time::Instant::now() + self.ready_timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.ready_rx.recv()).await {
                Ok(Some(ready)) => {
                    let found = ready == id;
                    self.ready.insert(ready);
                    if found {
                        return true;
                    }
                }
                // Timed out, or the waiter is gone
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Stop every actor in the runtime.
    pub async fn shutdown(mut self) -> Result<()> {
        self.runtime
            .shutdown_all()
            .await
            .map_err(|e| anyhow::anyhow!("Runtime shutdown failed: {:?}", e))
    }
}
