//! SignalActor: one actor per signal, owning its [`SignalState`].
//!
//! Uses the broker pub/sub pattern:
//! - Subscribes to `ValueUpdate` and `SignalReady` broadcasts
//! - Broadcasts `ValueUpdate` on every published emission
//! - Broadcasts `SignalReady` once its graph is assembled

use acton_reactive::prelude::*;
use tracing::{debug, info, warn};

use crate::chain::SignalChain;
use crate::config::SignalConfig;
use crate::directory::SignalDirectory;
use crate::graph::{SignalGraph, SignalId};
use crate::messages::{
    Block, GraphReply, Increment, PrintGraph, PrintValue, Resend, SendGraph, SetGlitchAvoidance,
    SignalReady, ValueUpdate,
};
use crate::signal::{Emission, Propagation, SignalState};
use crate::tracker::Discovery;

/// Actor state for a single signal.
#[derive(Default, Clone)]
pub struct SignalActorState {
    /// The signal's state machine; set before start
    pub signal: Option<SignalState>,
    /// Shared id -> handle table
    pub directory: SignalDirectory,
}

impl std::fmt::Debug for SignalActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalActorState")
            .field("signal", &self.signal.as_ref().map(|s| s.id()))
            .field("value", &self.signal.as_ref().map(|s| s.value()))
            .field("ready", &self.signal.as_ref().is_some_and(|s| s.is_ready()))
            .finish()
    }
}

/// Actor wrapping one signal of the network.
///
/// Handles:
/// - `Increment` - bump a leaf signal and publish
/// - `ValueUpdate` - recombine from a dependency's new value
/// - `SendGraph` / `GraphReply` - dependency discovery
/// - `SignalReady` - retry discovery for a dependency that was not ready
/// - `Resend` - replay the last published value
/// - `Block`, `SetGlitchAvoidance` - runtime switches
/// - `PrintValue`, `PrintGraph` - log current state
pub struct SignalActor {
    config: SignalConfig,
    directory: SignalDirectory,
}

impl SignalActor {
    pub fn new(config: SignalConfig, directory: SignalDirectory) -> Self {
        Self { config, directory }
    }

    /// Spawn this signal in the given runtime.
    ///
    /// The actor registers itself in the directory, then starts discovery
    /// once running. Fails if the id is already registered.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> anyhow::Result<ActorHandle> {
        let id = self.config.id.clone();
        if self.directory.contains(&id) {
            anyhow::bail!("Signal {} already exists", id);
        }

        let mut actor = runtime.new_actor_with_name::<SignalActorState>(format!("Signal:{}", id));

        let mut signal = SignalState::new(&self.config);
        let mut requests: Vec<SignalId> = Vec::new();
        let discovery = signal.gather_dependencies(&mut requests);

        actor.model.signal = Some(signal);
        actor.model.directory = self.directory.clone();

        // Subscribe to broadcast messages BEFORE starting
        actor.handle().subscribe::<ValueUpdate>().await;
        actor.handle().subscribe::<SignalReady>().await;

        if !self.directory.register(id.clone(), actor.handle().clone()) {
            anyhow::bail!("Signal {} already exists", id);
        }

        configure_signal_actor(&mut actor);

        let directory = self.directory;
        actor.after_start(move |actor| {
            let broker = actor.broker().clone();
            let handle = actor.handle().clone();
            let id = id.clone();
            let assembled = discovery == Discovery::Assembled;

            let mut targets = Vec::new();
            if assembled {
                info!(signal = %id, "Signal ready (no dependencies)");
            } else {
                for dep in &requests {
                    match directory.get(dep) {
                        Some(target) => targets.push(target),
                        None => debug!(
                            signal = %id,
                            dependency = %dep,
                            "Dependency not registered yet; waiting for SignalReady"
                        ),
                    }
                }
            }

            Reply::pending(async move {
                if assembled {
                    broker.broadcast(SignalReady { id, handle }).await;
                    return;
                }
                for target in targets {
                    target
                        .send(SendGraph {
                            requester: handle.clone(),
                        })
                        .await;
                }
            })
        });

        Ok(actor.start().await)
    }
}

fn value_update(source: &str, emission: &Emission) -> ValueUpdate {
    ValueUpdate {
        source: source.to_string(),
        value: emission.value,
        chain: emission.chain.to_json(),
    }
}

/// Configure message handlers for the SignalActor.
fn configure_signal_actor(actor: &mut ManagedActor<Idle, SignalActorState>) {
    actor.mutate_on::<Increment>(|actor, _context| {
        let broker = actor.broker().clone();
        let Some(signal) = actor.model.signal.as_mut() else {
            warn!("Increment: signal not initialized");
            return Reply::ready();
        };

        match signal.increment() {
            Propagation::Publish(emission) => {
                let update = value_update(signal.id(), &emission);
                Reply::pending(async move {
                    broker.broadcast(update).await;
                })
            }
            _ => Reply::ready(),
        }
    });

    actor.mutate_on::<ValueUpdate>(|actor, context| {
        let msg = context.message().clone();
        let broker = actor.broker().clone();
        let Some(signal) = actor.model.signal.as_mut() else {
            return Reply::ready();
        };

        if !signal.depends_on(&msg.source) {
            return Reply::ready();
        }

        let chain = match SignalChain::from_json(&msg.chain) {
            Ok(chain) => chain,
            Err(e) => {
                warn!(
                    signal = %signal.id(),
                    source = %msg.source,
                    error = %e,
                    "Dropping update with malformed chain"
                );
                return Reply::ready();
            }
        };

        match signal.apply_update(&msg.source, msg.value, chain) {
            Propagation::Publish(emission) => {
                let update = value_update(signal.id(), &emission);
                Reply::pending(async move {
                    broker.broadcast(update).await;
                })
            }
            Propagation::Ignored => {
                debug!(
                    signal = %signal.id(),
                    source = %msg.source,
                    "Update ignored while discovering"
                );
                Reply::ready()
            }
            _ => Reply::ready(),
        }
    });

    // Reads only; answer even while our own discovery is running
    actor.act_on::<SendGraph>(|actor, context| {
        let requester = context.message().requester.clone();
        let Some(signal) = actor.model.signal.as_ref() else {
            return Reply::ready();
        };

        let reply = GraphReply {
            from: signal.id().to_string(),
            graph: signal.graph().map(SignalGraph::to_json),
        };

        Reply::pending(async move {
            requester.send(reply).await;
        })
    });

    actor.mutate_on::<GraphReply>(|actor, context| {
        let msg = context.message().clone();
        let broker = actor.broker().clone();
        let handle = actor.handle().clone();
        let directory = actor.model.directory.clone();
        let Some(signal) = actor.model.signal.as_mut() else {
            return Reply::ready();
        };

        let Some(graph) = msg.graph else {
            debug!(
                signal = %signal.id(),
                dependency = %msg.from,
                "Dependency still discovering; waiting for SignalReady"
            );
            return Reply::ready();
        };

        let graph = match SignalGraph::from_json(&graph) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(
                    signal = %signal.id(),
                    dependency = %msg.from,
                    error = %e,
                    "Dropping malformed graph reply"
                );
                return Reply::ready();
            }
        };

        if signal.accept_graph(&msg.from, graph) != Discovery::Assembled {
            return Reply::ready();
        }

        let id = signal.id().to_string();
        info!(
            signal = %id,
            dependencies = ?signal.tracker().declared(),
            conflicts = ?signal.conflicts(),
            "Dependency graph assembled"
        );

        let mut targets: Vec<ActorHandle> = Vec::new();
        let mut seen: Vec<&SignalId> = Vec::new();
        for dep in signal.tracker().declared() {
            if seen.contains(&dep) {
                continue;
            }
            seen.push(dep);
            match directory.get(dep) {
                Some(target) => targets.push(target),
                None => warn!(signal = %id, dependency = %dep, "No handle for dependency"),
            }
        }

        Reply::pending(async move {
            for target in targets {
                target
                    .send(Resend {
                        requester: Some(handle.clone()),
                    })
                    .await;
            }
            broker.broadcast(SignalReady { id, handle }).await;
        })
    });

    actor.act_on::<SignalReady>(|actor, context| {
        let msg = context.message().clone();
        let handle = actor.handle().clone();
        let Some(signal) = actor.model.signal.as_ref() else {
            return Reply::ready();
        };

        if signal.is_ready() || !signal.tracker().missing().iter().any(|dep| **dep == msg.id) {
            return Reply::ready();
        }

        debug!(
            signal = %signal.id(),
            dependency = %msg.id,
            "Dependency ready; requesting its graph"
        );
        Reply::pending(async move {
            msg.handle.send(SendGraph { requester: handle }).await;
        })
    });

    actor.act_on::<Resend>(|actor, context| {
        let requester = context.message().requester.clone();
        let broker = actor.broker().clone();
        let Some(signal) = actor.model.signal.as_ref() else {
            return Reply::ready();
        };

        let Some(emission) = signal.resend() else {
            debug!(signal = %signal.id(), "Nothing to resend yet");
            return Reply::ready();
        };
        let update = value_update(signal.id(), &emission);

        Reply::pending(async move {
            match requester {
                Some(requester) => {
                    requester.send(update).await;
                }
                None => {
                    broker.broadcast(update).await;
                }
            }
        })
    });

    actor.mutate_on::<Block>(|actor, context| {
        let blocked = context.message().blocked;
        if let Some(signal) = actor.model.signal.as_mut() {
            signal.set_blocked(blocked);
            info!(signal = %signal.id(), blocked, "Blocking updated");
        }
        Reply::ready()
    });

    actor.mutate_on::<SetGlitchAvoidance>(|actor, context| {
        let enabled = context.message().enabled;
        if let Some(signal) = actor.model.signal.as_mut() {
            signal.set_glitch_avoidance(enabled);
            info!(signal = %signal.id(), enabled, "Glitch avoidance updated");
        }
        Reply::ready()
    });

    actor.act_on::<PrintValue>(|actor, _context| {
        if let Some(signal) = actor.model.signal.as_ref() {
            info!(signal = %signal.id(), value = signal.value(), "{}: {}", signal.id(), signal.value());
        }
        Reply::ready()
    });

    actor.act_on::<PrintGraph>(|actor, _context| {
        let Some(signal) = actor.model.signal.as_ref() else {
            return Reply::ready();
        };

        match signal.graph() {
            Some(graph) => info!(signal = %signal.id(), "Graph:\n{}", graph),
            None => warn!(
                signal = %signal.id(),
                missing = ?signal.tracker().missing(),
                "Graph not assembled yet"
            ),
        }
        Reply::ready()
    });
}
