//! Message types for acton-reactive actor communication.
//!
//! Value updates and readiness notices travel over the broker; everything
//! aimed at one signal is sent to its handle directly.

use acton_reactive::prelude::ActorHandle;

use crate::graph::SignalId;

/// Log the signal's current value.
#[derive(Debug, Clone)]
pub struct PrintValue;

/// Log the signal's assembled dependency graph.
#[derive(Debug, Clone)]
pub struct PrintGraph;

/// Bump a signal that has no dependencies.
#[derive(Debug, Clone)]
pub struct Increment;

/// Ask a signal for its graph - sent by a dependent during discovery.
#[derive(Debug, Clone)]
pub struct SendGraph {
    /// Where the `GraphReply` goes
    pub requester: ActorHandle,
}

/// Answer to `SendGraph`.
#[derive(Debug, Clone)]
pub struct GraphReply {
    /// The signal that answered
    pub from: SignalId,
    /// Graph in wire form; `None` while the sender is still discovering
    pub graph: Option<serde_json::Value>,
}

/// Suppress (or resume) outbound publication.
#[derive(Debug, Clone)]
pub struct Block {
    pub blocked: bool,
}

/// Toggle glitch avoidance on a combining signal.
#[derive(Debug, Clone)]
pub struct SetGlitchAvoidance {
    pub enabled: bool,
}

/// Replay the last published value.
#[derive(Debug, Clone)]
pub struct Resend {
    /// Send straight to this handle; broadcast when `None`
    pub requester: Option<ActorHandle>,
}

/// A signal published a new value - broadcast to all signals.
///
/// Receivers keep only updates whose `source` they declared as a dependency.
#[derive(Debug, Clone)]
pub struct ValueUpdate {
    /// Publishing signal
    pub source: SignalId,
    /// The new value
    pub value: i64,
    /// `SignalChain` in wire form
    pub chain: serde_json::Value,
}

/// A signal finished discovery - broadcast once per signal.
///
/// Dependents still waiting on `id` re-request its graph.
#[derive(Debug, Clone)]
pub struct SignalReady {
    pub id: SignalId,
    pub handle: ActorHandle,
}
