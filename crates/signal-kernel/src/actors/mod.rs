//! Acton-reactive actors for the signal network.
//!
//! ```text
//! shell ── Increment ──▶ Signal:x
//!                          └─ ValueUpdate (broadcast) ──▶ every signal
//!                                                          └─ dependents of x recombine
//!
//! Signal:z (starting)
//!   ├─ SendGraph ──▶ Signal:x ── GraphReply ──▶ Signal:z
//!   ├─ (all graphs in) Resend ──▶ dependencies ── ValueUpdate ──▶ Signal:z
//!   └─ SignalReady (broadcast) ──▶ dependents still waiting on z
//! ```
//!
//! Each signal owns its state; mailbox serialization means a value update
//! is never combined concurrently with another update to the same signal.

mod signal_actor;

pub use signal_actor::{SignalActor, SignalActorState};
