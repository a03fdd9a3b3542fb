//! Signal Kernel: glitch-free asynchronous reactive signals
//!
//! A network of named integer signals, each running as its own actor. A
//! signal either holds a value directly or derives it from one or two
//! upstream signals. Updates propagate asynchronously with the path they
//! travelled attached, which lets a combining signal hold back a
//! recomputation until both inputs reflect the same upstream event.

pub mod actors;
pub mod chain;
pub mod config;
pub mod directory;
pub mod graph;
pub mod messages;
pub mod operator;
pub mod signal;
pub mod tracker;

pub use actors::SignalActor;
pub use chain::{ChainLink, SignalChain};
pub use config::SignalConfig;
pub use directory::SignalDirectory;
pub use graph::{SignalGraph, SignalId};
pub use operator::CombineOperator;
pub use signal::{Emission, Propagation, SignalState};
pub use tracker::{DependencyTracker, Discovery};
