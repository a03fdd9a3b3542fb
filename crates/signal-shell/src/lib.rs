//! Signal Shell: interactive front end for a reactive signal network.
//!
//! Reads one command per line, creates signals as actors on a shared
//! runtime, and forwards everything else to the addressed signal.

pub mod command;
pub mod network;
pub mod parser;
pub mod ready_waiter;
pub mod shell;

pub use command::{Command, Flow};
pub use network::NetworkConfig;
pub use parser::parse;
pub use shell::Shell;
