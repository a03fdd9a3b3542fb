//! Ready waiter actor for receiving SignalReady broadcasts.
//!
//! Bridges the signal network's broker to the shell by forwarding the id of
//! every signal that finishes discovery to an mpsc channel.

use acton_reactive::prelude::*;
use tokio::sync::mpsc;

use signal_kernel::messages::SignalReady;
use signal_kernel::SignalId;

/// State for the ready waiter actor.
#[derive(Default, Clone)]
pub struct ReadyWaiterState {
    /// Channel sender for forwarding ready ids
    pub tx: Option<mpsc::Sender<SignalId>>,
}

impl std::fmt::Debug for ReadyWaiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyWaiterState")
            .field("has_tx", &self.tx.is_some())
            .finish()
    }
}

/// Actor that receives SignalReady broadcasts and forwards them to a channel.
pub struct ReadyWaiter {
    tx: mpsc::Sender<SignalId>,
}

impl ReadyWaiter {
    pub fn new(tx: mpsc::Sender<SignalId>) -> Self {
        Self { tx }
    }

    /// Spawn the actor in the runtime.
    ///
    /// Must be spawned before any signal so no readiness notice is missed.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor = runtime.new_actor_with_name::<ReadyWaiterState>("ReadyWaiter".to_string());

        actor.model.tx = Some(self.tx);

        // Subscribe to SignalReady broadcasts before starting
        actor.handle().subscribe::<SignalReady>().await;

        actor.act_on::<SignalReady>(|actor, context| {
            let id = context.message().id.clone();
            let tx = actor.model.tx.clone();

            Reply::pending(async move {
                if let Some(tx) = tx {
                    // Receiver may have been dropped
                    let _ = tx.send(id).await;
                }
            })
        });

        actor.start().await
    }
}
