//! Shared address book mapping signal ids to actor handles.

use std::sync::Arc;

use acton_reactive::prelude::ActorHandle;
use dashmap::DashMap;

use crate::graph::SignalId;

/// Where to reach each signal in the network.
///
/// Cloning shares the same table. Signals register themselves before they
/// start, so a dependent created later can always resolve an existing id.
#[derive(Clone, Default)]
pub struct SignalDirectory {
    handles: Arc<DashMap<SignalId, ActorHandle>>,
}

impl std::fmt::Debug for SignalDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDirectory")
            .field("ids", &self.ids())
            .finish()
    }
}

impl SignalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`. Returns `false` and leaves the entry untouched if the
    /// id is already taken.
    pub fn register(&self, id: impl Into<SignalId>, handle: ActorHandle) -> bool {
        match self.handles.entry(id.into()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<ActorHandle> {
        self.handles.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<SignalId> {
        let mut ids: Vec<SignalId> = self.handles.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
