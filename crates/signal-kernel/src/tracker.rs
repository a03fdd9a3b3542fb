//! Dependency discovery: assembling a signal's graph from its dependencies' graphs.

use crate::graph::{SignalGraph, SignalId};

/// Outbound side of discovery: something that can ask a dependency for its graph.
pub trait GraphRequests {
    fn request_graph(&mut self, dependency: &SignalId);
}

/// Collects the requests so an actor can send them later.
impl GraphRequests for Vec<SignalId> {
    fn request_graph(&mut self, dependency: &SignalId) {
        self.push(dependency.clone());
    }
}

/// Progress of discovery after a call into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// The graph was assembled by this call. Reported exactly once.
    Assembled,
    /// Still waiting for at least one dependency graph.
    Pending,
    /// The call changed nothing (already assembled, or not a dependency).
    Ignored,
}

/// Gathers the graphs of a signal's declared dependencies.
///
/// Graphs are slotted by declaration index, not arrival order, so the
/// assembled graph lists dependencies exactly as declared.
#[derive(Debug, Clone, Default)]
pub struct DependencyTracker {
    id: SignalId,
    declared: Vec<SignalId>,
    slots: Vec<Option<SignalGraph>>,
    graph: Option<SignalGraph>,
}

impl DependencyTracker {
    pub fn new(id: impl Into<SignalId>, declared: Vec<SignalId>) -> Self {
        let slots = vec![None; declared.len()];
        Self {
            id: id.into(),
            declared,
            slots,
            graph: None,
        }
    }

    pub fn number_of_dependencies(&self) -> usize {
        self.declared.len()
    }

    /// Declared dependency ids, in declaration order.
    pub fn declared(&self) -> &[SignalId] {
        &self.declared
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.declared.iter().any(|dep| dep == id)
    }

    /// Start discovery.
    ///
    /// With no dependencies the graph is a leaf and is assembled immediately.
    /// Otherwise one request per declared dependency is issued, in order.
    pub fn gather_dependencies(&mut self, requests: &mut impl GraphRequests) -> Discovery {
        if self.graph.is_some() {
            return Discovery::Ignored;
        }

        if self.declared.is_empty() {
            self.graph = Some(SignalGraph::leaf(self.id.clone()));
            return Discovery::Assembled;
        }

        for dep in &self.declared {
            requests.request_graph(dep);
        }
        Discovery::Pending
    }

    /// Record the graph sent back by dependency `from`.
    ///
    /// Every slot declared for `from` is filled, so a dependency listed twice
    /// is satisfied by a single reply.
    pub fn accept_graph(&mut self, from: &str, graph: SignalGraph) -> Discovery {
        if self.graph.is_some() || !self.is_declared(from) {
            return Discovery::Ignored;
        }

        for (slot, dep) in self.slots.iter_mut().zip(&self.declared) {
            if dep == from {
                *slot = Some(graph.clone());
            }
        }

        if self.slots.iter().any(Option::is_none) {
            return Discovery::Pending;
        }

        let dependencies = self.slots.iter().flatten().cloned().collect();
        self.graph = Some(SignalGraph::new(self.id.clone(), dependencies));
        Discovery::Assembled
    }

    /// Declared dependencies whose graph has not arrived yet.
    pub fn missing(&self) -> Vec<&SignalId> {
        self.declared
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(dep, _)| dep)
            .collect()
    }

    /// The assembled graph; `None` until discovery completes.
    pub fn graph(&self) -> Option<&SignalGraph> {
        self.graph.as_ref()
    }

    /// Discovered upstream graphs in declaration order; empty until assembled.
    pub fn dependencies(&self) -> &[SignalGraph] {
        self.graph
            .as_ref()
            .map(|graph| graph.dependencies())
            .unwrap_or(&[])
    }
}
