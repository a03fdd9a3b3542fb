//! Dependency graphs: the static upstream topology of a signal.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::chain::SignalChain;

/// Unique identifier for a signal within the network.
pub type SignalId = String;

/// Immutable tree describing a signal's transitive dependencies by id.
///
/// Data flows from the leaves (signals with no dependencies) towards the
/// root. Equality and hashing are structural and sensitive to dependency
/// order.
///
/// Wire form is `{ "id": .., "dependencies": [..] }`, with `dependencies`
/// omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalGraph {
    id: SignalId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<SignalGraph>,
}

impl SignalGraph {
    /// A graph node for a signal with no dependencies.
    pub fn leaf(id: impl Into<SignalId>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
        }
    }

    /// A graph node with the given upstream graphs, in declaration order.
    pub fn new(id: impl Into<SignalId>, dependencies: Vec<SignalGraph>) -> Self {
        Self {
            id: id.into(),
            dependencies,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Immediate upstream graphs, in declaration order.
    pub fn dependencies(&self) -> &[SignalGraph] {
        &self.dependencies
    }

    /// `true` if `id` is this node's id or appears anywhere upstream.
    pub fn contains_id(&self, id: &str) -> bool {
        self.id == id || self.dependencies.iter().any(|dep| dep.contains_id(id))
    }

    /// Every maximal route from a leaf to one of this node's immediate
    /// dependencies, ordered in propagation order (most upstream first).
    ///
    /// The node itself is not part of any path, so a leaf has no paths.
    pub fn all_paths(&self) -> Vec<SignalChain> {
        self.dependencies
            .iter()
            .flat_map(|dep| dep.routes())
            .filter_map(|route| {
                let mut ids = route.into_iter();
                let mut chain = SignalChain::new(ids.next()?, 0);
                for id in ids {
                    chain.chain(id, 0);
                }
                Some(chain)
            })
            .collect()
    }

    /// Routes from each leaf down to and including this node. Built on the
    /// way back up the recursion, so each route ends with `self.id`.
    fn routes(&self) -> Vec<Vec<&str>> {
        if self.dependencies.is_empty() {
            return vec![vec![self.id.as_str()]];
        }

        let mut routes = Vec::new();
        for dep in &self.dependencies {
            for mut route in dep.routes() {
                route.push(self.id.as_str());
                routes.push(route);
            }
        }
        routes
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> anyhow::Result<Self> {
        Self::deserialize(value).context("Malformed signal graph")
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.id, indent = depth * 2)?;
        for dep in &self.dependencies {
            dep.render(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented tree, one id per line, dependencies nested under their dependent.
impl fmt::Display for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
