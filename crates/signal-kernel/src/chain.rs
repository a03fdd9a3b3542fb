//! Update provenance: the path a value travelled, stamped with event counters.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::graph::SignalId;

/// One hop of a [`SignalChain`]: `id` emitted the value with `counter`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainLink {
    pub id: SignalId,
    pub counter: u64,
}

/// The single path an update travelled through, from the most upstream
/// signal to the most recent relay.
///
/// A chain always holds at least one link. On the wire it uses the
/// [`SignalGraph`](crate::graph::SignalGraph) shape plus a `counter` per
/// node. The outermost node is the most recent relay and each node has at
/// most one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ChainNode", into = "ChainNode")]
pub struct SignalChain {
    links: Vec<ChainLink>,
}

impl SignalChain {
    /// Start a chain at `id`, stamped with `counter`.
    pub fn new(id: impl Into<SignalId>, counter: u64) -> Self {
        Self {
            links: vec![ChainLink {
                id: id.into(),
                counter,
            }],
        }
    }

    /// Record that the value then passed through `id`, which stamped it
    /// with `counter`.
    pub fn chain(&mut self, id: impl Into<SignalId>, counter: u64) {
        self.links.push(ChainLink {
            id: id.into(),
            counter,
        });
    }

    /// Links in propagation order.
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Ids in propagation order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.id.as_str())
    }

    /// The signal that relayed the value most recently.
    pub fn last(&self) -> &ChainLink {
        // Non-empty by construction.
        &self.links[self.links.len() - 1]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.links.iter().any(|link| link.id == id)
    }

    /// Counter recorded for `id`, if `id` is on this path.
    pub fn event_counter_for(&self, id: &str) -> Option<u64> {
        self.links
            .iter()
            .find(|link| link.id == id)
            .map(|link| link.counter)
    }

    /// Ids present on both paths: the points where two independently
    /// arriving updates may have forked from the same upstream event.
    pub fn conflicts(&self, other: &SignalChain) -> BTreeSet<SignalId> {
        self.links
            .iter()
            .filter(|link| other.contains(&link.id))
            .map(|link| link.id.clone())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> anyhow::Result<Self> {
        Self::deserialize(value).context("Malformed signal chain")
    }
}

impl fmt::Display for SignalChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<String> = self
            .links
            .iter()
            .map(|link| format!("{}#{}", link.id, link.counter))
            .collect();
        write!(f, "[{}]", hops.join(" -> "))
    }
}

/// Nested wire form shared with `SignalGraph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChainNode {
    id: SignalId,
    #[serde(default)]
    counter: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<ChainNode>,
}

impl From<SignalChain> for ChainNode {
    fn from(chain: SignalChain) -> Self {
        let mut links = chain.links.into_iter();
        // Non-empty by construction.
        let first = links.next().unwrap_or(ChainLink {
            id: SignalId::new(),
            counter: 0,
        });

        links.fold(
            ChainNode {
                id: first.id,
                counter: first.counter,
                dependencies: Vec::new(),
            },
            |upstream, link| ChainNode {
                id: link.id,
                counter: link.counter,
                dependencies: vec![upstream],
            },
        )
    }
}

impl TryFrom<ChainNode> for SignalChain {
    type Error = anyhow::Error;

    fn try_from(node: ChainNode) -> Result<Self, Self::Error> {
        let mut links = Vec::new();
        let mut current = Some(node);

        while let Some(mut node) = current.take() {
            if node.dependencies.len() > 1 {
                anyhow::bail!(
                    "Chain node {} has {} dependencies; a chain is a single path",
                    node.id,
                    node.dependencies.len()
                );
            }
            current = node.dependencies.pop();
            links.push(ChainLink {
                id: node.id,
                counter: node.counter,
            });
        }

        // Walked from the most recent relay upstream.
        links.reverse();
        Ok(Self { links })
    }
}
