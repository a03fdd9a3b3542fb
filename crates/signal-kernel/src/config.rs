//! Creation configuration for a signal.

use serde::{Deserialize, Serialize};

use crate::graph::SignalId;
use crate::operator::CombineOperator;

/// Configuration consumed when a signal actor is constructed.
///
/// A leaf signal carries an `initial_value`; a dependent signal carries one
/// or two `dependencies`, with an `operator` when there are two. The shape
/// is trusted here; the command layer is responsible for producing valid
/// configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalConfig {
    /// Unique name of the signal in the network
    pub id: SignalId,

    /// Starting value for a leaf signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<i64>,

    /// Upstream signals, in declaration order (the combinator's argument order)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<SignalId>,

    /// Combinator for two dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<CombineOperator>,
}

impl SignalConfig {
    /// A signal with no dependencies.
    pub fn leaf(id: impl Into<SignalId>, initial_value: i64) -> Self {
        Self {
            id: id.into(),
            initial_value: Some(initial_value),
            dependencies: Vec::new(),
            operator: None,
        }
    }

    /// A signal that mirrors a single upstream signal.
    pub fn map(id: impl Into<SignalId>, upstream: impl Into<SignalId>) -> Self {
        Self {
            id: id.into(),
            initial_value: None,
            dependencies: vec![upstream.into()],
            operator: None,
        }
    }

    /// A signal combining two upstream signals.
    pub fn combine(
        id: impl Into<SignalId>,
        lhs: impl Into<SignalId>,
        rhs: impl Into<SignalId>,
        operator: CombineOperator,
    ) -> Self {
        Self {
            id: id.into(),
            initial_value: None,
            dependencies: vec![lhs.into(), rhs.into()],
            operator: Some(operator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_wire_shape() {
        let config = SignalConfig::leaf("x", 4);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({ "id": "x", "initialValue": 4 })
        );
    }

    #[test]
    fn test_combine_from_json() {
        let config: SignalConfig = serde_json::from_value(json!({
            "id": "z",
            "dependencies": ["x", "y"],
            "operator": "SUBTRACT"
        }))
        .unwrap();

        assert_eq!(
            config,
            SignalConfig::combine("z", "x", "y", CombineOperator::Subtract)
        );
    }

    #[test]
    fn test_map_has_single_dependency() {
        let config = SignalConfig::map("y", "x");
        assert_eq!(config.dependencies, vec!["x".to_string()]);
        assert!(config.operator.is_none());
        assert!(config.initial_value.is_none());
    }
}
