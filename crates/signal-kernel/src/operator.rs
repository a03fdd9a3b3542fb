//! Binary combinators applied by signals with two dependencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operators that can be used to combine two signal values.
///
/// Arithmetic wraps on overflow, so a combinator never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombineOperator {
    /// `lhs + rhs`
    Add,
    /// `lhs - rhs`
    Subtract,
}

impl CombineOperator {
    /// Apply the operator to two values, in declared dependency order.
    pub fn call(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Subtract => lhs.wrapping_sub(rhs),
        }
    }

    /// Wire name used in creation configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Subtract => "SUBTRACT",
        }
    }

    /// Infix symbol used by the command shell.
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
        }
    }

    /// Look up an operator by its infix symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            _ => None,
        }
    }
}

impl fmt::Display for CombineOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CombineOperator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADD" | "+" => Ok(Self::Add),
            "SUBTRACT" | "-" => Ok(Self::Subtract),
            other => anyhow::bail!("Unknown combine operator: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_subtract() {
        assert_eq!(CombineOperator::Add.call(2, 3), 5);
        assert_eq!(CombineOperator::Subtract.call(2, 3), -1);
    }

    #[test]
    fn test_argument_order_matters_for_subtract() {
        assert_ne!(
            CombineOperator::Subtract.call(10, 4),
            CombineOperator::Subtract.call(4, 10)
        );
    }

    #[test]
    fn test_overflow_wraps() {
        assert_eq!(CombineOperator::Add.call(i64::MAX, 1), i64::MIN);
        assert_eq!(CombineOperator::Subtract.call(i64::MIN, 1), i64::MAX);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&CombineOperator::Add).unwrap(),
            "\"ADD\""
        );
        let op: CombineOperator = serde_json::from_str("\"SUBTRACT\"").unwrap();
        assert_eq!(op, CombineOperator::Subtract);
    }

    #[test]
    fn test_parse_name_and_symbol() {
        assert_eq!("add".parse::<CombineOperator>().unwrap(), CombineOperator::Add);
        assert_eq!("-".parse::<CombineOperator>().unwrap(), CombineOperator::Subtract);
        assert!("MULTIPLY".parse::<CombineOperator>().is_err());
        assert_eq!(CombineOperator::from_symbol('+'), Some(CombineOperator::Add));
        assert_eq!(CombineOperator::from_symbol('*'), None);
    }
}
