//! Items produced by query iterators.

use core::fmt;

use crate::data::NodeTable;
use crate::error::{Error, Result};

/// Reference to a node of the queried table, with the relevance score it
/// picked up from full-text predicates (0 if none).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbNode {
    pub pre: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    /// Booleans carry a score so that full-text results can be ranked.
    Boolean { value: bool, score: f64 },
    String(String),
    Integer(i64),
    Double(f64),
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicValue::Boolean { value, .. } => write!(f, "{value}"),
            AtomicValue::String(s) => f.write_str(s),
            AtomicValue::Integer(i) => write!(f, "{i}"),
            AtomicValue::Double(d) => write!(f, "{d}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(DbNode),
    Atomic(AtomicValue),
}

pub type Sequence = Vec<Item>;

impl Item {
    pub fn node(pre: usize) -> Self {
        Item::Node(DbNode { pre, score: 0.0 })
    }

    pub fn boolean(value: bool) -> Self {
        Item::Atomic(AtomicValue::Boolean { value, score: 0.0 })
    }

    pub fn scored_boolean(value: bool, score: f64) -> Self {
        Item::Atomic(AtomicValue::Boolean { value, score })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Item::Atomic(AtomicValue::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Item::Atomic(AtomicValue::Integer(value))
    }

    pub fn double(value: f64) -> Self {
        Item::Atomic(AtomicValue::Double(value))
    }

    /// Intrinsic relevance score of the item.
    pub fn score(&self) -> f64 {
        match self {
            Item::Node(n) => n.score,
            Item::Atomic(AtomicValue::Boolean { score, .. }) => *score,
            Item::Atomic(_) => 0.0,
        }
    }

    /// Returns a copy carrying `score`; items without a score slot are
    /// returned unchanged.
    pub fn with_score(self, score: f64) -> Self {
        match self {
            Item::Node(n) => Item::Node(DbNode { score, ..n }),
            Item::Atomic(AtomicValue::Boolean { value, .. }) => Item::scored_boolean(value, score),
            other => other,
        }
    }

    pub fn as_node(&self) -> Option<usize> {
        match self {
            Item::Node(n) => Some(n.pre),
            Item::Atomic(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Item::Atomic(AtomicValue::Integer(i)) => Some(*i),
            Item::Atomic(AtomicValue::Double(d)) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    pub fn string_value(&self, table: &NodeTable) -> String {
        match self {
            Item::Node(n) => table.string_value(n.pre),
            Item::Atomic(a) => a.to_string(),
        }
    }
}

/// Effective boolean value of a sequence.
pub fn ebv(items: &[Item]) -> Result<bool> {
    match items {
        [] => Ok(false),
        [Item::Node(_), ..] => Ok(true),
        [Item::Atomic(a)] => Ok(match a {
            AtomicValue::Boolean { value, .. } => *value,
            AtomicValue::String(s) => !s.is_empty(),
            AtomicValue::Integer(i) => *i != 0,
            AtomicValue::Double(d) => *d != 0.0 && !d.is_nan(),
        }),
        _ => Err(Error::type_error("effective boolean value is not defined for a sequence of several atomic values")),
    }
}

/// Space-separated string values of all items.
pub fn atomize(items: &[Item], table: &NodeTable) -> String {
    items.iter().map(|i| i.string_value(table)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ebv_rules() {
        assert!(!ebv(&[]).unwrap());
        assert!(ebv(&[Item::node(3), Item::integer(0)]).unwrap());
        assert!(!ebv(&[Item::string("")]).unwrap());
        assert!(ebv(&[Item::double(0.5)]).unwrap());
        assert!(!ebv(&[Item::double(f64::NAN)]).unwrap());
        assert!(ebv(&[Item::integer(1), Item::integer(2)]).is_err());
    }

    #[test]
    fn scores_follow_items() {
        let item = Item::node(1).with_score(0.25);
        assert_eq!(item.score(), 0.25);
        assert_eq!(Item::string("x").with_score(0.5).score(), 0.0);
    }
}
