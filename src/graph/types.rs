//! Core type definitions for the relationship graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A graph node: one network actor, keyed by its canonical identifier
/// (an IP address or equivalent stable string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Canonical identifier; the merge key for idempotent upserts
    pub key: String,
}

impl NodeRecord {
    pub fn new(key: impl Into<String>) -> Self {
        NodeRecord { key: key.into() }
    }
}

impl fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Identity of an attacker→victim relationship.
///
/// Edges are deduplicated on this triple: repeated observations of the
/// same (from, to, attack type) merge into one edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
    pub attack_type: String,
}

impl EdgeKey {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        attack_type: impl Into<String>,
    ) -> Self {
        EdgeKey {
            from: from.into(),
            to: to.into(),
            attack_type: attack_type.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.attack_type, self.to)
    }
}

/// A directed "source attacked target" relationship.
///
/// Carries the observation window and an occurrence counter maintained
/// by the store's atomic merge: the first observation sets `first_seen`,
/// every observation bumps `last_seen` and `occurrences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Attacker node key
    pub from: String,

    /// Victim node key
    pub to: String,

    /// Attack type tag (open string, e.g. "SQL_INJECTION")
    pub attack_type: String,

    /// First observation time
    pub first_seen: DateTime<Utc>,

    /// Most recent observation time
    pub last_seen: DateTime<Utc>,

    /// Number of merged observations
    pub occurrences: u64,
}

impl EdgeRecord {
    /// The dedup key for this edge.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.from, &self.to, &self.attack_type)
    }

    /// Check whether this edge matches an observed event triple.
    pub fn matches(&self, source: &str, target: &str, attack_type: &str) -> bool {
        self.from == source && self.to == target && self.attack_type == attack_type
    }
}

/// A traversal result as the graph store returns it: parallel node and
/// edge sequences from some origin to the queried target, unnormalized.
///
/// `nodes.len() == edges.len() + 1`; `nodes[i]` is the source of
/// `edges[i]` and `nodes[i + 1]` its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPath {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl RawPath {
    /// Number of hops (edges) in the path.
    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_edge_key_display() {
        let key = EdgeKey::new("1.1.1.1", "2.2.2.2", "XSS");
        assert_eq!(format!("{}", key), "1.1.1.1 -[XSS]-> 2.2.2.2");
    }

    #[test]
    fn test_edge_matches() {
        let now = Utc::now();
        let edge = EdgeRecord {
            from: "1.1.1.1".to_string(),
            to: "2.2.2.2".to_string(),
            attack_type: "RCE".to_string(),
            first_seen: now,
            last_seen: now,
            occurrences: 1,
        };

        assert!(edge.matches("1.1.1.1", "2.2.2.2", "RCE"));
        assert!(!edge.matches("2.2.2.2", "1.1.1.1", "RCE"));
        assert!(!edge.matches("1.1.1.1", "2.2.2.2", "XSS"));
        assert_eq!(edge.key(), EdgeKey::new("1.1.1.1", "2.2.2.2", "RCE"));
    }
}
