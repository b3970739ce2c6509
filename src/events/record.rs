//! Event record — the immutable value type for one observed security event
//!
//! The serialized shape is the wire contract shared with both stores:
//! fixed keys `timestamp` (RFC 3339), `event_type`, `source_ip`,
//! `target_ip`, `severity`, `details`, plus optional extra fields
//! flattened to the top level (request method, response code, etc.).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a security event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Well-known attack type tags.
///
/// The edge type on the graph is an open string; these constants cover
/// the tags the ingestion side emits today.
pub mod attack_types {
    pub const SQL_INJECTION: &str = "SQL_INJECTION";
    pub const XSS: &str = "XSS";
    pub const DDOS: &str = "DDoS";
    pub const RCE: &str = "RCE";
    pub const PHISHING: &str = "PHISHING";
    pub const LATERAL_MOVEMENT: &str = "LATERAL_MOVEMENT";
    pub const DATA_EXFILTRATION: &str = "DATA_EXFILTRATION";
}

/// One observed security event.
///
/// Created once at the ingestion boundary and never mutated. The
/// Correlator appends it to the event store exactly as constructed and
/// derives the graph edge `(source_ip, target_ip, event_type)` from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Observation time (serialized as an RFC 3339 string)
    pub timestamp: DateTime<Utc>,

    /// Attack type tag (e.g. "SQL_INJECTION"); becomes the edge type
    pub event_type: String,

    /// Attacker address
    pub source_ip: String,

    /// Victim address
    pub target_ip: String,

    /// Event severity
    pub severity: Severity,

    /// Free-form description
    pub details: String,

    /// Optional extra attributes (request method, response code, user
    /// agent, ...). Flattened onto the wire record, insertion order kept.
    #[serde(flatten, default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl EventRecord {
    /// Create a new event record observed now.
    pub fn new(
        event_type: impl Into<String>,
        source_ip: impl Into<String>,
        target_ip: impl Into<String>,
        severity: Severity,
        details: impl Into<String>,
    ) -> Self {
        Self::at(
            Utc::now(),
            event_type,
            source_ip,
            target_ip,
            severity,
            details,
        )
    }

    /// Create a new event record with an explicit observation time.
    pub fn at(
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        source_ip: impl Into<String>,
        target_ip: impl Into<String>,
        severity: Severity,
        details: impl Into<String>,
    ) -> Self {
        EventRecord {
            timestamp,
            event_type: event_type.into(),
            source_ip: source_ip.into(),
            target_ip: target_ip.into(),
            severity,
            details: details.into(),
            extra: IndexMap::new(),
        }
    }

    /// Attach an extra attribute, returning the record for chaining.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Get an extra attribute value.
    pub fn get_extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Whether both endpoint addresses are present and non-blank.
    pub fn has_endpoints(&self) -> bool {
        !self.source_ip.trim().is_empty() && !self.target_ip.trim().is_empty()
    }
}
