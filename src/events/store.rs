//! Event store adapter contract
//!
//! The event log backend is an external collaborator. It must provide
//! append-only writes into date-based partitions and an equality filter
//! on an indexed field combined with an inclusive time range, without a
//! full scan for filtered queries.

use super::record::EventRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Store-assigned identifier of one appended document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields the store keeps an equality index on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedField {
    SourceIp,
    TargetIp,
}

impl IndexedField {
    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexedField::SourceIp => "source_ip",
            IndexedField::TargetIp => "target_ip",
        }
    }
}

/// Errors an event store adapter can surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventStoreError {
    /// Backend unreachable or refusing requests; retryable
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its deadline; retryable
    #[error("event store call timed out after {0} ms")]
    Timeout(u64),

    /// Backend rejected the request for a non-transient reason
    #[error("event store internal error: {0}")]
    Internal(String),
}

impl EventStoreError {
    /// Whether a retry can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventStoreError::Unavailable(_) | EventStoreError::Timeout(_)
        )
    }
}

pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Adapter contract for the append-only event log backend.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one record to the named partition. Strictly append-only:
    /// the store never collapses identical records, so re-submission
    /// after a reported failure may store duplicates (at-least-once).
    /// Returns the store-assigned document id.
    async fn append(&self, record: &EventRecord, partition: &str) -> EventStoreResult<DocId>;

    /// All records where `field == value` and `timestamp` falls within
    /// the inclusive `[range.0, range.1]` bounds, across partitions, in
    /// stable append order.
    async fn query(
        &self,
        field: IndexedField,
        value: &str,
        range: (DateTime<Utc>, DateTime<Utc>),
    ) -> EventStoreResult<Vec<EventRecord>>;
}
