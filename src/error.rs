//! Error types for the correlation core
//!
//! One taxonomy covers the whole core so callers can pattern-match a
//! single enum: fatal input errors, per-store unavailability after retry
//! exhaustion, partial fan-out success, and aborted traversals.

use crate::events::store::{DocId, EventStoreError};
use crate::graph::store::GraphStoreError;
use crate::graph::types::EdgeRecord;
use std::fmt;
use thiserror::Error;

/// Which of the two external stores an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSide {
    Graph,
    Event,
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSide::Graph => write!(f, "graph"),
            StoreSide::Event => write!(f, "event"),
        }
    }
}

/// The half of a fan-out that did commit, reported alongside
/// [`CorrelationError::PartialSuccess`] so the caller can re-drive only
/// the failed half. Graph upserts are idempotent, so re-driving the
/// graph half is always safe; re-driving the event half may duplicate a
/// log record (accepted at-least-once semantics).
#[derive(Debug, Clone, PartialEq)]
pub enum CommittedWrite {
    /// The graph upsert committed; the merged edge as returned
    GraphEdge(EdgeRecord),
    /// The event append committed; the store-assigned document id
    EventDoc(DocId),
}

/// Errors surfaced by the correlation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    /// Caller error: the event is missing a required endpoint. Nothing
    /// was written to either store; not retried.
    #[error("malformed event: {0}")]
    MalformedEvent(&'static str),

    /// Graph store still failing after retry exhaustion
    #[error("graph store unavailable after {attempts} attempt(s): {source}")]
    GraphStoreUnavailable {
        attempts: u32,
        #[source]
        source: GraphStoreError,
    },

    /// Event store still failing after retry exhaustion
    #[error("event store unavailable after {attempts} attempt(s): {source}")]
    EventStoreUnavailable {
        attempts: u32,
        #[source]
        source: EventStoreError,
    },

    /// Both halves of the fan-out failed; both causes reported
    #[error("both stores unavailable (graph: {graph}; event: {event})")]
    StoresUnavailable {
        graph: GraphStoreError,
        event: EventStoreError,
    },

    /// One half of the fan-out committed, the other failed after retry
    /// exhaustion. `committed` identifies the half that does not need
    /// re-driving.
    #[error("partial success: {failed} store failed after {attempts} attempt(s): {reason}")]
    PartialSuccess {
        failed: StoreSide,
        attempts: u32,
        reason: String,
        committed: CommittedWrite,
    },

    /// Traversal aborted at its deadline. Returned instead of partial
    /// or possibly incorrect paths.
    #[error("traversal of paths to {target} (max {max_hops} hops) aborted after {elapsed_ms} ms")]
    TraversalTimeout {
        target: String,
        max_hops: usize,
        elapsed_ms: u64,
    },
}

impl CorrelationError {
    /// Whether re-submitting the same input can succeed (transient
    /// resource failures, as opposed to caller errors).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CorrelationError::MalformedEvent(_))
    }
}

pub type CorrelationResult<T> = Result<T, CorrelationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_not_retryable() {
        let err = CorrelationError::MalformedEvent("source_ip is empty");
        assert!(!err.is_retryable());
        assert_eq!(format!("{err}"), "malformed event: source_ip is empty");
    }

    #[test]
    fn test_partial_success_names_failed_side() {
        let err = CorrelationError::PartialSuccess {
            failed: StoreSide::Graph,
            attempts: 3,
            reason: "graph store unavailable: connection refused".to_string(),
            committed: CommittedWrite::EventDoc(DocId("doc-1".to_string())),
        };
        assert!(err.is_retryable());
        assert!(format!("{err}").starts_with("partial success: graph store failed"));
    }
}
