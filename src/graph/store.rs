//! Graph store adapter contract
//!
//! The graph backend is an external collaborator. The correlation core
//! only requires three capabilities from it:
//!
//! - idempotent node/edge upserts with atomic merge semantics (edges are
//!   deduplicated on the (from, to, attack_type) triple, merging bumps
//!   `last_seen` and an occurrence counter),
//! - a bounded-depth backward traversal returning simple paths,
//! - a batched lookup of all edges touching one node key.
//!
//! All cross-invocation consistency is delegated to the store: `upsert_edge`
//! must be a single atomic create-or-merge, never a client-side
//! read-then-write, so concurrent correlators cannot race into duplicate
//! edges.

use super::types::{EdgeRecord, RawPath};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors a graph store adapter can surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphStoreError {
    /// Backend unreachable or refusing requests; retryable
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its deadline; retryable
    #[error("graph store call timed out after {0} ms")]
    Timeout(u64),

    /// Backend rejected the request for a non-transient reason
    #[error("graph store internal error: {0}")]
    Internal(String),
}

impl GraphStoreError {
    /// Whether a retry can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GraphStoreError::Unavailable(_) | GraphStoreError::Timeout(_)
        )
    }
}

pub type GraphStoreResult<T> = Result<T, GraphStoreError>;

/// Adapter contract for the relationship graph backend.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Ensure a node with the given key exists. Idempotent: a node with
    /// a given key is created at most once.
    async fn upsert_node(&self, key: &str) -> GraphStoreResult<()>;

    /// Atomically merge one observation into the graph: create both
    /// endpoint nodes if missing, then create the edge or, if an edge
    /// with the same (from, to, attack_type) exists, update `last_seen`
    /// and increment its occurrence counter.
    ///
    /// Returns the edge as merged, so callers see the updated counter.
    async fn upsert_edge(
        &self,
        from: &str,
        to: &str,
        attack_type: &str,
        seen_at: DateTime<Utc>,
    ) -> GraphStoreResult<EdgeRecord>;

    /// All simple directed paths that terminate at `target`, up to
    /// `max_hops` edges long, found by walking edges backward from the
    /// target. Unordered; callers own any ordering contract. A target
    /// with no incoming edges yields an empty vec.
    async fn traverse(&self, target: &str, max_hops: usize) -> GraphStoreResult<Vec<RawPath>>;

    /// All edges touching `key` (incoming and outgoing) in one call.
    /// Used to annotate query results without per-record round trips.
    async fn edges_of(&self, key: &str) -> GraphStoreResult<Vec<EdgeRecord>>;
}
