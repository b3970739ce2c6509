//! Sectrace — security event correlation and attack path tracing
//!
//! Correlates discrete security events into attacker→victim
//! relationship graphs and keeps a separate time-ordered event log,
//! reconciling the two views for callers.
//!
//! # Architecture
//!
//! - [`Correlator`] — the write path. Consumes one [`EventRecord`] at a
//!   time, merges the derived (source, target, attack type) edge into
//!   the graph store, and appends the raw record to the event store.
//!   The two writes fan out concurrently with bounded retry/backoff.
//! - [`PathAssembler`] — multi-hop traversal to a victim node,
//!   returning normalized [`AttackPath`]s, shortest and freshest first.
//! - [`EventQuery`] — time-windowed retrieval of an actor's raw events,
//!   each annotated with whether a matching graph edge exists.
//!
//! The two stores are external collaborators behind the [`GraphStore`]
//! and [`EventStore`] traits; [`MemoryGraphStore`] and
//! [`MemoryEventStore`] are in-process reference adapters with the
//! required atomic-merge and append-only semantics.
//!
//! # Example
//!
//! ```rust
//! use sectrace::{
//!     Correlator, EventRecord, MemoryEventStore, MemoryGraphStore,
//!     PathAssembler, Severity,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let graph = Arc::new(MemoryGraphStore::new());
//!     let events = Arc::new(MemoryEventStore::new());
//!     let correlator = Correlator::new(Arc::clone(&graph), Arc::clone(&events));
//!
//!     let event = EventRecord::new(
//!         "SQL_INJECTION",
//!         "192.168.1.100",
//!         "192.168.1.200",
//!         Severity::High,
//!         "Attempted SQL injection attack detected",
//!     );
//!     let ack = correlator.record(&event).await.unwrap();
//!     assert_eq!(ack.edge.occurrences, 1);
//!
//!     let paths = PathAssembler::new(graph)
//!         .find_paths_default("192.168.1.200")
//!         .await
//!         .unwrap();
//!     assert_eq!(paths.len(), 1);
//! }
//! ```

#![warn(clippy::all)]

pub mod correlator;
pub mod error;
pub mod events;
pub mod graph;
pub mod paths;
pub mod query;

// Re-export main types for convenience
pub use correlator::{ingest_partition, Ack, Correlator, CorrelatorConfig, RetryPolicy};
pub use error::{CommittedWrite, CorrelationError, CorrelationResult, StoreSide};
pub use events::{
    attack_types, DocId, EventRecord, EventStore, EventStoreError, EventStoreResult,
    IndexedField, MemoryEventStore, Severity,
};
pub use graph::{
    EdgeKey, EdgeRecord, GraphStore, GraphStoreError, GraphStoreResult, MemoryGraphStore,
    NodeRecord, RawPath,
};
pub use paths::{AttackPath, PathAssembler, PathHop, DEFAULT_MAX_HOPS};
pub use query::{ActorRole, CorrelatedEvent, EventQuery, QueryFilters, TimeRange};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
