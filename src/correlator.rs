//! Correlator — merges raw events into the relationship graph and the
//! event log
//!
//! One `record()` call per event: validate, derive the edge triple,
//! then fan out to both stores concurrently. The two writes are
//! independent side effects; a failure in one never blocks the other,
//! and each is retried with bounded backoff while its error is
//! transient. Delivery is at-least-once per store: the graph's dedup key
//! makes retried upserts safe, while retried appends may duplicate log
//! records (accepted).
//!
//! The Correlator holds no mutable state of its own, so any number of
//! ingestion workers may call `record()` concurrently on one shared
//! instance; consistency under concurrent writers is the stores'
//! atomic-upsert obligation.

use crate::error::{CommittedWrite, CorrelationError, CorrelationResult, StoreSide};
use crate::events::record::EventRecord;
use crate::events::store::{DocId, EventStore, EventStoreError};
use crate::graph::store::{GraphStore, GraphStoreError};
use crate::graph::types::EdgeRecord;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for transient store failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retries)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Double the delay after every failed attempt; fixed delay if false
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    fn backoff_for(&self, attempt: u32) -> Duration {
        if self.exponential {
            self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
        } else {
            self.initial_backoff
        }
    }
}

/// Correlator configuration.
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    pub retry: RetryPolicy,

    /// Deadline per individual store call; elapsing counts as a
    /// transient failure subject to the retry policy
    pub op_timeout: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        CorrelatorConfig {
            retry: RetryPolicy::default(),
            op_timeout: Duration::from_secs(5),
        }
    }
}

/// Successful outcome of recording one event: both stores committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    /// The edge as merged into the graph (carries the occurrence count)
    pub edge: EdgeRecord,

    /// Store-assigned id of the appended event document
    pub doc_id: DocId,
}

/// Store errors the retry loop can drive.
trait StoreFault: std::fmt::Display {
    fn is_transient(&self) -> bool;
    fn timed_out(ms: u64) -> Self;
}

impl StoreFault for GraphStoreError {
    fn is_transient(&self) -> bool {
        GraphStoreError::is_transient(self)
    }
    fn timed_out(ms: u64) -> Self {
        GraphStoreError::Timeout(ms)
    }
}

impl StoreFault for EventStoreError {
    fn is_transient(&self) -> bool {
        EventStoreError::is_transient(self)
    }
    fn timed_out(ms: u64) -> Self {
        EventStoreError::Timeout(ms)
    }
}

/// Partition (index) name for events ingested at the given instant,
/// date-based so each day's log is its own partition.
pub fn ingest_partition(at: DateTime<Utc>) -> String {
    format!("security-events-{}", at.format("%Y.%m.%d"))
}

/// The correlation core's write path.
pub struct Correlator<G: GraphStore, E: EventStore> {
    graph: Arc<G>,
    events: Arc<E>,
    config: CorrelatorConfig,
}

impl<G: GraphStore, E: EventStore> Correlator<G, E> {
    /// Create a correlator with the default retry/timeout configuration.
    pub fn new(graph: Arc<G>, events: Arc<E>) -> Self {
        Self::with_config(graph, events, CorrelatorConfig::default())
    }

    pub fn with_config(graph: Arc<G>, events: Arc<E>, config: CorrelatorConfig) -> Self {
        Correlator {
            graph,
            events,
            config,
        }
    }

    /// Record one observed event: upsert the attacker→victim edge into
    /// the graph and append the raw record to the event log.
    ///
    /// The two writes run concurrently and are independently retried.
    /// Outcomes:
    /// - both committed → `Ok(Ack)`
    /// - exactly one committed → `Err(PartialSuccess)` naming the failed
    ///   side and carrying the committed half
    /// - neither committed → `Err(StoresUnavailable)` with both causes
    /// - missing endpoint → `Err(MalformedEvent)`, nothing written
    pub async fn record(&self, event: &EventRecord) -> CorrelationResult<Ack> {
        if event.source_ip.trim().is_empty() {
            return Err(CorrelationError::MalformedEvent("source_ip is empty"));
        }
        if event.target_ip.trim().is_empty() {
            return Err(CorrelationError::MalformedEvent("target_ip is empty"));
        }

        let partition = ingest_partition(Utc::now());

        let graph_write = self.drive(StoreSide::Graph, || {
            self.graph.upsert_edge(
                &event.source_ip,
                &event.target_ip,
                &event.event_type,
                event.timestamp,
            )
        });
        let log_write = self.drive(StoreSide::Event, || self.events.append(event, &partition));

        let ((graph_result, graph_attempts), (event_result, event_attempts)) =
            tokio::join!(graph_write, log_write);

        match (graph_result, event_result) {
            (Ok(edge), Ok(doc_id)) => {
                debug!(
                    edge = %edge.key(),
                    occurrences = edge.occurrences,
                    %doc_id,
                    "event correlated"
                );
                Ok(Ack { edge, doc_id })
            }
            (Err(graph_err), Ok(doc_id)) => Err(CorrelationError::PartialSuccess {
                failed: StoreSide::Graph,
                attempts: graph_attempts,
                reason: graph_err.to_string(),
                committed: CommittedWrite::EventDoc(doc_id),
            }),
            (Ok(edge), Err(event_err)) => Err(CorrelationError::PartialSuccess {
                failed: StoreSide::Event,
                attempts: event_attempts,
                reason: event_err.to_string(),
                committed: CommittedWrite::GraphEdge(edge),
            }),
            (Err(graph_err), Err(event_err)) => Err(CorrelationError::StoresUnavailable {
                graph: graph_err,
                event: event_err,
            }),
        }
    }

    /// Run one store call under the per-call deadline, retrying
    /// transient failures per the policy. Returns the final result and
    /// the number of attempts made.
    async fn drive<T, E2, F, Fut>(&self, side: StoreSide, op: F) -> (Result<T, E2>, u32)
    where
        E2: StoreFault,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E2>>,
    {
        let policy = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.config.op_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(E2::timed_out(self.config.op_timeout.as_millis() as u64)),
            };
            match result {
                Ok(value) => return (Ok(value), attempt),
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    warn!(store = %side, attempt, error = %err, "transient store failure, retrying");
                    tokio::time::sleep(policy.backoff_for(attempt)).await;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}
