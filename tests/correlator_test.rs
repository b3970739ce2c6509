use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sectrace::{
    attack_types, Ack, CommittedWrite, CorrelationError, Correlator, CorrelatorConfig, DocId,
    EdgeRecord, EventRecord, EventStore, EventStoreError, EventStoreResult, GraphStore,
    GraphStoreError, GraphStoreResult, IndexedField, MemoryEventStore, MemoryGraphStore, RawPath,
    RetryPolicy, Severity, StoreSide,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Graph store that fails the first `failures` upserts, then delegates.
struct FlakyGraphStore {
    inner: MemoryGraphStore,
    failures: AtomicU32,
    calls: AtomicU32,
}

impl FlakyGraphStore {
    fn new(failures: u32) -> Self {
        FlakyGraphStore {
            inner: MemoryGraphStore::new(),
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for FlakyGraphStore {
    async fn upsert_node(&self, key: &str) -> GraphStoreResult<()> {
        self.inner.upsert_node(key).await
    }

    async fn upsert_edge(
        &self,
        from: &str,
        to: &str,
        attack_type: &str,
        seen_at: DateTime<Utc>,
    ) -> GraphStoreResult<EdgeRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GraphStoreError::Unavailable("connection refused".to_string()));
        }
        self.inner.upsert_edge(from, to, attack_type, seen_at).await
    }

    async fn traverse(&self, target: &str, max_hops: usize) -> GraphStoreResult<Vec<RawPath>> {
        self.inner.traverse(target, max_hops).await
    }

    async fn edges_of(&self, key: &str) -> GraphStoreResult<Vec<EdgeRecord>> {
        self.inner.edges_of(key).await
    }
}

/// Event store whose appends always fail.
struct DownEventStore {
    calls: AtomicU32,
}

impl DownEventStore {
    fn new() -> Self {
        DownEventStore {
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl EventStore for DownEventStore {
    async fn append(&self, _record: &EventRecord, _partition: &str) -> EventStoreResult<DocId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EventStoreError::Unavailable("cluster red".to_string()))
    }

    async fn query(
        &self,
        _field: IndexedField,
        _value: &str,
        _range: (DateTime<Utc>, DateTime<Utc>),
    ) -> EventStoreResult<Vec<EventRecord>> {
        Err(EventStoreError::Unavailable("cluster red".to_string()))
    }
}

fn fast_config() -> CorrelatorConfig {
    CorrelatorConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            exponential: false,
        },
        op_timeout: Duration::from_secs(1),
    }
}

fn sample_event() -> EventRecord {
    EventRecord::new(
        attack_types::SQL_INJECTION,
        "1.1.1.1",
        "2.2.2.2",
        Severity::High,
        "Attempted SQL injection attack detected",
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_single_event_creates_one_edge_and_one_record() {
    init_tracing();
    let graph = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Correlator::new(Arc::clone(&graph), Arc::clone(&events));

    let ack: Ack = correlator.record(&sample_event()).await.unwrap();
    assert_eq!(ack.edge.from, "1.1.1.1");
    assert_eq!(ack.edge.to, "2.2.2.2");
    assert_eq!(ack.edge.attack_type, "SQL_INJECTION");
    assert_eq!(ack.edge.occurrences, 1);

    assert_eq!(graph.edge_count().await, 1);
    assert_eq!(graph.node_count().await, 2);
    assert_eq!(events.doc_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_event_merges_edge_keeps_both_records() {
    let graph = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Correlator::new(Arc::clone(&graph), Arc::clone(&events));

    let event = sample_event();
    correlator.record(&event).await.unwrap();
    let ack = correlator.record(&event).await.unwrap();

    // One edge with count 2, never two edges; the log keeps both
    assert_eq!(ack.edge.occurrences, 2);
    assert_eq!(graph.edge_count().await, 1);
    assert_eq!(events.doc_count().await, 2);
}

#[tokio::test]
async fn test_malformed_event_writes_nothing() {
    let graph = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Correlator::new(Arc::clone(&graph), Arc::clone(&events));

    let mut event = sample_event();
    event.source_ip = String::new();
    let err = correlator.record(&event).await.unwrap_err();
    assert!(matches!(err, CorrelationError::MalformedEvent(_)));
    assert!(!err.is_retryable());

    let mut event = sample_event();
    event.target_ip = "   ".to_string();
    let err = correlator.record(&event).await.unwrap_err();
    assert!(matches!(err, CorrelationError::MalformedEvent(_)));

    assert_eq!(graph.edge_count().await, 0);
    assert_eq!(events.doc_count().await, 0);
}

#[tokio::test]
async fn test_transient_graph_failure_is_retried_to_success() {
    init_tracing();
    // Fails twice, succeeds on the third attempt, within the policy
    let graph = Arc::new(FlakyGraphStore::new(2));
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Correlator::with_config(Arc::clone(&graph), Arc::clone(&events), fast_config());

    let ack = correlator.record(&sample_event()).await.unwrap();
    assert_eq!(ack.edge.occurrences, 1);
    assert_eq!(graph.calls(), 3);
    assert_eq!(events.doc_count().await, 1);
}

#[tokio::test]
async fn test_graph_down_event_up_is_partial_success() {
    // Scenario: graph store fails every upsert, event store is healthy
    let graph = Arc::new(FlakyGraphStore::new(u32::MAX));
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Correlator::with_config(Arc::clone(&graph), Arc::clone(&events), fast_config());

    let err = correlator.record(&sample_event()).await.unwrap_err();
    match err {
        CorrelationError::PartialSuccess {
            failed,
            attempts,
            committed,
            ..
        } => {
            assert_eq!(failed, StoreSide::Graph);
            assert_eq!(attempts, 3);
            assert!(matches!(committed, CommittedWrite::EventDoc(_)));
        }
        other => panic!("expected PartialSuccess, got {other:?}"),
    }
    // Retry exhaustion: exactly max_attempts tries against the graph
    assert_eq!(graph.calls(), 3);

    // The event is nonetheless stored and queryable
    assert_eq!(events.doc_count().await, 1);
    let now = Utc::now();
    let hits = events
        .query(
            IndexedField::SourceIp,
            "1.1.1.1",
            (now - chrono::Duration::hours(1), now + chrono::Duration::hours(1)),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_event_down_graph_up_is_partial_success_with_edge() {
    let graph = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(DownEventStore::new());
    let correlator = Correlator::with_config(Arc::clone(&graph), Arc::clone(&events), fast_config());

    let err = correlator.record(&sample_event()).await.unwrap_err();
    match err {
        CorrelationError::PartialSuccess {
            failed, committed, ..
        } => {
            assert_eq!(failed, StoreSide::Event);
            match committed {
                CommittedWrite::GraphEdge(edge) => assert_eq!(edge.occurrences, 1),
                other => panic!("expected committed graph edge, got {other:?}"),
            }
        }
        other => panic!("expected PartialSuccess, got {other:?}"),
    }
    assert_eq!(graph.edge_count().await, 1);
}

#[tokio::test]
async fn test_both_stores_down_reports_both_failures() {
    let graph = Arc::new(FlakyGraphStore::new(u32::MAX));
    let events = Arc::new(DownEventStore::new());
    let correlator = Correlator::with_config(Arc::clone(&graph), Arc::clone(&events), fast_config());

    let err = correlator.record(&sample_event()).await.unwrap_err();
    match err {
        CorrelationError::StoresUnavailable { graph, event } => {
            assert!(graph.is_transient());
            assert!(event.is_transient());
        }
        other => panic!("expected StoresUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_submissions_of_same_triple_merge_into_one_edge() {
    let graph = Arc::new(MemoryGraphStore::new());
    let events = Arc::new(MemoryEventStore::new());
    let correlator = Arc::new(Correlator::new(Arc::clone(&graph), Arc::clone(&events)));

    let workers: usize = 8;
    let mut handles = Vec::new();
    for _ in 0..workers {
        let correlator = Arc::clone(&correlator);
        handles.push(tokio::spawn(async move {
            correlator.record(&sample_event()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(graph.edge_count().await, 1);
    assert_eq!(events.doc_count().await, workers);

    let edges = graph.edges_of("1.1.1.1").await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].occurrences, workers as u64);
}
