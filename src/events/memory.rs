//! In-memory event store
//!
//! Reference adapter for the append-only event log. Partitions are kept
//! in a `BTreeMap` keyed by partition name (date-based names sort
//! chronologically), and each partition maintains equality indexes on
//! `source_ip` and `target_ip` so filtered queries touch candidate
//! documents only, never the whole partition.

use super::record::EventRecord;
use super::store::{DocId, EventStore, EventStoreError, EventStoreResult, IndexedField};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredDoc {
    /// Global append sequence, the tie-breaker for equal timestamps
    seq: u64,
    record: EventRecord,
}

#[derive(Debug, Default)]
struct Partition {
    docs: Vec<StoredDoc>,
    by_source: FxHashMap<String, Vec<usize>>,
    by_target: FxHashMap<String, Vec<usize>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    partitions: BTreeMap<String, Partition>,
    next_seq: u64,
}

/// In-memory reference implementation of [`EventStore`].
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<StoreInner>,
}

impl MemoryEventStore {
    /// Create a new empty event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored documents across partitions.
    pub async fn doc_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.partitions.values().map(|p| p.docs.len()).sum()
    }

    /// Number of partitions.
    pub async fn partition_count(&self) -> usize {
        self.inner.read().await.partitions.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, record: &EventRecord, partition: &str) -> EventStoreResult<DocId> {
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let part = inner.partitions.entry(partition.to_string()).or_default();
        let idx = part.docs.len();
        part.by_source
            .entry(record.source_ip.clone())
            .or_default()
            .push(idx);
        part.by_target
            .entry(record.target_ip.clone())
            .or_default()
            .push(idx);
        part.docs.push(StoredDoc {
            seq,
            record: record.clone(),
        });

        let doc_id = DocId(Uuid::new_v4().to_string());
        debug!(%partition, %doc_id, "appended event document");
        Ok(doc_id)
    }

    async fn query(
        &self,
        field: IndexedField,
        value: &str,
        range: (DateTime<Utc>, DateTime<Utc>),
    ) -> EventStoreResult<Vec<EventRecord>> {
        let (lower, upper) = range;
        if lower > upper {
            return Err(EventStoreError::Internal(format!(
                "inverted time range: {lower} > {upper}"
            )));
        }

        let inner = self.inner.read().await;
        let mut hits: Vec<&StoredDoc> = Vec::new();

        for part in inner.partitions.values() {
            let index = match field {
                IndexedField::SourceIp => &part.by_source,
                IndexedField::TargetIp => &part.by_target,
            };
            if let Some(candidates) = index.get(value) {
                for &idx in candidates {
                    let doc = &part.docs[idx];
                    if doc.record.timestamp >= lower && doc.record.timestamp <= upper {
                        hits.push(doc);
                    }
                }
            }
        }

        // Stable append order across partitions
        hits.sort_by_key(|doc| doc.seq);
        Ok(hits.into_iter().map(|doc| doc.record.clone()).collect())
    }
}
