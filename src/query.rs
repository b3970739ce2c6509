//! Event correlation query — time-windowed event retrieval with graph
//! annotation
//!
//! Retrieves an actor's raw events from the event log and tags each one
//! with whether it is structurally part of a tracked attack edge. The
//! annotation uses a single batched graph lookup per query, never one
//! round trip per record. Readers must tolerate the brief window where
//! an event is stored but its edge has not yet merged (eventual
//! consistency between the two stores).

use crate::error::{CorrelationError, CorrelationResult};
use crate::events::record::{EventRecord, Severity};
use crate::events::store::{EventStore, IndexedField};
use crate::graph::store::GraphStore;
use chrono::{DateTime, Duration, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Inclusive time window of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeRange {
    /// The trailing window ending now (e.g. "the last 24 hours")
    Last(Duration),

    /// An explicit absolute window, both bounds inclusive
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl TimeRange {
    /// The last `days` days.
    pub fn last_days(days: i64) -> Self {
        TimeRange::Last(Duration::days(days))
    }

    /// The last `hours` hours.
    pub fn last_hours(hours: i64) -> Self {
        TimeRange::Last(Duration::hours(hours))
    }

    /// Resolve to absolute inclusive bounds.
    fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            TimeRange::Last(window) => (now - window, now),
            TimeRange::Between(lower, upper) => (lower, upper),
        }
    }
}

/// Which side of the stored events the actor key is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorRole {
    /// Events the actor emitted (`source_ip == actor`)
    #[default]
    Source,

    /// Events the actor received (`target_ip == actor`)
    Target,
}

impl ActorRole {
    fn field(self) -> IndexedField {
        match self {
            ActorRole::Source => IndexedField::SourceIp,
            ActorRole::Target => IndexedField::TargetIp,
        }
    }
}

/// Optional narrowing applied after retrieval.
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub role: ActorRole,

    /// Keep only events of this exact type
    pub event_type: Option<String>,

    /// Keep only events at or above this severity
    pub min_severity: Option<Severity>,
}

/// One retrieved event, annotated against the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedEvent {
    pub record: EventRecord,

    /// True iff an edge matching (source_ip, target_ip, event_type)
    /// exists in the graph at query time
    pub correlated: bool,

    /// The matching edge's occurrence counter, when correlated
    pub occurrences: Option<u64>,
}

/// Read-side component for time-windowed, graph-annotated event queries.
pub struct EventQuery<G: GraphStore, E: EventStore> {
    graph: Arc<G>,
    events: Arc<E>,
}

impl<G: GraphStore, E: EventStore> EventQuery<G, E> {
    pub fn new(graph: Arc<G>, events: Arc<E>) -> Self {
        EventQuery { graph, events }
    }

    /// All events tied to `actor` within `range`, sorted strictly by
    /// timestamp ascending (store order preserved for ties), each
    /// annotated with its graph correlation. No matches is `Ok(vec![])`.
    pub async fn query_events(
        &self,
        actor: &str,
        range: TimeRange,
        filters: &QueryFilters,
    ) -> CorrelationResult<Vec<CorrelatedEvent>> {
        let (lower, upper) = range.bounds(Utc::now());

        let mut records = self
            .events
            .query(filters.role.field(), actor, (lower, upper))
            .await
            .map_err(|source| CorrelationError::EventStoreUnavailable {
                attempts: 1,
                source,
            })?;

        if let Some(event_type) = &filters.event_type {
            records.retain(|record| &record.event_type == event_type);
        }
        if let Some(min) = filters.min_severity {
            records.retain(|record| record.severity >= min);
        }

        // Stable sort keeps the store's append order for equal timestamps
        records.sort_by_key(|record| record.timestamp);

        // One batched graph lookup for the whole result set
        let edges = self
            .graph
            .edges_of(actor)
            .await
            .map_err(|source| CorrelationError::GraphStoreUnavailable {
                attempts: 1,
                source,
            })?;
        let by_triple: FxHashMap<(&str, &str, &str), u64> = edges
            .iter()
            .map(|edge| {
                (
                    (
                        edge.from.as_str(),
                        edge.to.as_str(),
                        edge.attack_type.as_str(),
                    ),
                    edge.occurrences,
                )
            })
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let occurrences = by_triple
                    .get(&(
                        record.source_ip.as_str(),
                        record.target_ip.as_str(),
                        record.event_type.as_str(),
                    ))
                    .copied();
                CorrelatedEvent {
                    correlated: occurrences.is_some(),
                    occurrences,
                    record,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_range_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();

        let (lower, upper) = TimeRange::last_days(1).bounds(now);
        assert_eq!(upper, now);
        assert_eq!(lower, now - Duration::days(1));

        let explicit_lower = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let (lower, upper) = TimeRange::Between(explicit_lower, now).bounds(now);
        assert_eq!((lower, upper), (explicit_lower, now));
    }

    #[test]
    fn test_actor_role_selects_indexed_field() {
        assert_eq!(ActorRole::Source.field(), IndexedField::SourceIp);
        assert_eq!(ActorRole::Target.field(), IndexedField::TargetIp);
        assert_eq!(ActorRole::default(), ActorRole::Source);
    }
}
