//! In-memory graph store
//!
//! Reference adapter implementing the atomic-merge contract with a single
//! `tokio::sync::RwLock` around the graph: holding the write lock for the
//! whole upsert gives the create-or-merge the same atomicity a server-side
//! MERGE would, so concurrent correlators never observe duplicate edges.
//!
//! Uses hash maps for O(1) lookups:
//! - nodes: key -> node
//! - edges: (from, to, type) -> observation state
//! - incoming/outgoing: key -> Vec of edge keys (adjacency lists)

use super::store::{GraphStore, GraphStoreError, GraphStoreResult};
use super::types::{EdgeKey, EdgeRecord, NodeRecord, RawPath};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Observation state kept per deduplicated edge.
#[derive(Debug, Clone)]
struct EdgeState {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    occurrences: u64,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: FxHashSet<String>,
    edges: FxHashMap<EdgeKey, EdgeState>,
    outgoing: FxHashMap<String, Vec<EdgeKey>>,
    incoming: FxHashMap<String, Vec<EdgeKey>>,
}

impl GraphInner {
    fn upsert_node(&mut self, key: &str) {
        if self.nodes.insert(key.to_string()) {
            self.outgoing.entry(key.to_string()).or_default();
            self.incoming.entry(key.to_string()).or_default();
        }
    }

    fn edge_record(&self, key: &EdgeKey) -> EdgeRecord {
        let state = &self.edges[key];
        EdgeRecord {
            from: key.from.clone(),
            to: key.to.clone(),
            attack_type: key.attack_type.clone(),
            first_seen: state.first_seen,
            last_seen: state.last_seen,
            occurrences: state.occurrences,
        }
    }
}

/// In-memory reference implementation of [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    inner: RwLock<GraphInner>,
}

impl MemoryGraphStore {
    /// Create a new empty graph store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes.
    pub async fn node_count(&self) -> usize {
        self.inner.read().await.nodes.len()
    }

    /// Number of deduplicated edges.
    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.edges.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_node(&self, key: &str) -> GraphStoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.upsert_node(key);
        Ok(())
    }

    async fn upsert_edge(
        &self,
        from: &str,
        to: &str,
        attack_type: &str,
        seen_at: DateTime<Utc>,
    ) -> GraphStoreResult<EdgeRecord> {
        let mut inner = self.inner.write().await;
        inner.upsert_node(from);
        inner.upsert_node(to);

        let key = EdgeKey::new(from, to, attack_type);
        match inner.edges.get_mut(&key) {
            Some(state) => {
                // Merge: monotone bounds so out-of-order observations
                // cannot regress the window
                state.first_seen = state.first_seen.min(seen_at);
                state.last_seen = state.last_seen.max(seen_at);
                state.occurrences += 1;
                debug!(edge = %key, occurrences = state.occurrences, "merged edge");
            }
            None => {
                inner.edges.insert(
                    key.clone(),
                    EdgeState {
                        first_seen: seen_at,
                        last_seen: seen_at,
                        occurrences: 1,
                    },
                );
                inner
                    .outgoing
                    .get_mut(from)
                    .ok_or_else(|| GraphStoreError::Internal(format!("missing node {from}")))?
                    .push(key.clone());
                inner
                    .incoming
                    .get_mut(to)
                    .ok_or_else(|| GraphStoreError::Internal(format!("missing node {to}")))?
                    .push(key.clone());
                debug!(edge = %key, "created edge");
            }
        }

        Ok(inner.edge_record(&key))
    }

    async fn traverse(&self, target: &str, max_hops: usize) -> GraphStoreResult<Vec<RawPath>> {
        let inner = self.inner.read().await;

        let target_key = match inner.nodes.get(target) {
            Some(key) if max_hops > 0 => key.as_str(),
            _ => return Ok(Vec::new()),
        };

        // Walk edges backward from the target. A chain is reported once
        // it is maximal: the hop bound is reached, or its origin has no
        // incoming edge that would not revisit a node on the chain
        // (simple paths only).
        let mut paths = Vec::new();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(target_key);
        // Chain is kept target-first; reversed on emit.
        let mut chain: Vec<&EdgeKey> = Vec::new();

        fn walk<'g>(
            inner: &'g GraphInner,
            node: &'g str,
            max_hops: usize,
            visited: &mut FxHashSet<&'g str>,
            chain: &mut Vec<&'g EdgeKey>,
            paths: &mut Vec<RawPath>,
        ) {
            let candidates: Vec<&'g EdgeKey> = inner
                .incoming
                .get(node)
                .map(|edges| {
                    edges
                        .iter()
                        .filter(|e| !visited.contains(e.from.as_str()))
                        .collect()
                })
                .unwrap_or_default();

            if candidates.is_empty() || chain.len() == max_hops {
                if !chain.is_empty() {
                    paths.push(materialize(inner, chain));
                }
                return;
            }

            for edge in candidates {
                chain.push(edge);
                visited.insert(edge.from.as_str());
                walk(inner, edge.from.as_str(), max_hops, visited, chain, paths);
                visited.remove(edge.from.as_str());
                chain.pop();
            }
        }

        fn materialize(inner: &GraphInner, chain: &[&EdgeKey]) -> RawPath {
            // chain is target-first; emit origin-first
            let edges: Vec<EdgeRecord> =
                chain.iter().rev().map(|key| inner.edge_record(key)).collect();
            let mut nodes: Vec<NodeRecord> =
                edges.iter().map(|e| NodeRecord::new(&e.from)).collect();
            nodes.push(NodeRecord::new(&edges[edges.len() - 1].to));
            RawPath { nodes, edges }
        }

        walk(
            &*inner, target_key, max_hops, &mut visited, &mut chain, &mut paths,
        );
        Ok(paths)
    }

    async fn edges_of(&self, key: &str) -> GraphStoreResult<Vec<EdgeRecord>> {
        let inner = self.inner.read().await;
        let mut seen: FxHashSet<&EdgeKey> = FxHashSet::default();
        let mut result = Vec::new();

        for adjacency in [&inner.outgoing, &inner.incoming] {
            if let Some(edges) = adjacency.get(key) {
                for edge_key in edges {
                    if seen.insert(edge_key) {
                        result.push(inner.edge_record(edge_key));
                    }
                }
            }
        }

        Ok(result)
    }
}
