//! Path assembler — multi-hop provenance queries against the graph
//!
//! Answers "who eventually attacked this node, through how many
//! intermediate hops". Pure read: issues one bounded backward traversal
//! to the graph store and normalizes its raw node/edge sequences into
//! ordered [`AttackPath`] values.

use crate::error::{CorrelationError, CorrelationResult};
use crate::graph::store::GraphStore;
use crate::graph::types::{EdgeRecord, NodeRecord, RawPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default traversal depth bound.
pub const DEFAULT_MAX_HOPS: usize = 6;

/// One step of an attack path: the acting node and the edge it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathHop {
    /// The attacking node at this step
    pub node: NodeRecord,

    /// The edge from that node toward the target
    pub edge: EdgeRecord,
}

/// A normalized attack path: 1..max_hops steps ending at the queried
/// target. A computed view owned by no store; always a simple path
/// (no repeated nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackPath {
    /// The queried victim node
    pub target: NodeRecord,

    /// Steps from the origin attacker to the target, in order
    pub hops: Vec<PathHop>,
}

impl AttackPath {
    /// Build from a raw traversal result. Returns `None` when the raw
    /// path is empty or its node/edge sequences do not line up.
    fn from_raw(raw: RawPath) -> Option<Self> {
        if raw.edges.is_empty() || raw.nodes.len() != raw.edges.len() + 1 {
            return None;
        }
        let target = raw.nodes.last()?.clone();
        let hops = raw
            .nodes
            .into_iter()
            .zip(raw.edges)
            .map(|(node, edge)| PathHop { node, edge })
            .collect();
        Some(AttackPath { target, hops })
    }

    /// Number of hops (edges) in the path.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// The node the path starts from.
    pub fn origin(&self) -> &NodeRecord {
        &self.hops[0].node
    }

    /// The final edge, the one arriving at the target.
    pub fn terminal_edge(&self) -> &EdgeRecord {
        &self.hops[self.hops.len() - 1].edge
    }

    /// Whether no node appears twice.
    fn is_simple(&self) -> bool {
        let mut seen = rustc_hash::FxHashSet::default();
        self.hops.iter().all(|hop| seen.insert(hop.node.key.as_str()))
            && seen.insert(self.target.key.as_str())
    }
}

/// Read-side component assembling attack paths to a victim node.
pub struct PathAssembler<G: GraphStore> {
    graph: Arc<G>,
    traversal_timeout: Duration,
}

impl<G: GraphStore> PathAssembler<G> {
    /// Create an assembler with a 10 s traversal deadline.
    pub fn new(graph: Arc<G>) -> Self {
        Self::with_timeout(graph, Duration::from_secs(10))
    }

    pub fn with_timeout(graph: Arc<G>, traversal_timeout: Duration) -> Self {
        PathAssembler {
            graph,
            traversal_timeout,
        }
    }

    /// `find_paths` with the default hop bound.
    pub async fn find_paths_default(&self, target: &str) -> CorrelationResult<Vec<AttackPath>> {
        self.find_paths(target, DEFAULT_MAX_HOPS).await
    }

    /// All attack paths ending at `target`, at most `max_hops` long,
    /// sorted shortest first and, among equal lengths, freshest terminal
    /// edge first.
    ///
    /// A target with no incoming edges yields `Ok(vec![])`. A traversal
    /// that outlives its deadline yields `TraversalTimeout` rather than
    /// a partial answer.
    pub async fn find_paths(
        &self,
        target: &str,
        max_hops: usize,
    ) -> CorrelationResult<Vec<AttackPath>> {
        let started = Instant::now();
        let raw = match tokio::time::timeout(
            self.traversal_timeout,
            self.graph.traverse(target, max_hops),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(source)) => {
                return Err(CorrelationError::GraphStoreUnavailable { attempts: 1, source })
            }
            Err(_) => {
                return Err(CorrelationError::TraversalTimeout {
                    target: target.to_string(),
                    max_hops,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
            }
        };

        let mut paths: Vec<AttackPath> = raw
            .into_iter()
            .filter_map(AttackPath::from_raw)
            .filter(|path| {
                // The adapter is an external collaborator; hold it to
                // the contract rather than passing violations through
                let ok = path.hop_count() <= max_hops
                    && path.is_simple()
                    && path.target.key == target;
                if !ok {
                    warn!(victim = target, hops = path.hop_count(), "dropping path violating traversal contract");
                }
                ok
            })
            .collect();

        paths.sort_by(|a, b| {
            a.hop_count()
                .cmp(&b.hop_count())
                .then_with(|| b.terminal_edge().last_seen.cmp(&a.terminal_edge().last_seen))
        });

        Ok(paths)
    }
}
