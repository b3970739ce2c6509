//! Relationship graph: types, adapter contract, and the in-memory
//! reference adapter
//!
//! The graph models attacker→victim relationships as directed edges
//! deduplicated on (from, to, attack type), with nodes merged on their
//! canonical key.

pub mod memory;
pub mod store;
pub mod types;

// Re-export main types
pub use memory::MemoryGraphStore;
pub use store::{GraphStore, GraphStoreError, GraphStoreResult};
pub use types::{EdgeKey, EdgeRecord, NodeRecord, RawPath};
