//! Event log: the record value type, adapter contract, and the
//! in-memory reference adapter

pub mod memory;
pub mod record;
pub mod store;

// Re-export main types
pub use memory::MemoryEventStore;
pub use record::{attack_types, EventRecord, Severity};
pub use store::{DocId, EventStore, EventStoreError, EventStoreResult, IndexedField};
