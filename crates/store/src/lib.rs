//! Storage partitions for the arbor node store
//!
//! This crate provides:
//! - The partition-adapter contracts (working area, committed store, journal,
//!   catalog, working-area and committed reference indexes)
//! - The "latest record at or before revision R" selection algorithm
//! - In-memory implementations of every partition
//! - Durable sled-backed implementations of the committed-tier partitions

pub mod adapter;
pub mod disk;
pub mod memory;
pub mod partitions;
pub mod select;

// Re-exports
pub use adapter::{
    CatalogPartitionAdapter, CommittedNodeIndexPartitionAdapter, DataPartitionAdapter,
    JournalPartitionAdapter, RecordStream, WorkingAreaNodeIndexPartitionAdapter,
    WorkingAreaPartitionAdapter,
};
pub use disk::SledStore;
pub use partitions::Partitions;
