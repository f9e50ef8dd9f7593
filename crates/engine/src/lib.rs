//! Commit engine and session façade for the arbor node store
//!
//! This crate provides:
//! - The journal-based commit protocol ([`CommitProtocol`])
//! - Node operations merging working and committed state ([`MetadataManager`])
//! - Service contracts for global locking, binary payloads and search, with
//!   single-process implementations
//! - [`Repository`] and [`Session`], the entry points for callers
//! - Engine configuration ([`EngineConfig`])

pub mod binary;
pub mod cluster;
pub mod commit;
pub mod config;
pub mod metadata;
pub mod repository;
pub mod search;

// Re-exports
pub use binary::{BinaryManagerService, MemoryBinaryManager};
pub use cluster::{try_with_global_lock, ClusterSynchronizationService, GlobalLockGuard, LocalClusterSync};
pub use commit::{CommitProtocol, DEFAULT_LOCK_NAME};
pub use config::{EngineConfig, StorageBackend};
pub use metadata::{MetadataManager, NodeUpdate};
pub use repository::{Repository, RepositoryBuilder, Session};
pub use search::{MemorySearchIndex, NullSearchAdapter, SearchAdapter, SearchEntry};
