//! In-memory partition implementations
//!
//! Used for tests, for embedded single-process repositories, and for the
//! session-scoped partitions (working area and its index) of every backend.

mod catalog;
mod data;
mod index;
mod journal;
mod working_area;

pub use catalog::MemoryCatalog;
pub use data::MemoryDataPartition;
pub use index::{MemoryCommittedIndex, MemoryWorkingAreaIndex};
pub use journal::MemoryJournal;
pub use working_area::MemoryWorkingArea;
