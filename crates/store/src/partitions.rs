//! The full set of partitions a repository runs on

use crate::adapter::{
    CatalogPartitionAdapter, CommittedNodeIndexPartitionAdapter, DataPartitionAdapter,
    JournalPartitionAdapter, WorkingAreaNodeIndexPartitionAdapter, WorkingAreaPartitionAdapter,
};
use crate::disk::SledStore;
use crate::memory::{
    MemoryCatalog, MemoryCommittedIndex, MemoryDataPartition, MemoryJournal, MemoryWorkingArea,
    MemoryWorkingAreaIndex,
};
use arbor_core::Result;
use std::path::Path as FsPath;
use std::sync::Arc;
use tracing::info;

/// Handles on all six partitions
///
/// Working-area partitions only ever hold state of live sessions, so every
/// backend keeps them in memory. The committed tier is what varies.
#[derive(Clone)]
pub struct Partitions {
    pub working_area: Arc<dyn WorkingAreaPartitionAdapter>,
    pub working_index: Arc<dyn WorkingAreaNodeIndexPartitionAdapter>,
    pub data: Arc<dyn DataPartitionAdapter>,
    pub journal: Arc<dyn JournalPartitionAdapter>,
    pub catalog: Arc<dyn CatalogPartitionAdapter>,
    pub committed_index: Arc<dyn CommittedNodeIndexPartitionAdapter>,
}

impl Partitions {
    /// Everything in process memory
    pub fn in_memory() -> Self {
        Self {
            working_area: Arc::new(MemoryWorkingArea::new()),
            working_index: Arc::new(MemoryWorkingAreaIndex::new()),
            data: Arc::new(MemoryDataPartition::new()),
            journal: Arc::new(MemoryJournal::new()),
            catalog: Arc::new(MemoryCatalog::new()),
            committed_index: Arc::new(MemoryCommittedIndex::new()),
        }
    }

    /// Committed tier in a sled database under `dir`
    pub fn sled(dir: &FsPath, flush_on_write: bool) -> Result<Self> {
        let store = SledStore::open(dir)?.with_flush_on_write(flush_on_write);
        info!(path = %dir.display(), "opened sled partitions");
        Self::from_sled(&store)
    }

    /// Committed tier in an existing sled handle
    pub fn from_sled(store: &SledStore) -> Result<Self> {
        Ok(Self {
            working_area: Arc::new(MemoryWorkingArea::new()),
            working_index: Arc::new(MemoryWorkingAreaIndex::new()),
            data: Arc::new(store.data_partition()?),
            journal: Arc::new(store.journal()?),
            catalog: Arc::new(store.catalog()?),
            committed_index: Arc::new(store.committed_index()?),
        })
    }

    /// Clear every partition
    pub async fn reset(&self) -> Result<()> {
        self.working_area.reset().await?;
        self.working_index.reset().await?;
        self.data.reset().await?;
        self.journal.reset().await?;
        self.committed_index.reset().await?;
        self.catalog.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::RevisionNumber;

    #[tokio::test]
    async fn test_reset_clears_catalog() {
        let partitions = Partitions::in_memory();
        partitions.catalog.set_revision(RevisionNumber::new(1)).await.unwrap();
        partitions.reset().await.unwrap();
        assert_eq!(partitions.catalog.current_revision().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sled_partitions_share_one_database() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let partitions = Partitions::sled(dir.path(), true).unwrap();
            partitions.catalog.set_revision(RevisionNumber::new(9)).await.unwrap();
        }
        let partitions = Partitions::sled(dir.path(), true).unwrap();
        assert_eq!(
            partitions.catalog.current_revision().await.unwrap(),
            Some(RevisionNumber::new(9))
        );
    }
}
