use crate::adapter::CatalogPartitionAdapter;
use arbor_core::{Result, RevisionNumber};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Catalog cell held in process memory
#[derive(Default)]
pub struct MemoryCatalog {
    revision: RwLock<Option<RevisionNumber>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogPartitionAdapter for MemoryCatalog {
    async fn current_revision(&self) -> Result<Option<RevisionNumber>> {
        Ok(*self.revision.read())
    }

    async fn set_revision(&self, revision: RevisionNumber) -> Result<()> {
        *self.revision.write() = Some(revision);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.revision.write() = None;
        Ok(())
    }
}
