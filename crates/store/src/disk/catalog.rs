use super::{TreeHandle, REVISION_LEN};
use crate::adapter::CatalogPartitionAdapter;
use anyhow::Context;
use arbor_core::{Result, RevisionNumber};
use async_trait::async_trait;

const REVISION_KEY: &[u8] = b"revision";

/// Catalog cell in the `catalog` tree
#[derive(Clone)]
pub struct SledCatalog {
    handle: TreeHandle,
}

impl SledCatalog {
    pub(super) fn new(tree: sled::Tree, flush_on_write: bool) -> Self {
        Self {
            handle: TreeHandle {
                tree,
                flush_on_write,
            },
        }
    }
}

#[async_trait]
impl CatalogPartitionAdapter for SledCatalog {
    async fn current_revision(&self) -> Result<Option<RevisionNumber>> {
        let value = self
            .handle
            .tree
            .get(REVISION_KEY)
            .context("Failed to read catalog")?;
        match value {
            Some(bytes) => {
                let bytes: [u8; REVISION_LEN] = bytes[..]
                    .try_into()
                    .context("Malformed catalog revision")?;
                Ok(Some(RevisionNumber::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    async fn set_revision(&self, revision: RevisionNumber) -> Result<()> {
        self.handle
            .tree
            .insert(REVISION_KEY, revision.to_be_bytes().to_vec())
            .context("Failed to write catalog")?;
        self.handle.flush().await
    }

    async fn reset(&self) -> Result<()> {
        self.handle.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::SledStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_revision_persists() {
        let dir = TempDir::new().unwrap();
        {
            let catalog = SledStore::open(dir.path()).unwrap().catalog().unwrap();
            assert_eq!(catalog.current_revision().await.unwrap(), None);
            catalog.set_revision(RevisionNumber::new(42)).await.unwrap();
        }
        let catalog = SledStore::open(dir.path()).unwrap().catalog().unwrap();
        assert_eq!(catalog.current_revision().await.unwrap(), Some(RevisionNumber::new(42)));
    }
}
