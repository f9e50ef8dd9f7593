use super::{decode, encode, materialize, path_from_bytes, split_revision_suffix, TreeHandle};
use crate::adapter::{DataPartitionAdapter, RecordStream};
use crate::select::latest_at_or_before;
use anyhow::Context;
use arbor_core::{NodeRepresentation, Path, Result, RevisionNumber, RevisionedNodeRepresentation};
use async_trait::async_trait;
use tracing::debug;

/// Committed store in the `nodes` tree
#[derive(Clone)]
pub struct SledDataPartition {
    handle: TreeHandle,
}

fn node_key(path: &Path, revision: RevisionNumber) -> Vec<u8> {
    let mut key = Vec::with_capacity(path.as_str().len() + 17);
    key.extend_from_slice(path.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(&revision.to_be_bytes());
    key
}

impl SledDataPartition {
    pub(super) fn new(tree: sled::Tree, flush_on_write: bool) -> Self {
        Self {
            handle: TreeHandle {
                tree,
                flush_on_write,
            },
        }
    }

    /// Number of stored records across all revisions
    pub fn record_count(&self) -> usize {
        self.handle.tree.len()
    }

    fn children(&self, revision: RevisionNumber, parent: &Path) -> Result<Vec<RevisionedNodeRepresentation>> {
        let prefix = parent.descendant_prefix();
        let mut candidates = Vec::new();
        for item in self.handle.tree.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item.context("Failed to scan nodes tree")?;
            let (raw_path, rev) = split_revision_suffix(&key)?;
            let path = path_from_bytes(raw_path)?;
            if path.is_child_of(parent) {
                candidates.push((path, rev, value));
            }
        }

        let mut children = Vec::new();
        for (rev, value) in latest_at_or_before(candidates, revision).into_values() {
            let node: NodeRepresentation = decode(&value)?;
            if !node.is_deleted() {
                children.push(RevisionedNodeRepresentation::new(rev, node));
            }
        }
        Ok(children)
    }
}

#[async_trait]
impl DataPartitionAdapter for SledDataPartition {
    async fn write(&self, records: Vec<RevisionedNodeRepresentation>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for record in &records {
            batch.insert(node_key(record.path(), record.revision), encode(&record.node)?);
        }
        self.handle
            .tree
            .apply_batch(batch)
            .context("Failed to write node records")?;
        self.handle.flush().await?;
        debug!(records = records.len(), "wrote committed node records");
        Ok(())
    }

    async fn latest_at_or_before(
        &self,
        revision: RevisionNumber,
        path: &Path,
    ) -> Result<Option<RevisionedNodeRepresentation>> {
        let start = node_key(path, RevisionNumber::INITIAL);
        let end = node_key(path, revision);
        match self.handle.tree.range(start..=end).next_back() {
            Some(item) => {
                let (key, value) = item.context("Failed to read nodes tree")?;
                let (_, rev) = split_revision_suffix(&key)?;
                Ok(Some(RevisionedNodeRepresentation::new(rev, decode(&value)?)))
            }
            None => Ok(None),
        }
    }

    fn latest_children_at_or_before(
        &self,
        revision: RevisionNumber,
        parent: &Path,
    ) -> RecordStream<RevisionedNodeRepresentation> {
        materialize(self.children(revision, parent))
    }

    async fn reset(&self) -> Result<()> {
        self.handle.clear()
    }
}
