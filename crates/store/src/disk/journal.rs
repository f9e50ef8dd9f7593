//! Pending commit sets in the `journal` tree

use super::{decode, encode, materialize, TreeHandle, REVISION_LEN};
use crate::adapter::{check_unique_paths, JournalPartitionAdapter, RecordStream};
use anyhow::Context;
use arbor_core::{JournalEntryNodeRepresentation, Result, RevisionNumber};
use async_trait::async_trait;
use tracing::debug;

/// Journal keyed `<revision:16 BE> <path>`, so sets come back lowest revision first
#[derive(Clone)]
pub struct SledJournal {
    handle: TreeHandle,
}

fn entry_key(entry: &JournalEntryNodeRepresentation) -> Vec<u8> {
    let path = entry.path().as_str().as_bytes();
    let mut key = Vec::with_capacity(REVISION_LEN + path.len());
    key.extend_from_slice(&entry.revision.to_be_bytes());
    key.extend_from_slice(path);
    key
}

impl SledJournal {
    pub(super) fn new(tree: sled::Tree, flush_on_write: bool) -> Self {
        Self {
            handle: TreeHandle {
                tree,
                flush_on_write,
            },
        }
    }

    /// Number of pending entries across all revisions
    pub fn pending_count(&self) -> usize {
        self.handle.tree.len()
    }

    fn entries(&self, revision: RevisionNumber) -> Result<Vec<JournalEntryNodeRepresentation>> {
        let mut entries = Vec::new();
        for item in self.handle.tree.scan_prefix(revision.to_be_bytes()) {
            let (_, value) = item.context("Failed to scan journal tree")?;
            entries.push(decode(&value)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl JournalPartitionAdapter for SledJournal {
    async fn create_set(&self, entries: Vec<JournalEntryNodeRepresentation>) -> Result<()> {
        check_unique_paths(&entries)?;

        let mut batch = sled::Batch::default();
        for entry in &entries {
            batch.insert(entry_key(entry), encode(entry)?);
        }
        self.handle
            .tree
            .apply_batch(batch)
            .context("Failed to write journal set")?;
        self.handle.flush().await?;
        debug!(entries = entries.len(), "journal set written");
        Ok(())
    }

    async fn next_pending_revision(&self) -> Result<Option<RevisionNumber>> {
        let first = self.handle.tree.first().context("Failed to read journal tree")?;
        match first {
            Some((key, _)) => {
                let bytes: [u8; REVISION_LEN] = key
                    .get(..REVISION_LEN)
                    .and_then(|b| b.try_into().ok())
                    .context("Malformed journal key")?;
                Ok(Some(RevisionNumber::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn entries_for(&self, revision: RevisionNumber) -> RecordStream<JournalEntryNodeRepresentation> {
        materialize(self.entries(revision))
    }

    async fn remove_set(&self, revision: RevisionNumber) -> Result<()> {
        let mut batch = sled::Batch::default();
        for key in self.handle.tree.scan_prefix(revision.to_be_bytes()).keys() {
            batch.remove(key.context("Failed to scan journal tree")?);
        }
        self.handle
            .tree
            .apply_batch(batch)
            .context("Failed to remove journal set")?;
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
    use arbor_core::{Error, NodeRepresentation, NodeType, Path, Properties, SessionId};
    use futures::TryStreamExt;
    use tempfile::TempDir;

    fn entry(rev: u128, path: &str) -> JournalEntryNodeRepresentation {
        JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(rev),
            prior: None,
            content: NodeRepresentation::new(Path::new(path).unwrap(), NodeType::root(), Properties::new()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_path_leaves_journal_untouched() {
        let store = SledStore::temporary().unwrap();
        let journal = store.journal().unwrap();
        let err = journal
            .create_set(vec![entry(1, "/a"), entry(1, "/a")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateJournalPath { .. }));
        assert_eq!(journal.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_sets_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            let journal = store.journal().unwrap();
            journal.create_set(vec![entry(0x101, "/x")]).await.unwrap();
            journal.create_set(vec![entry(0x0ff, "/a"), entry(0x0ff, "/b")]).await.unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        let journal = store.journal().unwrap();
        assert_eq!(
            journal.next_pending_revision().await.unwrap(),
            Some(RevisionNumber::new(0x0ff))
        );
        let entries: Vec<_> = journal
            .entries_for(RevisionNumber::new(0x0ff))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        journal.remove_set(RevisionNumber::new(0x0ff)).await.unwrap();
        assert_eq!(
            journal.next_pending_revision().await.unwrap(),
            Some(RevisionNumber::new(0x101))
        );
        journal.remove_set(RevisionNumber::new(0x101)).await.unwrap();
        assert_eq!(journal.next_pending_revision().await.unwrap(), None);
    }
}
