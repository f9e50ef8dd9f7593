use crate::adapter::{check_unique_paths, record_stream, JournalPartitionAdapter, RecordStream};
use arbor_core::{JournalEntryNodeRepresentation, Path, Result, RevisionNumber};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Journal held in process memory: revision -> path -> entry
#[derive(Default)]
pub struct MemoryJournal {
    sets: RwLock<BTreeMap<RevisionNumber, BTreeMap<Path, JournalEntryNodeRepresentation>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending entries across all revisions
    pub fn pending_count(&self) -> usize {
        self.sets.read().values().map(|s| s.len()).sum()
    }
}

#[async_trait]
impl JournalPartitionAdapter for MemoryJournal {
    async fn create_set(&self, entries: Vec<JournalEntryNodeRepresentation>) -> Result<()> {
        check_unique_paths(&entries)?;

        let mut sets = self.sets.write();
        for entry in entries {
            sets.entry(entry.revision)
                .or_default()
                .insert(entry.path().clone(), entry);
        }
        Ok(())
    }

    async fn next_pending_revision(&self) -> Result<Option<RevisionNumber>> {
        Ok(self.sets.read().keys().next().copied())
    }

    fn entries_for(&self, revision: RevisionNumber) -> RecordStream<JournalEntryNodeRepresentation> {
        let entries = self
            .sets
            .read()
            .get(&revision)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        record_stream(entries)
    }

    async fn remove_set(&self, revision: RevisionNumber) -> Result<()> {
        self.sets.write().remove(&revision);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.sets.write().clear();
        Ok(())
    }
}
