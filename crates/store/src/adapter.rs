//! Partition-adapter contracts
//!
//! Every backend implements these traits. Single values come back as futures,
//! multi-value reads as [`RecordStream`]s; batch writes take the whole batch
//! so a backend can reject it atomically.

use arbor_core::{
    CommittedInverseNodeReference, Error, InverseNodeReference, JournalEntryNodeRepresentation,
    Path, Result, RevisionNumber, RevisionedNodeRepresentation, SessionId,
    WorkingAreaInverseNodeReference, WorkingAreaNodeRepresentation,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;

/// Lazily produced stream of records from a partition
pub type RecordStream<T> = BoxStream<'static, Result<T>>;

/// Wrap already-materialized records as a [`RecordStream`]
pub fn record_stream<T: Send + 'static>(records: Vec<T>) -> RecordStream<T> {
    stream::iter(records.into_iter().map(Ok)).boxed()
}

/// Session-scoped staging store of uncommitted node edits
///
/// Keyed by (session, path). Tombstoned edits stay retrievable by path.
#[async_trait]
pub trait WorkingAreaPartitionAdapter: Send + Sync {
    /// Stage a new edit; fails if the (session, path) slot is taken
    async fn create(&self, repr: WorkingAreaNodeRepresentation) -> Result<()>;

    /// Staged edit for (session, path), `None` if absent
    async fn get(
        &self,
        session_id: SessionId,
        path: &Path,
    ) -> Result<Option<WorkingAreaNodeRepresentation>>;

    /// Staged edits of direct children of `parent`, ordered by path
    fn children_of(
        &self,
        session_id: SessionId,
        parent: &Path,
    ) -> RecordStream<WorkingAreaNodeRepresentation>;

    /// Staged edits strictly below `parent`, ordered by path
    fn descendants_of(
        &self,
        session_id: SessionId,
        parent: &Path,
    ) -> RecordStream<WorkingAreaNodeRepresentation>;

    /// Every staged edit of the session, ordered by path
    fn all_for(&self, session_id: SessionId) -> RecordStream<WorkingAreaNodeRepresentation>;

    /// Replace an existing staged edit; fails if there is none
    async fn update(&self, repr: WorkingAreaNodeRepresentation) -> Result<()>;

    async fn delete_all_for(&self, session_id: SessionId) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}

/// Durable, append-only, revision-indexed node store
#[async_trait]
pub trait DataPartitionAdapter: Send + Sync {
    /// Persist records; rewriting an identical (path, revision) is harmless
    async fn write(&self, records: Vec<RevisionedNodeRepresentation>) -> Result<()>;

    /// Materialize journal entries and write them like [`Self::write`]
    async fn write_from_journal(&self, entries: Vec<JournalEntryNodeRepresentation>) -> Result<()> {
        let records = entries.iter().map(|e| e.to_revisioned()).collect();
        self.write(records).await
    }

    /// Highest-revision record for `path` at or before `revision`
    ///
    /// Tombstones are returned so callers can tell "deleted" from "never existed".
    async fn latest_at_or_before(
        &self,
        revision: RevisionNumber,
        path: &Path,
    ) -> Result<Option<RevisionedNodeRepresentation>>;

    /// Latest non-deleted record of every direct child of `parent`, ordered by path
    fn latest_children_at_or_before(
        &self,
        revision: RevisionNumber,
        parent: &Path,
    ) -> RecordStream<RevisionedNodeRepresentation>;

    async fn reset(&self) -> Result<()>;
}

/// Staging area between working area and committed store
#[async_trait]
pub trait JournalPartitionAdapter: Send + Sync {
    /// Insert a batch; fails as a whole if two entries share a path
    async fn create_set(&self, entries: Vec<JournalEntryNodeRepresentation>) -> Result<()>;

    /// Lowest revision with pending entries
    async fn next_pending_revision(&self) -> Result<Option<RevisionNumber>>;

    fn entries_for(&self, revision: RevisionNumber) -> RecordStream<JournalEntryNodeRepresentation>;

    async fn remove_set(&self, revision: RevisionNumber) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}

/// Single cell holding the repository's current committed revision
#[async_trait]
pub trait CatalogPartitionAdapter: Send + Sync {
    /// `None` only before bootstrap
    async fn current_revision(&self) -> Result<Option<RevisionNumber>>;

    async fn set_revision(&self, revision: RevisionNumber) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}

/// Inverse-reference index over working-area edits
///
/// Rows are keyed (session, target, source); a later row replaces an earlier
/// one, and `Deleted` rows are returned so they can mask committed edges.
#[async_trait]
pub trait WorkingAreaNodeIndexPartitionAdapter: Send + Sync {
    async fn create(&self, rows: Vec<WorkingAreaInverseNodeReference>) -> Result<()>;

    /// Rows whose target is `path`, ordered by referring path
    fn references_to(
        &self,
        session_id: SessionId,
        path: &Path,
    ) -> RecordStream<InverseNodeReference>;

    /// Rows whose target is `path` or a descendant of it
    fn references_at_or_below(
        &self,
        session_id: SessionId,
        path: &Path,
    ) -> RecordStream<InverseNodeReference>;

    async fn delete_all_for(&self, session_id: SessionId) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}

/// Inverse-reference index over committed revisions
///
/// Reads select, per (target, source) pair, the row with the highest revision
/// at or before the requested one and drop pairs whose selected row is `Deleted`.
#[async_trait]
pub trait CommittedNodeIndexPartitionAdapter: Send + Sync {
    async fn create(&self, rows: Vec<CommittedInverseNodeReference>) -> Result<()>;

    fn references_to(
        &self,
        path: &Path,
        revision: RevisionNumber,
    ) -> RecordStream<InverseNodeReference>;

    fn references_at_or_below(
        &self,
        path: &Path,
        revision: RevisionNumber,
    ) -> RecordStream<InverseNodeReference>;

    async fn reset(&self) -> Result<()>;
}

/// Reject a journal batch naming any path twice
pub fn check_unique_paths(entries: &[JournalEntryNodeRepresentation]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.path()) {
            return Err(Error::DuplicateJournalPath {
                revision: entry.revision,
                path: entry.path().clone(),
            });
        }
    }
    Ok(())
}
