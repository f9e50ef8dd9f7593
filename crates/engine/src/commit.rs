//! Journal-based commit protocol
//!
//! A session commit runs in two steps, both under the repository's global
//! lock:
//!
//! 1. The session's working area becomes one journal set at `current + 1`.
//! 2. The lowest pending journal set is applied: committed store, committed
//!    reference index, search feed, catalog, journal removal, session
//!    registry, in that order.
//!
//! The catalog moves before the journal set is removed. A crash between the
//! two leaves a set at or below the current revision; the next drain replays
//! it (every write is idempotent per key and revision) and removes it.

use crate::cluster::{try_with_global_lock, ClusterSynchronizationService};
use crate::search::{SearchAdapter, SearchEntry};
use arbor_core::{
    CommittedInverseNodeReference, Error, JournalEntryNodeRepresentation, NodeRepresentation,
    NodeType, Result, RevisionNumber, RevisionedNodeRepresentation, SessionId,
    WorkingAreaNodeRepresentation,
};
use arbor_store::adapter::record_stream;
use arbor_store::Partitions;
use futures::TryStreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Lock guarding bootstrap and commits unless configured otherwise
pub const DEFAULT_LOCK_NAME: &str = "arbor.commit";

pub struct CommitProtocol {
    partitions: Partitions,
    sync: Arc<dyn ClusterSynchronizationService>,
    search: Arc<dyn SearchAdapter>,
    lock_name: String,
    root_node_type: NodeType,
}

impl CommitProtocol {
    pub fn new(
        partitions: Partitions,
        sync: Arc<dyn ClusterSynchronizationService>,
        search: Arc<dyn SearchAdapter>,
        lock_name: impl Into<String>,
        root_node_type: NodeType,
    ) -> Self {
        Self {
            partitions,
            sync,
            search,
            lock_name: lock_name.into(),
            root_node_type,
        }
    }

    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Write the root at revision 0 if the catalog is empty
    ///
    /// Returns `false` when already bootstrapped or when the lock is held
    /// elsewhere; a busy lock is skipped, not waited on.
    pub async fn bootstrap(&self) -> Result<bool> {
        let outcome = try_with_global_lock(self.sync.as_ref(), &self.lock_name, || async {
            if let Some(revision) = self.partitions.catalog.current_revision().await? {
                debug!(revision = %revision, "repository already bootstrapped");
                return Ok(false);
            }
            let root = NodeRepresentation::root(self.root_node_type.clone());
            self.partitions
                .data
                .write(vec![RevisionedNodeRepresentation::new(RevisionNumber::INITIAL, root)])
                .await?;
            self.partitions
                .catalog
                .set_revision(RevisionNumber::INITIAL)
                .await?;
            info!(root_type = %self.root_node_type, "repository bootstrapped");
            Ok(true)
        })
        .await?;

        match outcome {
            Some(bootstrapped) => Ok(bootstrapped),
            None => {
                warn!(lock = %self.lock_name, "bootstrap skipped, lock held");
                Ok(false)
            }
        }
    }

    /// Turn the session's working area into a journal set at `current + 1`
    ///
    /// Returns `None` if there is nothing to commit. Must run under the
    /// global lock.
    pub async fn create_journal_entries(&self, session_id: SessionId) -> Result<Option<RevisionNumber>> {
        let current = self
            .partitions
            .catalog
            .current_revision()
            .await?
            .ok_or(Error::NotBootstrapped)?;
        let revision = current.next();

        let staged: Vec<WorkingAreaNodeRepresentation> = self
            .partitions
            .working_area
            .all_for(session_id)
            .try_collect()
            .await?;
        let entries: Vec<_> = staged
            .iter()
            .filter(|edit| !is_transient(edit))
            .map(|edit| JournalEntryNodeRepresentation::from_working_area(edit, revision))
            .collect();
        if entries.is_empty() {
            debug!(session = %session_id, "nothing to commit");
            return Ok(None);
        }

        let count = entries.len();
        self.partitions.journal.create_set(entries).await?;
        debug!(session = %session_id, revision = %revision, entries = count, "journal set created");
        Ok(Some(revision))
    }

    /// Apply the lowest pending journal set; `None` if the journal is empty
    ///
    /// Must run under the global lock.
    pub async fn commit_journal(&self) -> Result<Option<RevisionNumber>> {
        let Some(revision) = self.partitions.journal.next_pending_revision().await? else {
            return Ok(None);
        };
        let span = info_span!("commit_journal", revision = %revision);
        self.apply(revision).instrument(span).await?;
        Ok(Some(revision))
    }

    /// Apply every pending journal set, lowest first
    pub async fn drain_journal(&self) -> Result<Vec<RevisionNumber>> {
        let mut applied = Vec::new();
        while let Some(revision) = self.commit_journal().await? {
            applied.push(revision);
        }
        Ok(applied)
    }

    /// Commit a session's working area and clear it
    ///
    /// Fails with [`Error::LockHeld`] if another commit holds the lock; the
    /// working area is then left untouched for a retry.
    pub async fn commit_session(&self, session_id: SessionId) -> Result<Option<RevisionNumber>> {
        let span = info_span!("commit", session = %session_id);
        async {
            let committed = try_with_global_lock(self.sync.as_ref(), &self.lock_name, || async {
                self.drain_journal().await?;
                let revision = self.create_journal_entries(session_id).await?;
                self.drain_journal().await?;
                Ok(revision)
            })
            .await?
            .ok_or_else(|| Error::LockHeld(self.lock_name.clone()))?;

            self.partitions.working_area.delete_all_for(session_id).await?;
            self.partitions.working_index.delete_all_for(session_id).await?;
            if let Some(revision) = committed {
                info!(revision = %revision, "session committed");
            }
            Ok(committed)
        }
        .instrument(span)
        .await
    }

    /// Apply journal sets left behind by an interrupted commit
    pub async fn recover(&self) -> Result<Vec<RevisionNumber>> {
        let applied = try_with_global_lock(self.sync.as_ref(), &self.lock_name, || self.drain_journal())
            .await?
            .ok_or_else(|| Error::LockHeld(self.lock_name.clone()))?;
        if !applied.is_empty() {
            info!(revisions = applied.len(), "recovered pending journal sets");
        }
        Ok(applied)
    }

    async fn apply(&self, revision: RevisionNumber) -> Result<()> {
        let entries: Vec<JournalEntryNodeRepresentation> = self
            .partitions
            .journal
            .entries_for(revision)
            .try_collect()
            .await?;

        let baselines = self.baselines(revision, &entries).await?;

        self.partitions
            .data
            .write_from_journal(entries.clone())
            .await?;

        let rows: Vec<_> = entries
            .iter()
            .zip(&baselines)
            .flat_map(|(entry, baseline)| entry.inverse_references(baseline.as_ref()))
            .map(|edge| CommittedInverseNodeReference::new(revision, edge))
            .collect();
        if !rows.is_empty() {
            self.partitions.committed_index.create(rows).await?;
        }

        let feed = entries
            .iter()
            .zip(&baselines)
            .map(|(entry, baseline)| SearchEntry::from_journal(entry, baseline.as_ref()))
            .collect();
        self.search.index(record_stream(feed)).await?;

        let current = self.partitions.catalog.current_revision().await?;
        if current.is_some_and(|current| current >= revision) {
            warn!(current = ?current, "replayed journal set at or below current revision");
        } else {
            self.partitions.catalog.set_revision(revision).await?;
        }

        self.partitions.journal.remove_set(revision).await?;

        let sessions: BTreeSet<SessionId> = entries.iter().map(|e| e.session_id).collect();
        for session_id in sessions {
            if let Some(mut info) = self.sync.get_session_info(session_id).await? {
                if info.revision < revision {
                    info.revision = revision;
                    self.sync.update_session_info(info).await?;
                }
            }
        }

        info!(entries = entries.len(), "journal set applied");
        Ok(())
    }

    /// Each entry's node as committed just below `revision`
    ///
    /// Other sessions may have committed the same path since the entry's
    /// session took its snapshot.
    async fn baselines(
        &self,
        revision: RevisionNumber,
        entries: &[JournalEntryNodeRepresentation],
    ) -> Result<Vec<Option<NodeRepresentation>>> {
        let Some(previous) = revision.checked_sub(1) else {
            return Ok(vec![None; entries.len()]);
        };
        let mut baselines = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = self
                .partitions
                .data
                .latest_at_or_before(previous, entry.path())
                .await?;
            baselines.push(record.map(RevisionedNodeRepresentation::into_node));
        }
        Ok(baselines)
    }
}

/// Created and deleted within one session: nothing reached the committed tier
fn is_transient(edit: &WorkingAreaNodeRepresentation) -> bool {
    edit.working.is_deleted() && edit.permanent.as_ref().map_or(true, |p| p.is_deleted())
}
