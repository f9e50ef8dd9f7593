use crate::adapter::{
    record_stream, CommittedNodeIndexPartitionAdapter, RecordStream,
    WorkingAreaNodeIndexPartitionAdapter,
};
use crate::select::latest_at_or_before;
use arbor_core::{
    CommittedInverseNodeReference, InverseNodeReference, NodeState, Path, Result, RevisionNumber,
    SessionId, WorkingAreaInverseNodeReference,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// (target, source)
type EdgeKey = (Path, Path);

fn edge(key: &EdgeKey, state: NodeState) -> InverseNodeReference {
    InverseNodeReference::new(key.0.clone(), key.1.clone(), state)
}

/// Working-area reference index held in process memory
#[derive(Default)]
pub struct MemoryWorkingAreaIndex {
    sessions: DashMap<SessionId, BTreeMap<EdgeKey, NodeState>>,
}

impl MemoryWorkingAreaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, session_id: SessionId, keep: F) -> Vec<InverseNodeReference>
    where
        F: Fn(&Path) -> bool,
    {
        self.sessions
            .get(&session_id)
            .map(|rows| {
                rows.iter()
                    .filter(|(key, _)| keep(&key.0))
                    .map(|(key, state)| edge(key, *state))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl WorkingAreaNodeIndexPartitionAdapter for MemoryWorkingAreaIndex {
    async fn create(&self, rows: Vec<WorkingAreaInverseNodeReference>) -> Result<()> {
        for row in rows {
            let key = (row.reference.node_path, row.reference.referring_node_path);
            self.sessions
                .entry(row.session_id)
                .or_default()
                .insert(key, row.reference.state);
        }
        Ok(())
    }

    fn references_to(&self, session_id: SessionId, path: &Path) -> RecordStream<InverseNodeReference> {
        record_stream(self.collect(session_id, |target| target == path))
    }

    fn references_at_or_below(
        &self,
        session_id: SessionId,
        path: &Path,
    ) -> RecordStream<InverseNodeReference> {
        record_stream(self.collect(session_id, |target| target.is_at_or_below(path)))
    }

    async fn delete_all_for(&self, session_id: SessionId) -> Result<()> {
        self.sessions.remove(&session_id);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.sessions.clear();
        Ok(())
    }
}

/// Committed reference index held in process memory
#[derive(Default)]
pub struct MemoryCommittedIndex {
    edges: RwLock<BTreeMap<EdgeKey, BTreeMap<RevisionNumber, NodeState>>>,
}

impl MemoryCommittedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn select<F>(&self, revision: RevisionNumber, keep: F) -> Vec<InverseNodeReference>
    where
        F: Fn(&Path) -> bool,
    {
        let edges = self.edges.read();
        let rows = edges
            .iter()
            .filter(|(key, _)| keep(&key.0))
            .flat_map(|(key, versions)| versions.iter().map(move |(rev, state)| (key, *rev, *state)));

        latest_at_or_before(rows, revision)
            .into_iter()
            .filter(|(_, (_, state))| *state == NodeState::Normal)
            .map(|(key, (_, state))| edge(key, state))
            .collect()
    }
}

#[async_trait]
impl CommittedNodeIndexPartitionAdapter for MemoryCommittedIndex {
    async fn create(&self, rows: Vec<CommittedInverseNodeReference>) -> Result<()> {
        let mut edges = self.edges.write();
        for row in rows {
            let key = (row.reference.node_path, row.reference.referring_node_path);
            edges
                .entry(key)
                .or_default()
                .insert(row.revision, row.reference.state);
        }
        Ok(())
    }

    fn references_to(&self, path: &Path, revision: RevisionNumber) -> RecordStream<InverseNodeReference> {
        record_stream(self.select(revision, |target| target == path))
    }

    fn references_at_or_below(
        &self,
        path: &Path,
        revision: RevisionNumber,
    ) -> RecordStream<InverseNodeReference> {
        record_stream(self.select(revision, |target| target.is_at_or_below(path)))
    }

    async fn reset(&self) -> Result<()> {
        self.edges.write().clear();
        Ok(())
    }
}
