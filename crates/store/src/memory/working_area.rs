use crate::adapter::{record_stream, RecordStream, WorkingAreaPartitionAdapter};
use anyhow::anyhow;
use arbor_core::{Path, Result, SessionId, WorkingAreaNodeRepresentation};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Working area held in process memory
///
/// Sessions live in separate map shards, so edits of different sessions do
/// not contend.
#[derive(Default)]
pub struct MemoryWorkingArea {
    sessions: DashMap<SessionId, BTreeMap<Path, WorkingAreaNodeRepresentation>>,
}

impl MemoryWorkingArea {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, session_id: SessionId, keep: F) -> Vec<WorkingAreaNodeRepresentation>
    where
        F: Fn(&Path) -> bool,
    {
        self.sessions
            .get(&session_id)
            .map(|edits| {
                edits
                    .iter()
                    .filter(|(path, _)| keep(path))
                    .map(|(_, repr)| repr.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl WorkingAreaPartitionAdapter for MemoryWorkingArea {
    async fn create(&self, repr: WorkingAreaNodeRepresentation) -> Result<()> {
        let mut edits = self.sessions.entry(repr.session_id).or_default();
        if edits.contains_key(repr.path()) {
            return Err(anyhow!(
                "working area already holds {} for session {}",
                repr.path(),
                repr.session_id
            )
            .into());
        }
        edits.insert(repr.path().clone(), repr);
        Ok(())
    }

    async fn get(
        &self,
        session_id: SessionId,
        path: &Path,
    ) -> Result<Option<WorkingAreaNodeRepresentation>> {
        Ok(self
            .sessions
            .get(&session_id)
            .and_then(|edits| edits.get(path).cloned()))
    }

    fn children_of(
        &self,
        session_id: SessionId,
        parent: &Path,
    ) -> RecordStream<WorkingAreaNodeRepresentation> {
        record_stream(self.collect(session_id, |path| path.is_child_of(parent)))
    }

    fn descendants_of(
        &self,
        session_id: SessionId,
        parent: &Path,
    ) -> RecordStream<WorkingAreaNodeRepresentation> {
        record_stream(self.collect(session_id, |path| {
            path != parent && path.is_at_or_below(parent)
        }))
    }

    fn all_for(&self, session_id: SessionId) -> RecordStream<WorkingAreaNodeRepresentation> {
        record_stream(self.collect(session_id, |_| true))
    }

    async fn update(&self, repr: WorkingAreaNodeRepresentation) -> Result<()> {
        let mut edits = self.sessions.get_mut(&repr.session_id).ok_or_else(|| {
            anyhow!("working area holds nothing for session {}", repr.session_id)
        })?;
        match edits.get_mut(repr.path()) {
            Some(slot) => {
                *slot = repr;
                Ok(())
            }
            None => Err(anyhow!(
                "working area holds no {} for session {}",
                repr.path(),
                repr.session_id
            )
            .into()),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{NodeRepresentation, NodeType, Properties};
    use futures::TryStreamExt;

    fn staged(session_id: SessionId, path: &str) -> WorkingAreaNodeRepresentation {
        let node = NodeRepresentation::new(
            Path::new(path).unwrap(),
            NodeType::root(),
            Properties::new(),
        );
        WorkingAreaNodeRepresentation::new(session_id, None, node)
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let wa = MemoryWorkingArea::new();
        let found = wa.get(SessionId::new(), &Path::root()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slot() {
        let wa = MemoryWorkingArea::new();
        let session = SessionId::new();
        wa.create(staged(session, "/a")).await.unwrap();
        assert!(wa.create(staged(session, "/a")).await.is_err());
        // another session may stage the same path
        wa.create(staged(SessionId::new(), "/a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_children_and_descendants() {
        let wa = MemoryWorkingArea::new();
        let session = SessionId::new();
        for p in ["/a", "/a/b", "/a/b/c", "/ab"] {
            wa.create(staged(session, p)).await.unwrap();
        }
        let a = Path::new("/a").unwrap();

        let children: Vec<_> = wa.children_of(session, &a).try_collect().await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path().as_str(), "/a/b");

        let below: Vec<_> = wa.descendants_of(session, &a).try_collect().await.unwrap();
        let paths: Vec<_> = below.iter().map(|r| r.path().as_str()).collect();
        assert_eq!(paths, vec!["/a/b", "/a/b/c"]);
    }

    #[tokio::test]
    async fn test_update_requires_existing_and_delete_all_clears() {
        let wa = MemoryWorkingArea::new();
        let session = SessionId::new();
        assert!(wa.update(staged(session, "/a")).await.is_err());

        wa.create(staged(session, "/a")).await.unwrap();
        let tomb = staged(session, "/a");
        let tomb = tomb.with_working(tomb.working.tombstone());
        wa.update(tomb).await.unwrap();
        let found = wa.get(session, &Path::new("/a").unwrap()).await.unwrap().unwrap();
        assert!(found.working.is_deleted());

        wa.delete_all_for(session).await.unwrap();
        let all: Vec<_> = wa.all_for(session).try_collect().await.unwrap();
        assert!(all.is_empty());
    }
}
