use crate::adapter::{record_stream, DataPartitionAdapter, RecordStream};
use crate::select::latest_at_or_before;
use arbor_core::{NodeRepresentation, Path, Result, RevisionNumber, RevisionedNodeRepresentation};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Committed store held in process memory
///
/// path -> revision -> node. Rewriting a (path, revision) replaces the record
/// with itself.
#[derive(Default)]
pub struct MemoryDataPartition {
    nodes: RwLock<BTreeMap<Path, BTreeMap<RevisionNumber, NodeRepresentation>>>,
}

impl MemoryDataPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all revisions
    pub fn record_count(&self) -> usize {
        self.nodes.read().values().map(|v| v.len()).sum()
    }
}

#[async_trait]
impl DataPartitionAdapter for MemoryDataPartition {
    async fn write(&self, records: Vec<RevisionedNodeRepresentation>) -> Result<()> {
        let mut nodes = self.nodes.write();
        for record in records {
            nodes
                .entry(record.path().clone())
                .or_default()
                .insert(record.revision, record.node);
        }
        Ok(())
    }

    async fn latest_at_or_before(
        &self,
        revision: RevisionNumber,
        path: &Path,
    ) -> Result<Option<RevisionedNodeRepresentation>> {
        let nodes = self.nodes.read();
        Ok(nodes.get(path).and_then(|versions| {
            versions
                .range(..=revision)
                .next_back()
                .map(|(rev, node)| RevisionedNodeRepresentation::new(*rev, node.clone()))
        }))
    }

    fn latest_children_at_or_before(
        &self,
        revision: RevisionNumber,
        parent: &Path,
    ) -> RecordStream<RevisionedNodeRepresentation> {
        let prefix = parent.descendant_prefix();
        let nodes = self.nodes.read();
        let candidates = nodes
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(path, _)| path.as_str().starts_with(&prefix))
            .filter(|(path, _)| path.is_child_of(parent))
            .flat_map(|(path, versions)| {
                versions
                    .iter()
                    .map(move |(rev, node)| (path.clone(), *rev, node))
            });

        let children = latest_at_or_before(candidates, revision)
            .into_values()
            .filter(|(_, node)| !node.is_deleted())
            .map(|(rev, node)| RevisionedNodeRepresentation::new(rev, node.clone()))
            .collect();
        record_stream(children)
    }

    async fn reset(&self) -> Result<()> {
        self.nodes.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{NodeType, Properties, PropertyValue};
    use futures::TryStreamExt;

    fn record(path: &str, rev: u128, n: i32) -> RevisionedNodeRepresentation {
        let mut props = Properties::new();
        props.insert("n".into(), PropertyValue::Int(n));
        RevisionedNodeRepresentation::new(
            RevisionNumber::new(rev),
            NodeRepresentation::new(Path::new(path).unwrap(), NodeType::root(), props),
        )
    }

    #[tokio::test]
    async fn test_point_lookup_selects_latest_at_or_before() {
        let data = MemoryDataPartition::new();
        data.write(vec![record("/a", 1, 1), record("/a", 3, 3)]).await.unwrap();
        let a = Path::new("/a").unwrap();

        assert!(data.latest_at_or_before(RevisionNumber::new(0), &a).await.unwrap().is_none());
        let at2 = data.latest_at_or_before(RevisionNumber::new(2), &a).await.unwrap().unwrap();
        assert_eq!(at2.revision, RevisionNumber::new(1));
        let at9 = data.latest_at_or_before(RevisionNumber::new(9), &a).await.unwrap().unwrap();
        assert_eq!(at9.revision, RevisionNumber::new(3));
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let data = MemoryDataPartition::new();
        data.write(vec![record("/a", 1, 1)]).await.unwrap();
        data.write(vec![record("/a", 1, 1)]).await.unwrap();
        assert_eq!(data.record_count(), 1);
    }

    #[tokio::test]
    async fn test_children_hide_tombstones_but_lookup_sees_them() {
        let data = MemoryDataPartition::new();
        let mut gone = record("/p/gone", 2, 0);
        gone.node = gone.node.tombstone();
        data.write(vec![
            record("/p", 1, 0),
            record("/p/gone", 1, 0),
            record("/p/kept", 1, 0),
            record("/p/kept/deep", 1, 0),
            record("/p-sibling", 1, 0),
            gone,
        ])
        .await
        .unwrap();
        let p = Path::new("/p").unwrap();

        let at1: Vec<_> = data
            .latest_children_at_or_before(RevisionNumber::new(1), &p)
            .try_collect()
            .await
            .unwrap();
        let names: Vec<_> = at1.iter().map(|r| r.path().as_str()).collect();
        assert_eq!(names, vec!["/p/gone", "/p/kept"]);

        let at2: Vec<_> = data
            .latest_children_at_or_before(RevisionNumber::new(2), &p)
            .try_collect()
            .await
            .unwrap();
        let names: Vec<_> = at2.iter().map(|r| r.path().as_str()).collect();
        assert_eq!(names, vec!["/p/kept"]);

        let tomb = data
            .latest_at_or_before(RevisionNumber::new(2), &Path::new("/p/gone").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(tomb.node.is_deleted());
    }

    #[tokio::test]
    async fn test_root_children() {
        let data = MemoryDataPartition::new();
        data.write(vec![record("/", 0, 0), record("/x", 1, 0), record("/x/y", 1, 0)])
            .await
            .unwrap();
        let children: Vec<_> = data
            .latest_children_at_or_before(RevisionNumber::new(1), &Path::root())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path().as_str(), "/x");
    }
}
