use super::{decode, encode, materialize, path_from_bytes, split_revision_suffix, TreeHandle};
use crate::adapter::{CommittedNodeIndexPartitionAdapter, RecordStream};
use crate::select::latest_at_or_before;
use anyhow::{anyhow, Context};
use arbor_core::{
    CommittedInverseNodeReference, InverseNodeReference, NodeState, Path, Result, RevisionNumber,
};
use async_trait::async_trait;
use tracing::debug;

/// Committed reference index in the `references` tree
#[derive(Clone)]
pub struct SledCommittedIndex {
    handle: TreeHandle,
}

fn edge_key(row: &CommittedInverseNodeReference) -> Vec<u8> {
    let target = row.reference.node_path.as_str().as_bytes();
    let source = row.reference.referring_node_path.as_str().as_bytes();
    let mut key = Vec::with_capacity(target.len() + source.len() + 18);
    key.extend_from_slice(target);
    key.push(0);
    key.extend_from_slice(source);
    key.push(0);
    key.extend_from_slice(&row.revision.to_be_bytes());
    key
}

/// Decode `<target> 0x00 <source> 0x00 <revision>`
fn parse_edge_key(key: &[u8]) -> Result<(Path, Path, RevisionNumber)> {
    let (pair, revision) = split_revision_suffix(key)?;
    let sep = pair
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| anyhow!("Malformed reference key"))?;
    let target = path_from_bytes(&pair[..sep])?;
    let source = path_from_bytes(&pair[sep + 1..])?;
    Ok((target, source, revision))
}

impl SledCommittedIndex {
    pub(super) fn new(tree: sled::Tree, flush_on_write: bool) -> Self {
        Self {
            handle: TreeHandle {
                tree,
                flush_on_write,
            },
        }
    }

    fn select<F>(&self, prefix: &[u8], revision: RevisionNumber, keep: F) -> Result<Vec<InverseNodeReference>>
    where
        F: Fn(&Path) -> bool,
    {
        let mut rows = Vec::new();
        for item in self.handle.tree.scan_prefix(prefix) {
            let (key, value) = item.context("Failed to scan reference index")?;
            let (target, source, rev) = parse_edge_key(&key)?;
            if keep(&target) {
                let state: NodeState = decode(&value)?;
                rows.push(((target, source), rev, state));
            }
        }

        Ok(latest_at_or_before(rows, revision)
            .into_iter()
            .filter(|(_, (_, state))| *state == NodeState::Normal)
            .map(|((target, source), (_, state))| InverseNodeReference::new(target, source, state))
            .collect())
    }
}

#[async_trait]
impl CommittedNodeIndexPartitionAdapter for SledCommittedIndex {
    async fn create(&self, rows: Vec<CommittedInverseNodeReference>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for row in &rows {
            batch.insert(edge_key(row), encode(&row.reference.state)?);
        }
        self.handle
            .tree
            .apply_batch(batch)
            .context("Failed to write reference index")?;
        self.handle.flush().await?;
        debug!(rows = rows.len(), "wrote committed reference rows");
        Ok(())
    }

    fn references_to(&self, path: &Path, revision: RevisionNumber) -> RecordStream<InverseNodeReference> {
        let mut prefix = path.as_str().as_bytes().to_vec();
        prefix.push(0);
        materialize(self.select(&prefix, revision, |target| target == path))
    }

    fn references_at_or_below(
        &self,
        path: &Path,
        revision: RevisionNumber,
    ) -> RecordStream<InverseNodeReference> {
        // `/a` also prefixes `/ab`; the filter drops those
        materialize(self.select(path.as_str().as_bytes(), revision, |target| {
            target.is_at_or_below(path)
        }))
    }

    async fn reset(&self) -> Result<()> {
        self.handle.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::SledStore;
    use futures::TryStreamExt;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    fn row(rev: u128, target: &str, source: &str, state: NodeState) -> CommittedInverseNodeReference {
        CommittedInverseNodeReference::new(
            RevisionNumber::new(rev),
            InverseNodeReference::new(p(target), p(source), state),
        )
    }

    #[test]
    fn test_key_parses_back() {
        let key = edge_key(&row(0x100, "/a/b", "/c", NodeState::Normal));
        let (target, source, rev) = parse_edge_key(&key).unwrap();
        assert_eq!(target, p("/a/b"));
        assert_eq!(source, p("/c"));
        assert_eq!(rev, RevisionNumber::new(0x100));
    }

    #[tokio::test]
    async fn test_retracted_edge_disappears_from_later_revisions() {
        let index = SledStore::temporary().unwrap().committed_index().unwrap();
        index
            .create(vec![
                row(1, "/a", "/b", NodeState::Normal),
                row(1, "/a", "/c", NodeState::Normal),
                row(2, "/a", "/b", NodeState::Deleted),
            ])
            .await
            .unwrap();

        let at1: Vec<_> = index.references_to(&p("/a"), RevisionNumber::new(1)).try_collect().await.unwrap();
        assert_eq!(at1.len(), 2);
        let at2: Vec<_> = index.references_to(&p("/a"), RevisionNumber::new(2)).try_collect().await.unwrap();
        assert_eq!(at2.len(), 1);
        assert_eq!(at2[0].referring_node_path, p("/c"));
    }

    #[tokio::test]
    async fn test_at_or_below_excludes_name_prefix_siblings() {
        let index = SledStore::temporary().unwrap().committed_index().unwrap();
        index
            .create(vec![
                row(1, "/a", "/x", NodeState::Normal),
                row(1, "/a/b", "/y", NodeState::Normal),
                row(1, "/ab", "/z", NodeState::Normal),
            ])
            .await
            .unwrap();
        let rows: Vec<_> = index
            .references_at_or_below(&p("/a"), RevisionNumber::new(1))
            .try_collect()
            .await
            .unwrap();
        let sources: Vec<_> = rows.iter().map(|r| r.referring_node_path.as_str()).collect();
        assert_eq!(sources, vec!["/x", "/y"]);
    }
}
