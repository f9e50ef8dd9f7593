//! Search feed produced at commit time

use arbor_core::{
    JournalEntryNodeRepresentation, NodeRepresentation, NodeState, NodeType, Path, Properties,
    PropertyValue, Result, RevisionNumber,
};
use arbor_store::RecordStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// One node change as seen by a search indexer
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub path: Path,
    pub node_type: NodeType,
    pub revision: RevisionNumber,
    pub state: NodeState,
    pub current: Properties,
    pub prior: Properties,
}

impl SearchEntry {
    /// Feed entry for `entry`; `prior` is the node as committed before it
    pub fn from_journal(entry: &JournalEntryNodeRepresentation, prior: Option<&NodeRepresentation>) -> Self {
        Self {
            path: entry.path().clone(),
            node_type: entry.node_type().clone(),
            revision: entry.revision,
            state: entry.content.state,
            current: entry.content.properties.clone(),
            prior: prior.map(|p| p.properties.clone()).unwrap_or_default(),
        }
    }
}

/// Consumer of the commit-time search feed
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn index(&self, entries: RecordStream<SearchEntry>) -> Result<()>;
}

/// Discards the feed
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSearchAdapter;

#[async_trait]
impl SearchAdapter for NullSearchAdapter {
    async fn index(&self, entries: RecordStream<SearchEntry>) -> Result<()> {
        entries.try_for_each(|_| async { Ok(()) }).await
    }
}

/// Latest live state of every indexed path, with path/type/text predicates
#[derive(Default)]
pub struct MemorySearchIndex {
    nodes: RwLock<BTreeMap<Path, SearchEntry>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed paths at or below `path`
    pub fn under(&self, path: &Path) -> Vec<Path> {
        self.matching(|entry| entry.path.is_at_or_below(path))
    }

    pub fn of_type(&self, node_type: &NodeType) -> Vec<Path> {
        self.matching(|entry| &entry.node_type == node_type)
    }

    /// Paths with a string property (or string list element) containing `needle`
    pub fn containing_text(&self, needle: &str) -> Vec<Path> {
        self.matching(|entry| entry.current.values().any(|v| text_contains(v, needle)))
    }

    fn matching<F>(&self, keep: F) -> Vec<Path>
    where
        F: Fn(&SearchEntry) -> bool,
    {
        self.nodes
            .read()
            .values()
            .filter(|entry| keep(entry))
            .map(|entry| entry.path.clone())
            .collect()
    }
}

fn text_contains(value: &PropertyValue, needle: &str) -> bool {
    match value {
        PropertyValue::String(s) => s.contains(needle),
        PropertyValue::List(list) => list.items().iter().any(|v| text_contains(v, needle)),
        _ => false,
    }
}

#[async_trait]
impl SearchAdapter for MemorySearchIndex {
    async fn index(&self, entries: RecordStream<SearchEntry>) -> Result<()> {
        let entries: Vec<SearchEntry> = entries.try_collect().await?;
        let mut nodes = self.nodes.write();
        for entry in entries {
            // older revisions replayed from the journal must not win
            if nodes.get(&entry.path).is_some_and(|seen| seen.revision > entry.revision) {
                continue;
            }
            match entry.state {
                NodeState::Normal => {
                    nodes.insert(entry.path.clone(), entry);
                }
                NodeState::Deleted => {
                    nodes.remove(&entry.path);
                }
            }
        }
        Ok(())
    }
}
