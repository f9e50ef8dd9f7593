//! Node operations over the working area and the committed tier
//!
//! Reads merge the two tiers: a session's working-area edit of a path wins
//! over the committed record at the session's pinned revision, and tombstones
//! from either tier are hidden. Mutations only ever touch the working area and
//! the working-area reference index.

use crate::binary::BinaryManagerService;
use arbor_core::{
    reference_delta, Error, InverseNodeReference, NodeRepresentation, NodeState, NodeType, Path,
    Properties, Result, SessionInfo, WorkingAreaInverseNodeReference, WorkingAreaNodeRepresentation,
};
use arbor_store::{Partitions, RecordStream};
use futures::TryStreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Requested change to an existing node
///
/// `properties` replaces the whole property map. Setting `node_type` to
/// anything other than the node's current type is refused.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub properties: Properties,
    pub node_type: Option<NodeType>,
}

impl NodeUpdate {
    pub fn new(properties: Properties) -> Self {
        Self {
            properties,
            node_type: None,
        }
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }
}

pub struct MetadataManager {
    partitions: Partitions,
    binaries: Arc<dyn BinaryManagerService>,
}

impl MetadataManager {
    pub fn new(partitions: Partitions, binaries: Arc<dyn BinaryManagerService>) -> Self {
        Self {
            partitions,
            binaries,
        }
    }

    /// The node a session sees at `path`, `None` if absent or deleted
    pub async fn node_representation(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Option<NodeRepresentation>> {
        Ok(self
            .resolve(session, path)
            .await?
            .filter(|node| !node.is_deleted()))
    }

    /// Live children of `parent`, ordered by path
    pub async fn children_of(
        &self,
        session: &SessionInfo,
        parent: &Path,
    ) -> Result<Vec<NodeRepresentation>> {
        let committed: Vec<_> = self
            .partitions
            .data
            .latest_children_at_or_before(session.revision, parent)
            .try_collect()
            .await?;
        let staged: Vec<_> = self
            .partitions
            .working_area
            .children_of(session.session_id, parent)
            .try_collect()
            .await?;

        let mut merged: BTreeMap<Path, NodeRepresentation> = committed
            .into_iter()
            .map(|record| (record.path().clone(), record.into_node()))
            .collect();
        for edit in staged {
            merged.insert(edit.path().clone(), edit.effective_node_representation());
        }
        Ok(merged.into_values().filter(|node| !node.is_deleted()).collect())
    }

    /// Live reference edges pointing at `path`, ordered by referring path
    pub async fn references_to(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Vec<InverseNodeReference>> {
        self.merge_references(
            session,
            self.partitions
                .working_index
                .references_to(session.session_id, path),
            self.partitions
                .committed_index
                .references_to(path, session.revision),
        )
        .await
    }

    /// Live reference edges pointing at `path` or anything below it
    pub async fn references_at_or_below(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Vec<InverseNodeReference>> {
        self.merge_references(
            session,
            self.partitions
                .working_index
                .references_at_or_below(session.session_id, path),
            self.partitions
                .committed_index
                .references_at_or_below(path, session.revision),
        )
        .await
    }

    /// Live nodes referencing `path`, ordered by path
    pub async fn referring_nodes(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Vec<NodeRepresentation>> {
        let mut nodes = Vec::new();
        for edge in self.references_to(session, path).await? {
            if let Some(node) = self
                .node_representation(session, &edge.referring_node_path)
                .await?
            {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    pub async fn create_node(
        &self,
        session: &SessionInfo,
        parent: &Path,
        name: &str,
        node_type: NodeType,
        properties: Properties,
    ) -> Result<NodeRepresentation> {
        let path = parent.child(name)?;
        if self.node_representation(session, parent).await?.is_none() {
            return Err(Error::NodeNotFound(parent.clone()));
        }

        let staged = self
            .partitions
            .working_area
            .get(session.session_id, &path)
            .await?;
        let existing = match &staged {
            Some(edit) => Some(edit.effective_node_representation()),
            None => self.committed(session, &path).await?,
        };
        if existing.as_ref().is_some_and(|node| !node.is_deleted()) {
            return Err(Error::NodeCreation {
                path,
                reason: "node already exists".to_string(),
            });
        }
        if let Some(reason) = self.check_properties(session, &properties).await? {
            return Err(Error::NodeCreation { path, reason });
        }

        let node = NodeRepresentation::new(path.clone(), node_type, properties);
        match staged {
            Some(edit) => {
                // deleted earlier in this session: the commit diffs against the committed node
                if let Some(committed) = edit.permanent.as_ref().filter(|p| !p.is_deleted()) {
                    if committed.node_type != node.node_type {
                        return Err(Error::NodeCreation {
                            path,
                            reason: format!(
                                "committed as {}; cannot recreate as {} before committing the delete",
                                committed.node_type, node.node_type
                            ),
                        });
                    }
                }
                self.partitions
                    .working_area
                    .update(edit.with_working(node.clone()))
                    .await?;
            }
            None => {
                self.partitions
                    .working_area
                    .create(WorkingAreaNodeRepresentation::new(
                        session.session_id,
                        None,
                        node.clone(),
                    ))
                    .await?;
            }
        }

        self.index_references(session, &path, &BTreeSet::new(), &node.live_references())
            .await?;
        debug!(session = %session.session_id, path = %path, "node created");
        Ok(node)
    }

    pub async fn update_node(
        &self,
        session: &SessionInfo,
        path: &Path,
        update: NodeUpdate,
    ) -> Result<NodeRepresentation> {
        let current = self
            .node_representation(session, path)
            .await?
            .ok_or_else(|| Error::NodeNotFound(path.clone()))?;

        if let Some(node_type) = &update.node_type {
            if node_type != &current.node_type {
                return Err(Error::NodeModification {
                    path: path.clone(),
                    reason: format!("node type change from {} to {}", current.node_type, node_type),
                });
            }
        }
        if let Some(reason) = self.check_properties(session, &update.properties).await? {
            return Err(Error::NodeModification {
                path: path.clone(),
                reason,
            });
        }

        let node = NodeRepresentation {
            properties: update.properties,
            ..current.clone()
        };
        self.stage(session, &current, node.clone()).await?;
        debug!(session = %session.session_id, path = %path, "node updated");
        Ok(node)
    }

    /// Tombstone `path` and everything below it
    ///
    /// Refused for the root, and while any node outside the subtree still
    /// references a node inside it.
    pub async fn delete_node(&self, session: &SessionInfo, path: &Path) -> Result<()> {
        if path.is_root() {
            return Err(Error::NodeDeletion {
                path: path.clone(),
                reason: "the root node cannot be deleted".to_string(),
            });
        }
        if self.node_representation(session, path).await?.is_none() {
            return Err(Error::NodeNotFound(path.clone()));
        }

        let blocking = self
            .references_at_or_below(session, path)
            .await?
            .into_iter()
            .find(|edge| !edge.referring_node_path.is_at_or_below(path));
        if let Some(edge) = blocking {
            return Err(Error::NodeDeletion {
                path: path.clone(),
                reason: format!(
                    "{} is referenced by {}",
                    edge.node_path, edge.referring_node_path
                ),
            });
        }

        let mut pending = vec![path.clone()];
        let mut deleted = 0usize;
        while let Some(next) = pending.pop() {
            let Some(current) = self.node_representation(session, &next).await? else {
                continue;
            };
            let children = self.children_of(session, &next).await?;
            self.stage(session, &current, current.tombstone()).await?;
            pending.extend(children.into_iter().map(|child| child.path));
            deleted += 1;
        }
        debug!(session = %session.session_id, path = %path, nodes = deleted, "subtree deleted");
        Ok(())
    }

    /// Working-area edit if any, else the committed record; tombstones included
    async fn resolve(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Option<NodeRepresentation>> {
        if let Some(edit) = self
            .partitions
            .working_area
            .get(session.session_id, path)
            .await?
        {
            return Ok(Some(edit.effective_node_representation()));
        }
        self.committed(session, path).await
    }

    async fn committed(
        &self,
        session: &SessionInfo,
        path: &Path,
    ) -> Result<Option<NodeRepresentation>> {
        Ok(self
            .partitions
            .data
            .latest_at_or_before(session.revision, path)
            .await?
            .map(|record| record.into_node()))
    }

    /// Write `node` as the session's edit of a path currently showing `current`
    async fn stage(
        &self,
        session: &SessionInfo,
        current: &NodeRepresentation,
        node: NodeRepresentation,
    ) -> Result<()> {
        let working_area = &self.partitions.working_area;
        let after = node.live_references();
        match working_area.get(session.session_id, &node.path).await? {
            Some(edit) => working_area.update(edit.with_working(node.clone())).await?,
            None => {
                working_area
                    .create(WorkingAreaNodeRepresentation::new(
                        session.session_id,
                        Some(current.clone()),
                        node.clone(),
                    ))
                    .await?
            }
        }
        self.index_references(session, &node.path, &current.live_references(), &after)
            .await
    }

    async fn index_references(
        &self,
        session: &SessionInfo,
        source: &Path,
        before: &BTreeSet<Path>,
        after: &BTreeSet<Path>,
    ) -> Result<()> {
        let rows: Vec<_> = reference_delta(source, before, after)
            .into_iter()
            .map(|edge| WorkingAreaInverseNodeReference::new(session.session_id, edge))
            .collect();
        if rows.is_empty() {
            return Ok(());
        }
        self.partitions.working_index.create(rows).await
    }

    /// Why `properties` cannot be stored, or `None` if they can
    ///
    /// Backend failures come back as errors, not reasons.
    async fn check_properties(
        &self,
        session: &SessionInfo,
        properties: &Properties,
    ) -> Result<Option<String>> {
        for (name, value) in properties {
            if let Err(err) = value.validate(name) {
                return Ok(Some(err.to_string()));
            }
            for reference in value.references() {
                if let Some(pinned) = reference.revision.filter(|r| *r > session.revision) {
                    return Ok(Some(format!(
                        "property '{}' pins {} at revision {}, after session revision {}",
                        name, reference.path, pinned, session.revision
                    )));
                }
                let exists = match reference.revision {
                    Some(revision) => self
                        .partitions
                        .data
                        .latest_at_or_before(revision, &reference.path)
                        .await?
                        .is_some_and(|record| record.state() == NodeState::Normal),
                    None => self
                        .node_representation(session, &reference.path)
                        .await?
                        .is_some(),
                };
                if !exists {
                    return Ok(Some(format!(
                        "property '{}' references missing node {}",
                        name, reference.path
                    )));
                }
            }
            for binary in value.binaries() {
                if !self.binaries.file_exists(binary).await? {
                    return Ok(Some(format!(
                        "property '{}' references missing binary {}",
                        name,
                        binary.locator()
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Overlay working rows on committed rows per (target, source), then drop retractions
    ///
    /// A source edited in this session is described by its working rows
    /// alone; committed rows for it can predate the edit's snapshot.
    async fn merge_references(
        &self,
        session: &SessionInfo,
        working: RecordStream<InverseNodeReference>,
        committed: RecordStream<InverseNodeReference>,
    ) -> Result<Vec<InverseNodeReference>> {
        let committed: Vec<_> = committed.try_collect().await?;
        let working: Vec<_> = working.try_collect().await?;

        let mut edited: BTreeMap<Path, bool> = BTreeMap::new();
        let mut merged = BTreeMap::new();
        for edge in committed {
            let source = &edge.referring_node_path;
            let is_edited = match edited.get(source) {
                Some(is_edited) => *is_edited,
                None => {
                    let is_edited = self
                        .partitions
                        .working_area
                        .get(session.session_id, source)
                        .await?
                        .is_some();
                    edited.insert(source.clone(), is_edited);
                    is_edited
                }
            };
            if !is_edited {
                merged.insert((edge.node_path.clone(), source.clone()), edge);
            }
        }
        for edge in working {
            merged.insert(
                (edge.node_path.clone(), edge.referring_node_path.clone()),
                edge,
            );
        }
        Ok(merged
            .into_values()
            .filter(|edge| !edge.is_deleted())
            .collect())
    }
}
