//! Node representations for each storage tier
//!
//! Tier-specific variants wrap a plain [`NodeRepresentation`] and add the one
//! field that tier needs (a revision, a session), rather than repeating it.

use crate::node_type::NodeType;
use crate::path::Path;
use crate::revision::RevisionNumber;
use crate::session::SessionId;
use crate::value::{referenced_paths, Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle state of a node or reference edge
///
/// `Deleted` marks a tombstone; records are never physically removed from the
/// committed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Normal,
    Deleted,
}

/// Name, path, type, state and properties of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRepresentation {
    pub name: String,
    pub path: Path,
    pub node_type: NodeType,
    pub state: NodeState,
    pub properties: Properties,
}

impl NodeRepresentation {
    /// A live node; the name is taken from the last path segment
    pub fn new(path: Path, node_type: NodeType, properties: Properties) -> Self {
        Self {
            name: path.name().to_string(),
            path,
            node_type,
            state: NodeState::Normal,
            properties,
        }
    }

    /// The bootstrap root node
    pub fn root(node_type: NodeType) -> Self {
        Self::new(Path::root(), node_type, Properties::new())
    }

    pub fn is_deleted(&self) -> bool {
        self.state == NodeState::Deleted
    }

    /// Same node in state `Deleted`, properties kept
    pub fn tombstone(&self) -> Self {
        Self {
            state: NodeState::Deleted,
            ..self.clone()
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Paths this node references; empty for tombstones
    pub fn live_references(&self) -> BTreeSet<Path> {
        match self.state {
            NodeState::Normal => referenced_paths(&self.properties),
            NodeState::Deleted => BTreeSet::new(),
        }
    }
}

/// Committed-store record: a node at a revision
///
/// Immutable once written. Several revisions of one path may coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionedNodeRepresentation {
    pub revision: RevisionNumber,
    pub node: NodeRepresentation,
}

impl RevisionedNodeRepresentation {
    pub fn new(revision: RevisionNumber, node: NodeRepresentation) -> Self {
        Self { revision, node }
    }

    pub fn path(&self) -> &Path {
        &self.node.path
    }

    pub fn state(&self) -> NodeState {
        self.node.state
    }

    pub fn into_node(self) -> NodeRepresentation {
        self.node
    }
}

/// A session's pending edit of one node
///
/// `permanent` is the committed snapshot the edit started from (`None` for a
/// node new to the committed tier); `working` is the full pending content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingAreaNodeRepresentation {
    pub session_id: SessionId,
    pub permanent: Option<NodeRepresentation>,
    pub working: NodeRepresentation,
}

impl WorkingAreaNodeRepresentation {
    pub fn new(
        session_id: SessionId,
        permanent: Option<NodeRepresentation>,
        working: NodeRepresentation,
    ) -> Self {
        Self {
            session_id,
            permanent,
            working,
        }
    }

    pub fn path(&self) -> &Path {
        &self.working.path
    }

    pub fn node_type(&self) -> &NodeType {
        &self.working.node_type
    }

    /// The view a reader of this session should see
    ///
    /// Identity (path, name, type) comes from the committed snapshot when one
    /// exists, the state and property map from the pending edit. Tombstones
    /// are returned as-is so callers can diff or hide them.
    pub fn effective_node_representation(&self) -> NodeRepresentation {
        match &self.permanent {
            Some(permanent) if !permanent.is_deleted() => NodeRepresentation {
                name: permanent.name.clone(),
                path: permanent.path.clone(),
                node_type: permanent.node_type.clone(),
                state: self.working.state,
                properties: self.working.properties.clone(),
            },
            _ => self.working.clone(),
        }
    }

    /// Replace the pending content, keeping the original snapshot
    pub fn with_working(&self, working: NodeRepresentation) -> Self {
        Self {
            session_id: self.session_id,
            permanent: self.permanent.clone(),
            working,
        }
    }
}

/// One property whose value differs between prior and new content
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: String,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

/// A pending commit unit: one node's change at a target revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryNodeRepresentation {
    pub session_id: SessionId,
    pub revision: RevisionNumber,
    pub prior: Option<NodeRepresentation>,
    pub content: NodeRepresentation,
}

impl JournalEntryNodeRepresentation {
    /// Journal entry for a working-area edit, diffed against its snapshot
    pub fn from_working_area(
        working: &WorkingAreaNodeRepresentation,
        revision: RevisionNumber,
    ) -> Self {
        Self {
            session_id: working.session_id,
            revision,
            prior: working.permanent.clone(),
            content: working.effective_node_representation(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.content.path
    }

    pub fn node_type(&self) -> &NodeType {
        &self.content.node_type
    }

    fn prior_properties(&self) -> Option<&Properties> {
        self.prior.as_ref().map(|p| &p.properties)
    }

    /// Properties present in content but absent from the prior content
    pub fn added_properties(&self) -> Properties {
        self.content
            .properties
            .iter()
            .filter(|(name, _)| !self.prior_properties().is_some_and(|p| p.contains_key(*name)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Properties present in both with different values
    pub fn changed_properties(&self) -> Vec<PropertyChange> {
        let Some(prior) = self.prior_properties() else {
            return Vec::new();
        };
        self.content
            .properties
            .iter()
            .filter_map(|(name, new)| match prior.get(name) {
                Some(old) if old != new => Some(PropertyChange {
                    name: name.clone(),
                    old: old.clone(),
                    new: new.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Properties present in the prior content but absent from content
    pub fn removed_properties(&self) -> Properties {
        let Some(prior) = self.prior_properties() else {
            return Properties::new();
        };
        prior
            .iter()
            .filter(|(name, _)| !self.content.properties.contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// The committed-store record this entry materializes into
    pub fn to_revisioned(&self) -> RevisionedNodeRepresentation {
        RevisionedNodeRepresentation::new(self.revision, self.content.clone())
    }

    /// Reference edges this entry adds (`Normal`) and retracts (`Deleted`)
    /// relative to `baseline`, the node as committed just below `revision`
    ///
    /// `prior` is the session's snapshot and can be older than `baseline`.
    pub fn inverse_references(&self, baseline: Option<&NodeRepresentation>) -> Vec<InverseNodeReference> {
        let before = baseline.map(|b| b.live_references()).unwrap_or_default();
        let after = self.content.live_references();
        reference_delta(self.path(), &before, &after)
    }
}

/// Inverse-reference rows turning edge set `before` into `after` for `source`
pub fn reference_delta(
    source: &Path,
    before: &BTreeSet<Path>,
    after: &BTreeSet<Path>,
) -> Vec<InverseNodeReference> {
    let added = after
        .iter()
        .map(|target| InverseNodeReference::new(target.clone(), source.clone(), NodeState::Normal));
    let retracted = before
        .difference(after)
        .map(|target| InverseNodeReference::new(target.clone(), source.clone(), NodeState::Deleted));
    added.chain(retracted).collect()
}

/// One edge of the reference graph, stored target-first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InverseNodeReference {
    /// The referenced node
    pub node_path: Path,
    /// The node holding the reference
    pub referring_node_path: Path,
    pub state: NodeState,
}

impl InverseNodeReference {
    pub fn new(node_path: Path, referring_node_path: Path, state: NodeState) -> Self {
        Self {
            node_path,
            referring_node_path,
            state,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == NodeState::Deleted
    }
}

/// Reference edge staged in a session's working area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingAreaInverseNodeReference {
    pub session_id: SessionId,
    pub reference: InverseNodeReference,
}

impl WorkingAreaInverseNodeReference {
    pub fn new(session_id: SessionId, reference: InverseNodeReference) -> Self {
        Self {
            session_id,
            reference,
        }
    }
}

/// Reference edge committed at a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedInverseNodeReference {
    pub revision: RevisionNumber,
    pub reference: InverseNodeReference,
}

impl CommittedInverseNodeReference {
    pub fn new(revision: RevisionNumber, reference: InverseNodeReference) -> Self {
        Self {
            revision,
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NodeReference;

    fn path(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    fn doc_type() -> NodeType {
        "acme:doc:1".parse().unwrap()
    }

    fn props(pairs: &[(&str, PropertyValue)]) -> Properties {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_name_follows_path() {
        let node = NodeRepresentation::new(path("/a/b"), doc_type(), Properties::new());
        assert_eq!(node.name, "b");
        assert_eq!(node.state, NodeState::Normal);
    }

    #[test]
    fn test_journal_entry_diff() {
        let prior = NodeRepresentation::new(
            path("/n"),
            doc_type(),
            props(&[
                ("keep", PropertyValue::Int(1)),
                ("change", PropertyValue::String("old".into())),
                ("drop", PropertyValue::Boolean(true)),
            ]),
        );
        let content = NodeRepresentation::new(
            path("/n"),
            doc_type(),
            props(&[
                ("keep", PropertyValue::Int(1)),
                ("change", PropertyValue::String("new".into())),
                ("fresh", PropertyValue::Long(7)),
            ]),
        );
        let entry = JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(3),
            prior: Some(prior),
            content,
        };

        let added = entry.added_properties();
        assert_eq!(added.keys().collect::<Vec<_>>(), vec!["fresh"]);

        let changed = entry.changed_properties();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "change");
        assert_eq!(changed[0].old, PropertyValue::String("old".into()));
        assert_eq!(changed[0].new, PropertyValue::String("new".into()));

        let removed = entry.removed_properties();
        assert_eq!(removed.keys().collect::<Vec<_>>(), vec!["drop"]);
    }

    #[test]
    fn test_new_node_has_only_additions() {
        let content = NodeRepresentation::new(
            path("/n"),
            doc_type(),
            props(&[("a", PropertyValue::Int(1))]),
        );
        let entry = JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(1),
            prior: None,
            content,
        };
        assert_eq!(entry.added_properties().len(), 1);
        assert!(entry.changed_properties().is_empty());
        assert!(entry.removed_properties().is_empty());
    }

    #[test]
    fn test_effective_representation_keeps_committed_identity() {
        let committed = NodeRepresentation::new(path("/n"), doc_type(), Properties::new());
        let mut edit = committed.clone();
        edit.properties.insert("x".into(), PropertyValue::Int(9));
        let wa = WorkingAreaNodeRepresentation::new(SessionId::new(), Some(committed), edit);

        let effective = wa.effective_node_representation();
        assert_eq!(effective.node_type, doc_type());
        assert_eq!(effective.property("x"), Some(&PropertyValue::Int(9)));
    }

    #[test]
    fn test_effective_representation_of_recreated_node() {
        let old_type: NodeType = "acme:old:1".parse().unwrap();
        let tomb = NodeRepresentation::new(path("/n"), old_type, Properties::new()).tombstone();
        let fresh = NodeRepresentation::new(path("/n"), doc_type(), Properties::new());
        let wa = WorkingAreaNodeRepresentation::new(SessionId::new(), Some(tomb), fresh.clone());
        assert_eq!(wa.effective_node_representation(), fresh);
    }

    #[test]
    fn test_inverse_references_track_added_and_retracted_edges() {
        let r = |s: &str| PropertyValue::Reference(NodeReference::new(path(s)));
        let prior = NodeRepresentation::new(path("/src"), doc_type(), props(&[("a", r("/x")), ("b", r("/y"))]));
        let content = NodeRepresentation::new(path("/src"), doc_type(), props(&[("a", r("/x")), ("c", r("/z"))]));
        let entry = JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(2),
            prior: Some(prior),
            content,
        };

        let rows = entry.inverse_references(entry.prior.as_ref());
        let normal: Vec<_> = rows.iter().filter(|r| !r.is_deleted()).map(|r| r.node_path.as_str()).collect();
        let deleted: Vec<_> = rows.iter().filter(|r| r.is_deleted()).map(|r| r.node_path.as_str()).collect();
        assert_eq!(normal, vec!["/x", "/z"]);
        assert_eq!(deleted, vec!["/y"]);
        assert!(rows.iter().all(|r| r.referring_node_path == path("/src")));
    }

    #[test]
    fn test_tombstone_retracts_every_edge() {
        let r = PropertyValue::Reference(NodeReference::new(path("/x")));
        let live = NodeRepresentation::new(path("/src"), doc_type(), props(&[("a", r)]));
        let entry = JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(2),
            prior: Some(live.clone()),
            content: live.tombstone(),
        };
        let rows = entry.inverse_references(entry.prior.as_ref());
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_deleted());
    }

    #[test]
    fn test_inverse_references_retract_baseline_edges_missing_from_prior() {
        let r = |s: &str| PropertyValue::Reference(NodeReference::new(path(s)));
        let snapshot = NodeRepresentation::new(path("/src"), doc_type(), props(&[("r", r("/x"))]));
        let committed = NodeRepresentation::new(path("/src"), doc_type(), props(&[("r", r("/y"))]));
        let entry = JournalEntryNodeRepresentation {
            session_id: SessionId::new(),
            revision: RevisionNumber::new(3),
            prior: Some(snapshot),
            content: NodeRepresentation::new(path("/src"), doc_type(), props(&[("r", r("/z"))])),
        };

        let rows = entry.inverse_references(Some(&committed));
        let deleted: Vec<_> = rows.iter().filter(|r| r.is_deleted()).map(|r| r.node_path.as_str()).collect();
        assert_eq!(deleted, vec!["/y"]);
        assert!(rows.iter().any(|r| r.node_path == path("/z") && !r.is_deleted()));
        assert!(rows.iter().all(|r| r.node_path != path("/x")));
    }
}
