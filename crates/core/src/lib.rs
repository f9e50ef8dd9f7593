//! Core data model for the arbor node store
//!
//! This crate provides:
//! - Identifiers: [`Path`], [`RevisionNumber`], [`NodeType`], [`SessionId`]
//! - The closed property-value union ([`PropertyValue`] and friends)
//! - Node representations for every storage tier (plain, revisioned,
//!   working area, journal entry, inverse reference)
//! - The crate-wide [`Error`] type
//! - BLAKE3 hashing used to locate binary payloads

pub mod error;
pub mod hash;
pub mod node_type;
pub mod path;
pub mod representation;
pub mod revision;
pub mod session;
pub mod value;

// Re-exports
pub use error::{Error, Result};
pub use hash::{hash_bytes, Blake3Hash};
pub use node_type::NodeType;
pub use path::Path;
pub use representation::{
    CommittedInverseNodeReference, InverseNodeReference, JournalEntryNodeRepresentation,
    NodeRepresentation, NodeState, PropertyChange, RevisionedNodeRepresentation,
    WorkingAreaInverseNodeReference, WorkingAreaNodeRepresentation, reference_delta,
};
pub use revision::RevisionNumber;
pub use session::{SessionId, SessionInfo};
pub use value::{
    BinaryReference, ListKind, NodeReference, ParameterizedNodeReference, Properties,
    PropertyValue, TypedList, referenced_paths,
};
