//! Error type shared by every arbor crate

use crate::path::Path;
use crate::revision::RevisionNumber;

/// Result type for arbor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the node store
///
/// The four `Node*` variants are refusals of a requested mutation; they never
/// leave partial state behind for the operation that raised them. Backend
/// failures travel through [`Error::Adapter`] untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Target node, or one of its ancestors, does not exist
    #[error("node not found: {0}")]
    NodeNotFound(Path),

    /// Node could not be created
    #[error("cannot create node {path}: {reason}")]
    NodeCreation { path: Path, reason: String },

    /// Node could not be updated
    #[error("cannot modify node {path}: {reason}")]
    NodeModification { path: Path, reason: String },

    /// Node could not be deleted
    #[error("cannot delete node {path}: {reason}")]
    NodeDeletion { path: Path, reason: String },

    /// A journal batch named the same path twice
    #[error("journal batch for revision {revision} contains {path} more than once")]
    DuplicateJournalPath {
        revision: RevisionNumber,
        path: Path,
    },

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("invalid node type '{0}': expected namespace:name:version")]
    InvalidNodeType(String),

    #[error("invalid revision number '{0}'")]
    InvalidRevision(String),

    /// A property value violates the value-model rules
    #[error("invalid property '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    /// The catalog holds no revision yet
    #[error("repository has not been bootstrapped")]
    NotBootstrapped,

    /// The named global lock is held by someone else
    #[error("global lock '{0}' is held by another committer")]
    LockHeld(String),

    /// Storage or service backend failure
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

impl Error {
    /// True for the four mutation-refusal kinds
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Error::NodeNotFound(_)
                | Error::NodeCreation { .. }
                | Error::NodeModification { .. }
                | Error::NodeDeletion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_is_transparent() {
        let err: Error = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.to_string(), "disk on fire");
        assert!(!err.is_refusal());
    }

    #[test]
    fn test_refusal_kinds() {
        let path = Path::root();
        assert!(Error::NodeNotFound(path.clone()).is_refusal());
        assert!(Error::NodeDeletion {
            path,
            reason: "root".into()
        }
        .is_refusal());
        assert!(!Error::NotBootstrapped.is_refusal());
    }
}
