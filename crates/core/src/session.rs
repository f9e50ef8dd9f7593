//! Session identifiers and registry records

use crate::revision::RevisionNumber;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique session ID (ULID for timestamp + uniqueness)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(Ulid);

impl SessionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// 16 bytes; used as a storage-key prefix
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry record for an open session
///
/// `revision` is the committed revision the session reads at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub user: String,
    pub revision: RevisionNumber,
}

impl SessionInfo {
    pub fn new(user: impl Into<String>, revision: RevisionNumber) -> Self {
        Self {
            session_id: SessionId::new(),
            user: user.into(),
            revision,
        }
    }
}
