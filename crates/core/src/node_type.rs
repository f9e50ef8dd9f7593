//! Node schema tags

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A node's `namespace:name:version` type tag
///
/// Only the shape is checked; there is no schema behind the tag.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeType {
    namespace: String,
    name: String,
    version: String,
}

impl NodeType {
    pub fn new(namespace: &str, name: &str, version: &str) -> Result<Self> {
        let parts = [namespace, name, version];
        if parts.iter().any(|p| p.is_empty() || p.contains(':')) {
            return Err(Error::InvalidNodeType(parts.join(":")));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Type tag of the bootstrap root node
    pub fn root() -> Self {
        Self {
            namespace: "arbor".to_string(),
            name: "root".to_string(),
            version: "1".to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [namespace, name, version] => NodeType::new(namespace, name, version),
            _ => Err(Error::InvalidNodeType(s.to_string())),
        }
    }
}

impl TryFrom<String> for NodeType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        node_type.to_string()
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.version)
    }
}
