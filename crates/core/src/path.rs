//! Slash-delimited node paths

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Location of a node in the tree
///
/// Always absolute: `/` is the root, `/a/b` is child `b` of `/a`. Ordering is
/// plain lexicographic ordering of the string form.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path(String);

impl Path {
    /// The root path `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and validate a path
    ///
    /// Rejects empty strings, relative paths, empty segments (`//`), a
    /// trailing slash, `.`/`..` segments and NUL bytes.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw == "/" {
            return Ok(Self(raw));
        }
        if !raw.starts_with('/') || raw.ends_with('/') || raw.contains('\0') {
            return Err(Error::InvalidPath(raw));
        }
        if raw[1..].split('/').any(|seg| !is_valid_segment(seg)) {
            return Err(Error::InvalidPath(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Path::root()),
            Some(idx) => Some(Path(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Path of the child called `name`
    pub fn child(&self, name: &str) -> Result<Path> {
        if !is_valid_segment(name) {
            return Err(Error::InvalidPath(format!("{}/{}", self.0.trim_end_matches('/'), name)));
        }
        if self.is_root() {
            Ok(Path(format!("/{}", name)))
        } else {
            Ok(Path(format!("{}/{}", self.0, name)))
        }
    }

    /// Last segment; empty for the root
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Number of segments below the root
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// True if `self` equals `ancestor` or lies somewhere beneath it
    pub fn is_at_or_below(&self, ancestor: &Path) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// True if `self` is a direct child of `parent`
    pub fn is_child_of(&self, parent: &Path) -> bool {
        self.parent().as_ref() == Some(parent)
    }

    /// Byte prefix shared by every strict descendant (`/a/` for `/a`, `/` for root)
    pub fn descendant_prefix(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("{}/", self.0)
        }
    }
}

fn is_valid_segment(seg: &str) -> bool {
    !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('/') && !seg.contains('\0')
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::new(s)
    }
}

impl TryFrom<String> for Path {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Path::new(value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}

impl Borrow<str> for Path {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
