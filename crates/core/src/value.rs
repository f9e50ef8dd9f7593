//! Property values
//!
//! A node's data is a map from property name to [`PropertyValue`], a closed
//! union of scalars, homogeneous typed lists, node references (plain or
//! parameterized) and binary references. Every read/write/validate boundary
//! matches on it exhaustively.

use crate::error::{Error, Result};
use crate::path::Path;
use crate::revision::RevisionNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A node's property map, ordered by name
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    List(TypedList),
    Reference(NodeReference),
    ParameterizedReference(ParameterizedNodeReference),
    Binary(BinaryReference),
}

/// Element kind of a [`TypedList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    String,
    Int,
    Long,
    Double,
    Boolean,
    Date,
    Reference,
    ParameterizedReference,
    Binary,
}

impl PropertyValue {
    /// Element kind this value would have inside a list; `None` for lists
    pub fn kind(&self) -> Option<ListKind> {
        match self {
            PropertyValue::String(_) => Some(ListKind::String),
            PropertyValue::Int(_) => Some(ListKind::Int),
            PropertyValue::Long(_) => Some(ListKind::Long),
            PropertyValue::Double(_) => Some(ListKind::Double),
            PropertyValue::Boolean(_) => Some(ListKind::Boolean),
            PropertyValue::Date(_) => Some(ListKind::Date),
            PropertyValue::Reference(_) => Some(ListKind::Reference),
            PropertyValue::ParameterizedReference(_) => Some(ListKind::ParameterizedReference),
            PropertyValue::Binary(_) => Some(ListKind::Binary),
            PropertyValue::List(_) => None,
        }
    }

    /// Check the value-model rules for a property called `name`
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            PropertyValue::String(_)
            | PropertyValue::Int(_)
            | PropertyValue::Long(_)
            | PropertyValue::Double(_)
            | PropertyValue::Boolean(_)
            | PropertyValue::Date(_)
            | PropertyValue::Reference(_)
            | PropertyValue::Binary(_) => Ok(()),
            PropertyValue::List(list) => list.check(name),
            PropertyValue::ParameterizedReference(param) => {
                check_auxiliary(name, &param.properties)
            }
        }
    }

    /// Node references carried by this value, including list elements
    pub fn references(&self) -> Vec<&NodeReference> {
        match self {
            PropertyValue::Reference(reference) => vec![reference],
            PropertyValue::ParameterizedReference(param) => vec![&param.reference],
            PropertyValue::List(list) => list.items.iter().flat_map(|v| v.references()).collect(),
            PropertyValue::String(_)
            | PropertyValue::Int(_)
            | PropertyValue::Long(_)
            | PropertyValue::Double(_)
            | PropertyValue::Boolean(_)
            | PropertyValue::Date(_)
            | PropertyValue::Binary(_) => Vec::new(),
        }
    }

    /// Binary references carried by this value, including list elements
    pub fn binaries(&self) -> Vec<&BinaryReference> {
        match self {
            PropertyValue::Binary(binary) => vec![binary],
            PropertyValue::List(list) => list.items.iter().flat_map(|v| v.binaries()).collect(),
            PropertyValue::String(_)
            | PropertyValue::Int(_)
            | PropertyValue::Long(_)
            | PropertyValue::Double(_)
            | PropertyValue::Boolean(_)
            | PropertyValue::Date(_)
            | PropertyValue::Reference(_)
            | PropertyValue::ParameterizedReference(_) => Vec::new(),
        }
    }

    /// Short tag for display
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Int(_) => "int",
            PropertyValue::Long(_) => "long",
            PropertyValue::Double(_) => "double",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Date(_) => "date",
            PropertyValue::List(_) => "list",
            PropertyValue::Reference(_) => "reference",
            PropertyValue::ParameterizedReference(_) => "parameterized-reference",
            PropertyValue::Binary(_) => "binary",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{:?}", s),
            PropertyValue::Int(n) => write!(f, "{}", n),
            PropertyValue::Long(n) => write!(f, "{}L", n),
            PropertyValue::Double(n) => write!(f, "{}", n),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            PropertyValue::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            PropertyValue::Reference(r) => write!(f, "{}", r),
            PropertyValue::ParameterizedReference(p) => {
                write!(f, "{} {{", p.reference)?;
                for (i, (k, v)) in p.properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            PropertyValue::Binary(b) => write!(f, "binary:{}", b.locator),
        }
    }
}

/// Homogeneous list tagged with its element kind
///
/// Lists do not nest. An empty list still carries its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedList {
    kind: ListKind,
    items: Vec<PropertyValue>,
}

impl TypedList {
    pub fn new(kind: ListKind, items: Vec<PropertyValue>) -> Result<Self> {
        let list = Self { kind, items };
        list.check("list")?;
        Ok(list)
    }

    pub fn empty(kind: ListKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn items(&self) -> &[PropertyValue] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn check(&self, name: &str) -> Result<()> {
        for item in &self.items {
            match item.kind() {
                Some(kind) if kind == self.kind => item.validate(name)?,
                Some(kind) => {
                    return Err(Error::InvalidProperty {
                        name: name.to_string(),
                        reason: format!("{:?} element in {:?} list", kind, self.kind),
                    })
                }
                None => {
                    return Err(Error::InvalidProperty {
                        name: name.to_string(),
                        reason: "lists cannot be nested".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Reference to another node, optionally pinned to a committed revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeReference {
    pub path: Path,
    pub revision: Option<RevisionNumber>,
}

impl NodeReference {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            revision: None,
        }
    }

    pub fn pinned(path: Path, revision: RevisionNumber) -> Self {
        Self {
            path,
            revision: Some(revision),
        }
    }
}

impl fmt::Display for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(rev) => write!(f, "-> {}@{}", self.path, rev),
            None => write!(f, "-> {}", self.path),
        }
    }
}

/// Node reference carrying auxiliary scalar properties
///
/// The auxiliary map may not hold references, binaries, or lists of either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterizedNodeReference {
    pub reference: NodeReference,
    properties: Properties,
}

impl ParameterizedNodeReference {
    pub fn new(reference: NodeReference, properties: Properties) -> Result<Self> {
        check_auxiliary("parameters", &properties)?;
        Ok(Self {
            reference,
            properties,
        })
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

fn check_auxiliary(name: &str, properties: &Properties) -> Result<()> {
    for (key, value) in properties {
        let forbidden = match value {
            PropertyValue::Reference(_)
            | PropertyValue::ParameterizedReference(_)
            | PropertyValue::Binary(_) => true,
            PropertyValue::List(list) => matches!(
                list.kind,
                ListKind::Reference | ListKind::ParameterizedReference | ListKind::Binary
            ),
            PropertyValue::String(_)
            | PropertyValue::Int(_)
            | PropertyValue::Long(_)
            | PropertyValue::Double(_)
            | PropertyValue::Boolean(_)
            | PropertyValue::Date(_) => false,
        };
        if forbidden {
            return Err(Error::InvalidProperty {
                name: name.to_string(),
                reason: format!(
                    "parameter '{}' holds a {} value; only scalars are allowed",
                    key,
                    value.type_name()
                ),
            });
        }
        value.validate(name)?;
    }
    Ok(())
}

/// Opaque locator of a stored binary payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryReference {
    locator: String,
}

impl BinaryReference {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

/// Distinct target paths of every node reference in `properties`
pub fn referenced_paths(properties: &Properties) -> BTreeSet<Path> {
    properties
        .values()
        .flat_map(|v| v.references())
        .map(|r| r.path.clone())
        .collect()
}
