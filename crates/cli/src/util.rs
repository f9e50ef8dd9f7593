//! Shared utilities for CLI commands

use anyhow::{anyhow, bail, Context, Result};
use arbor_core::{
    NodeReference, NodeRepresentation, Path as NodePath, Properties, PropertyValue,
    RevisionNumber, TypedList,
};
use arbor_engine::{EngineConfig, Repository};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

pub const ARBOR_DIR: &str = ".arbor";
pub const CONFIG_FILE: &str = "arbor.toml";
/// Database directory, relative to `.arbor/`
pub const DB_DIR: &str = "db";

/// Find the repository root: `explicit` if given, else walk up from cwd to find .arbor/
pub fn find_repo_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        if root.join(ARBOR_DIR).join(CONFIG_FILE).is_file() {
            return Ok(root.to_path_buf());
        }
        bail!("Not an arbor repository: {}", root.display());
    }

    let mut current = std::env::current_dir().context("Failed to get current directory")?;
    loop {
        if current.join(ARBOR_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => bail!("Not an arbor repository (no .arbor directory found)"),
        }
    }
}

/// Load `.arbor/arbor.toml`, resolving a relative storage path against `.arbor/`
pub fn load_config(root: &Path) -> Result<EngineConfig> {
    let arbor_dir = root.join(ARBOR_DIR);
    let mut config = EngineConfig::load(&arbor_dir.join(CONFIG_FILE))?;
    if let Some(path) = config.storage.path.take() {
        config.storage.path = Some(if path.is_relative() { arbor_dir.join(path) } else { path });
    }
    Ok(config)
}

pub async fn open_repository(root: &Path) -> Result<Repository> {
    let config = load_config(root)?;
    Repository::open(&config)
        .await
        .with_context(|| format!("Failed to open repository at {}", root.display()))
}

pub fn parse_path(raw: &str) -> Result<NodePath> {
    NodePath::new(raw).with_context(|| format!("Invalid node path '{}'", raw))
}

/// Parse `key=value` arguments into a property map
pub fn parse_properties(args: &[String]) -> Result<Properties> {
    let mut properties = Properties::new();
    for arg in args {
        let (key, value) = parse_property(arg)?;
        if properties.insert(key.clone(), value).is_some() {
            bail!("Property '{}' given more than once", key);
        }
    }
    Ok(properties)
}

pub fn parse_property(arg: &str) -> Result<(String, PropertyValue)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got '{}'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Empty property name in '{}'", arg);
    }
    let value = parse_value(raw).with_context(|| format!("Invalid value for '{}'", key))?;
    value.validate(key)?;
    Ok((key.to_string(), value))
}

/// Parse a value written the way `PropertyValue` displays
///
/// - `"text"`: string, quotes stripped
/// - `@/path` or `@/path@rev`: reference, optionally pinned (rev in hex)
/// - `true` / `false`: boolean
/// - `42`: int (long if it does not fit), `42L`: long
/// - `1.5`: double
/// - RFC 3339 timestamp: date
/// - `[a, b, ...]`: homogeneous list of the above
/// - anything else: string
///
/// Binary references have no syntax: payloads live in the process that
/// uploaded them.
pub fn parse_value(raw: &str) -> Result<PropertyValue> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return parse_list(inner);
    }
    parse_scalar(raw)
}

fn parse_list(inner: &str) -> Result<PropertyValue> {
    if inner.trim().is_empty() {
        bail!("Empty lists have no element type");
    }
    let items = inner
        .split(',')
        .map(|item| parse_scalar(item.trim()))
        .collect::<Result<Vec<_>>>()?;
    let kind = items[0]
        .kind()
        .ok_or_else(|| anyhow!("Lists cannot be nested"))?;
    Ok(PropertyValue::List(TypedList::new(kind, items)?))
}

fn parse_scalar(raw: &str) -> Result<PropertyValue> {
    if let Some(quoted) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(PropertyValue::String(quoted.to_string()));
    }
    if let Some(target) = raw.strip_prefix('@') {
        return parse_reference(target).map(PropertyValue::Reference);
    }
    match raw {
        "true" => return Ok(PropertyValue::Boolean(true)),
        "false" => return Ok(PropertyValue::Boolean(false)),
        _ => {}
    }
    if let Some(long) = raw.strip_suffix('L').and_then(|n| n.parse::<i64>().ok()) {
        return Ok(PropertyValue::Long(long));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(i32::try_from(n).map_or(PropertyValue::Long(n), PropertyValue::Int));
    }
    // "inf" and "nan" stay strings
    if raw.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(x) = raw.parse::<f64>() {
            return Ok(PropertyValue::Double(x));
        }
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(PropertyValue::Date(date.with_timezone(&Utc)));
    }
    Ok(PropertyValue::String(raw.to_string()))
}

fn parse_reference(target: &str) -> Result<NodeReference> {
    if let Some((path, revision)) = target.rsplit_once('@') {
        let revision: RevisionNumber = revision
            .parse()
            .with_context(|| format!("Invalid pinned revision in '@{}'", target))?;
        return Ok(NodeReference::pinned(parse_path(path)?, revision));
    }
    Ok(NodeReference::new(parse_path(target)?))
}

/// Print a node as a header line plus one line per property
pub fn print_node(node: &NodeRepresentation) {
    println!("{} {}", node.path.to_string().cyan().bold(), node.node_type.to_string().dimmed());
    if node.properties.is_empty() {
        println!("  {}", "(no properties)".dimmed());
        return;
    }
    let width = node.properties.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &node.properties {
        println!("  {:width$}  {}", name, value, width = width);
    }
}

/// Format bytes in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

/// Total size of the files under `dir`
pub fn dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut total = 0;
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path)?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
