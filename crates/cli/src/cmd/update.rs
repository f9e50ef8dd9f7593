//! Update a node

use crate::util;
use anyhow::{Context, Result};
use arbor_core::NodeType;
use arbor_engine::NodeUpdate;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(
    repo: Option<&Path>,
    user: &str,
    path: &str,
    node_type: Option<&str>,
    merge: bool,
    unset: &[String],
    properties: &[String],
) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let path = util::parse_path(path)?;
    let assigned = util::parse_properties(properties)?;
    let node_type: Option<NodeType> = node_type
        .map(|raw| raw.parse().with_context(|| format!("Invalid node type '{}'", raw)))
        .transpose()?;
    if !unset.is_empty() && !merge {
        anyhow::bail!("--unset requires --merge");
    }

    let repository = util::open_repository(&root).await?;
    let mut session = repository.login(user).await?;

    let properties = if merge {
        let mut current = session
            .node(&path)
            .await?
            .with_context(|| format!("Node not found: {}", path))?
            .properties;
        for key in unset {
            current.remove(key);
        }
        current.extend(assigned);
        current
    } else {
        assigned
    };

    let mut update = NodeUpdate::new(properties);
    if let Some(node_type) = node_type {
        update = update.with_node_type(node_type);
    }
    let node = session
        .update_node(&path, update)
        .await
        .with_context(|| format!("Failed to update {}", path))?;
    let revision = session.commit().await?;
    session.close().await?;

    println!("{} Updated {}", "✓".green(), node.path.to_string().cyan());
    if let Some(revision) = revision {
        println!("  Revision:  {}", revision.to_string().yellow());
    }
    Ok(())
}
