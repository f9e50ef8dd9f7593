//! Create a node

use crate::util;
use anyhow::{anyhow, Context, Result};
use arbor_core::NodeType;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(
    repo: Option<&Path>,
    user: &str,
    path: &str,
    node_type: &str,
    properties: &[String],
) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let path = util::parse_path(path)?;
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("The root node already exists"))?;
    let node_type: NodeType = node_type
        .parse()
        .with_context(|| format!("Invalid node type '{}'", node_type))?;
    let properties = util::parse_properties(properties)?;

    let repository = util::open_repository(&root).await?;
    let mut session = repository.login(user).await?;
    let node = session
        .create_node(&parent, path.name(), node_type, properties)
        .await
        .with_context(|| format!("Failed to create {}", path))?;
    let revision = session.commit().await?;
    session.close().await?;

    println!("{} Created {}", "✓".green(), node.path.to_string().cyan());
    if let Some(revision) = revision {
        println!("  Revision:  {}", revision.to_string().yellow());
    }
    Ok(())
}
