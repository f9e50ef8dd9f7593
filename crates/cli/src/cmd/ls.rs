//! List the children of a node

use crate::util;
use anyhow::{Context, Result};
use arbor_core::RevisionNumber;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(
    repo: Option<&Path>,
    user: &str,
    path: &str,
    revision: Option<RevisionNumber>,
    json: bool,
) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let path = util::parse_path(path)?;

    let repository = util::open_repository(&root).await?;
    let session = match revision {
        Some(revision) => repository.login_at(user, revision).await?,
        None => repository.login(user).await?,
    };
    if session.node(&path).await?.is_none() {
        session.close().await?;
        anyhow::bail!("Node not found: {}", path);
    }
    let children = session.children(&path).await?;
    session.close().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&children)?);
        return Ok(());
    }
    if children.is_empty() {
        println!("{}", "(no children)".dimmed());
        return Ok(());
    }
    for child in &children {
        println!(
            "{}  {}  {}",
            child.name.cyan(),
            child.node_type.to_string().dimmed(),
            format!("{} properties", child.properties.len()).dimmed()
        );
    }
    Ok(())
}
