//! Delete a node and its subtree

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(repo: Option<&Path>, user: &str, path: &str) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let path = util::parse_path(path)?;

    let repository = util::open_repository(&root).await?;
    let mut session = repository.login(user).await?;
    session
        .delete_node(&path)
        .await
        .with_context(|| format!("Failed to delete {}", path))?;
    let removed = session.pending_paths().await?;
    let revision = session.commit().await?;
    session.close().await?;

    println!("{} Deleted {}", "✓".green(), path.to_string().cyan());
    if removed.len() > 1 {
        println!("  {}", format!("{} nodes removed", removed.len()).dimmed());
    }
    if let Some(revision) = revision {
        println!("  Revision:  {}", revision.to_string().yellow());
    }
    Ok(())
}
