//! List the nodes that refer to a node

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(repo: Option<&Path>, user: &str, path: &str) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let path = util::parse_path(path)?;

    let repository = util::open_repository(&root).await?;
    let session = repository.login(user).await?;
    let referrers = session.referrers(&path).await?;
    session.close().await?;

    if referrers.is_empty() {
        println!("{}", format!("Nothing refers to {}", path).dimmed());
        return Ok(());
    }
    println!("{} ({})", "Referred to by".bold(), referrers.len());
    for node in &referrers {
        let via: Vec<&str> = node
            .properties
            .iter()
            .filter(|(_, value)| value.references().iter().any(|r| r.path == path))
            .map(|(name, _)| name.as_str())
            .collect();
        println!("  {}  {}", node.path.to_string().cyan(), via.join(", ").dimmed());
    }
    Ok(())
}
