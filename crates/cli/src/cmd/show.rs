//! Show a node

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
    let node = session.node(&path).await?;
    let at = session.revision();
    session.close().await?;

    let node = node.with_context(|| format!("Node not found: {} at revision {}", path, at))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&node)?);
        return Ok(());
    }

    util::print_node(&node);
    println!("{} {}", "Revision:".dimmed(), at.to_string().yellow());
    Ok(())
}
