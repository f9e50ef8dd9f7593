//! Apply journal sets left by an interrupted commit

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(repo: Option<&Path>) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let repository = util::open_repository(&root).await?;

    let applied = repository
        .recover()
        .await
        .context("Failed to apply pending journal sets")?;
    if applied.is_empty() {
        println!("{}", "Nothing to recover".dimmed());
        return Ok(());
    }
    for revision in &applied {
        println!("{} Applied journal set {}", "✓".green(), revision.to_string().yellow());
    }
    println!("Revision: {}", repository.current_revision().await?);
    Ok(())
}
