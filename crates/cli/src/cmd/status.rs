//! Show repository status

use crate::util::{self, ARBOR_DIR};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(repo: Option<&Path>) -> Result<()> {
    let root = util::find_repo_root(repo).context("Failed to find repository")?;
    let config = util::load_config(&root)?;
    let repository = util::open_repository(&root).await?;

    let revision = repository.current_revision().await?;
    let pending = repository.pending_revision().await?;
    let size = util::dir_size(&root.join(ARBOR_DIR))?;

    println!("{}", "Repository Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Repository:    {}", root.display().to_string().cyan());
    println!("Root type:     {}", config.repository.root_node_type);
    println!("Revision:      {}", revision.to_string().yellow());
    print!("Journal:       ");
    match pending {
        Some(pending) => {
            println!("{} {}", "pending set at".yellow(), pending.to_string().yellow());
            println!("  {}", "Tip: Apply it with 'arbor recover'".dimmed());
        }
        None => println!("{}", "clean ✓".green()),
    }
    println!("Storage:       {}", util::format_size(size));
    Ok(())
}
