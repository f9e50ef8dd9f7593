//! Initialize a repository

use crate::util::{self, ARBOR_DIR, CONFIG_FILE, DB_DIR};
use anyhow::{bail, Context, Result};
use arbor_engine::EngineConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(path: Option<PathBuf>, root_type: Option<String>) -> Result<()> {
    let root = match path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let arbor_dir = root.join(ARBOR_DIR);
    let config_path = arbor_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("Already an arbor repository: {}", root.display());
    }

    let mut config = EngineConfig::sled(DB_DIR);
    if let Some(root_type) = root_type {
        config.repository.root_node_type = root_type;
    }
    config.validate()?;

    std::fs::create_dir_all(&arbor_dir)
        .with_context(|| format!("Failed to create {}", arbor_dir.display()))?;
    config.save(&config_path)?;

    let repo = util::open_repository(&root).await?;
    let revision = repo.current_revision().await?;

    println!("{} Initialized arbor repository", "✓".green());
    println!("  Root:      {}", root.display().to_string().cyan());
    println!("  Config:    {}", config_path.display().to_string().dimmed());
    println!("  Revision:  {}", revision.to_string().yellow());
    Ok(())
}
