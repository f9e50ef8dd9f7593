//! Engine configuration (`arbor.toml`)

use crate::commit::DEFAULT_LOCK_NAME;
use anyhow::{bail, Context, Result};
use arbor_core::NodeType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub repository: RepositoryConfig,
    pub storage: StorageConfig,
}

/// `[repository]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Name of the global lock guarding bootstrap and commits
    pub lock_name: String,
    /// Type of the root node written at bootstrap
    pub root_node_type: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            root_node_type: NodeType::root().to_string(),
        }
    }
}

/// Where the committed tier lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory; required for `sled`
    pub path: Option<PathBuf>,
    /// Flush every committed-tier write before acknowledging it
    pub flush_on_commit: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            flush_on_commit: true,
        }
    }
}

impl EngineConfig {
    /// In-memory repository with defaults
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sled-backed repository rooted at `dir`
    pub fn sled(dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Sled,
                path: Some(dir.into()),
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.repository.lock_name.trim().is_empty() {
            bail!("repository.lock_name must not be empty");
        }
        self.root_node_type()?;
        if self.storage.backend == StorageBackend::Sled && self.storage.path.is_none() {
            bail!("storage.path is required for the sled backend");
        }
        Ok(())
    }

    pub fn root_node_type(&self) -> Result<NodeType> {
        self.repository
            .root_node_type
            .parse()
            .with_context(|| format!("repository.root_node_type '{}'", self.repository.root_node_type))
    }
}
