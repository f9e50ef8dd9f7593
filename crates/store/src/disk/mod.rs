//! Durable committed-tier partitions on sled
//!
//! One sled database holds four trees:
//! ```text
//! nodes       <path> 0x00 <revision:16 BE>                  -> NodeRepresentation
//! journal     <revision:16 BE> <path>                       -> JournalEntryNodeRepresentation
//! catalog     "revision"                                    -> <revision:16 BE>
//! references  <target> 0x00 <source> 0x00 <revision:16 BE> -> NodeState
//! ```
//! Paths never contain NUL, and big-endian revisions sort numerically, so
//! prefix and range scans line up with the lookups the adapters need.
//! Values are bincode.

mod catalog;
mod data;
mod index;
mod journal;

pub use catalog::SledCatalog;
pub use data::SledDataPartition;
pub use index::SledCommittedIndex;
pub use journal::SledJournal;

use crate::adapter::{record_stream, RecordStream};
use anyhow::{Context, anyhow};
use arbor_core::{Path, Result, RevisionNumber};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path as FsPath;

const NODES_TREE: &str = "nodes";
const JOURNAL_TREE: &str = "journal";
const CATALOG_TREE: &str = "catalog";
const REFERENCES_TREE: &str = "references";

const REVISION_LEN: usize = 16;

/// Handle on the sled database backing the committed tier
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    flush_on_write: bool,
}

impl SledStore {
    /// Open or create a store under `dir`
    pub fn open(dir: &FsPath) -> Result<Self> {
        let db = sled::open(dir.join("arbor.db"))
            .with_context(|| format!("Failed to open sled store at {}", dir.display()))?;
        Ok(Self {
            db,
            flush_on_write: true,
        })
    }

    /// Throwaway store removed when dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("Failed to open temporary sled store")?;
        Ok(Self {
            db,
            flush_on_write: false,
        })
    }

    /// Whether every partition write is flushed before returning
    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    pub fn data_partition(&self) -> Result<SledDataPartition> {
        Ok(SledDataPartition::new(self.tree(NODES_TREE)?, self.flush_on_write))
    }

    pub fn journal(&self) -> Result<SledJournal> {
        Ok(SledJournal::new(self.tree(JOURNAL_TREE)?, self.flush_on_write))
    }

    pub fn catalog(&self) -> Result<SledCatalog> {
        Ok(SledCatalog::new(self.tree(CATALOG_TREE)?, self.flush_on_write))
    }

    pub fn committed_index(&self) -> Result<SledCommittedIndex> {
        Ok(SledCommittedIndex::new(self.tree(REFERENCES_TREE)?, self.flush_on_write))
    }

    /// Flush all trees to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.context("Failed to flush sled store")?;
        Ok(())
    }

    /// Bytes used on disk
    pub fn size_on_disk(&self) -> Result<u64> {
        Ok(self.db.size_on_disk().context("Failed to read sled store size")?)
    }

    fn tree(&self, name: &str) -> Result<sled::Tree> {
        Ok(self
            .db
            .open_tree(name)
            .with_context(|| format!("Failed to open sled tree {}", name))?)
    }
}

/// A sled tree plus its flush policy
#[derive(Clone)]
struct TreeHandle {
    tree: sled::Tree,
    flush_on_write: bool,
}

impl TreeHandle {
    async fn flush(&self) -> Result<()> {
        if self.flush_on_write {
            self.tree
                .flush_async()
                .await
                .context("Failed to flush sled tree")?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.tree.clear().context("Failed to clear sled tree")?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value).context("Failed to encode record")?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes).context("Failed to decode record")?)
}

fn path_from_bytes(bytes: &[u8]) -> Result<Path> {
    let raw = std::str::from_utf8(bytes).context("Non UTF-8 path in storage key")?;
    Path::new(raw)
}

/// Split `<prefix> 0x00 <revision:16>` from the end of a key
fn split_revision_suffix(key: &[u8]) -> Result<(&[u8], RevisionNumber)> {
    if key.len() < REVISION_LEN + 1 || key[key.len() - REVISION_LEN - 1] != 0 {
        return Err(anyhow!("Malformed storage key ({} bytes)", key.len()).into());
    }
    let (head, rev) = key.split_at(key.len() - REVISION_LEN);
    let rev: [u8; REVISION_LEN] = rev.try_into().context("Malformed revision suffix")?;
    Ok((&head[..head.len() - 1], RevisionNumber::from_be_bytes(rev)))
}

/// Turn an eagerly computed result into a record stream
fn materialize<T: Send + 'static>(records: Result<Vec<T>>) -> RecordStream<T> {
    match records {
        Ok(records) => record_stream(records),
        Err(err) => stream::once(async move { Err(err) }).boxed(),
    }
}
