//! Repository and session handles

use crate::binary::{BinaryManagerService, MemoryBinaryManager};
use crate::cluster::{ClusterSynchronizationService, LocalClusterSync};
use crate::commit::{CommitProtocol, DEFAULT_LOCK_NAME};
use crate::config::{EngineConfig, StorageBackend};
use crate::metadata::{MetadataManager, NodeUpdate};
use crate::search::{NullSearchAdapter, SearchAdapter};
use anyhow::Context;
use arbor_core::{
    BinaryReference, Error, InverseNodeReference, NodeRepresentation, NodeType, Path, Properties,
    Result, RevisionNumber, SessionId, SessionInfo,
};
use arbor_store::adapter::record_stream;
use arbor_store::Partitions;
use bytes::Bytes;
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Assembles a [`Repository`] from partitions and services
pub struct RepositoryBuilder {
    partitions: Partitions,
    sync: Arc<dyn ClusterSynchronizationService>,
    binaries: Arc<dyn BinaryManagerService>,
    search: Arc<dyn SearchAdapter>,
    lock_name: String,
    root_node_type: NodeType,
}

impl RepositoryBuilder {
    pub fn new(partitions: Partitions) -> Self {
        Self {
            partitions,
            sync: Arc::new(LocalClusterSync::new()),
            binaries: Arc::new(MemoryBinaryManager::new()),
            search: Arc::new(NullSearchAdapter),
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            root_node_type: NodeType::root(),
        }
    }

    pub fn cluster(mut self, sync: Arc<dyn ClusterSynchronizationService>) -> Self {
        self.sync = sync;
        self
    }

    pub fn binaries(mut self, binaries: Arc<dyn BinaryManagerService>) -> Self {
        self.binaries = binaries;
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchAdapter>) -> Self {
        self.search = search;
        self
    }

    pub fn lock_name(mut self, lock_name: impl Into<String>) -> Self {
        self.lock_name = lock_name.into();
        self
    }

    pub fn root_node_type(mut self, node_type: NodeType) -> Self {
        self.root_node_type = node_type;
        self
    }

    /// Build without bootstrapping
    pub fn build(self) -> Repository {
        let metadata = MetadataManager::new(self.partitions.clone(), self.binaries.clone());
        let commit = CommitProtocol::new(
            self.partitions.clone(),
            self.sync.clone(),
            self.search,
            self.lock_name,
            self.root_node_type,
        );
        Repository {
            partitions: self.partitions,
            sync: self.sync,
            binaries: self.binaries,
            metadata: Arc::new(metadata),
            commit: Arc::new(commit),
        }
    }

    /// Build and bootstrap
    pub async fn open(self) -> Result<Repository> {
        let repository = self.build();
        repository.bootstrap().await?;
        Ok(repository)
    }
}

/// A node store: partitions plus the services that run commits
#[derive(Clone)]
pub struct Repository {
    partitions: Partitions,
    sync: Arc<dyn ClusterSynchronizationService>,
    binaries: Arc<dyn BinaryManagerService>,
    metadata: Arc<MetadataManager>,
    commit: Arc<CommitProtocol>,
}

impl Repository {
    pub fn builder(partitions: Partitions) -> RepositoryBuilder {
        RepositoryBuilder::new(partitions)
    }

    /// Open the repository described by `config`, bootstrapping it if new
    pub async fn open(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let partitions = match config.storage.backend {
            StorageBackend::Memory => Partitions::in_memory(),
            StorageBackend::Sled => {
                let dir = config
                    .storage
                    .path
                    .as_deref()
                    .context("storage.path is required for the sled backend")?;
                Partitions::sled(dir, config.storage.flush_on_commit)?
            }
        };
        Self::builder(partitions)
            .lock_name(config.repository.lock_name.clone())
            .root_node_type(config.root_node_type()?)
            .open()
            .await
    }

    /// In-memory repository with default services, bootstrapped
    pub async fn in_memory() -> Result<Self> {
        Self::builder(Partitions::in_memory()).open().await
    }

    /// Write the root node if the repository is new; see [`CommitProtocol::bootstrap`]
    pub async fn bootstrap(&self) -> Result<bool> {
        self.commit.bootstrap().await
    }

    pub async fn current_revision(&self) -> Result<RevisionNumber> {
        self.partitions
            .catalog
            .current_revision()
            .await?
            .ok_or(Error::NotBootstrapped)
    }

    /// Revisions with journal sets still pending
    pub async fn pending_revision(&self) -> Result<Option<RevisionNumber>> {
        self.partitions.journal.next_pending_revision().await
    }

    /// Apply journal sets left behind by an interrupted commit
    pub async fn recover(&self) -> Result<Vec<RevisionNumber>> {
        self.commit.recover().await
    }

    /// Open a session pinned at the current revision
    pub async fn login(&self, user: impl Into<String>) -> Result<Session> {
        let revision = self.current_revision().await?;
        self.login_at(user, revision).await
    }

    /// Open a session pinned at an earlier committed revision
    pub async fn login_at(&self, user: impl Into<String>, revision: RevisionNumber) -> Result<Session> {
        let current = self.current_revision().await?;
        if revision > current {
            return Err(Error::InvalidRevision(format!(
                "{} is ahead of current revision {}",
                revision, current
            )));
        }
        let info = SessionInfo::new(user, revision);
        self.sync.add_session_info(info.clone()).await?;
        debug!(session = %info.session_id, user = %info.user, revision = %info.revision, "session opened");
        Ok(Session {
            info,
            repository: self.clone(),
        })
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    pub fn commit_protocol(&self) -> &CommitProtocol {
        &self.commit
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterSynchronizationService> {
        &self.sync
    }
}

/// A user's view of the repository
///
/// Reads see the session's own pending edits over the committed tier at the
/// pinned revision. Edits stay private until [`Session::commit`].
pub struct Session {
    info: SessionInfo,
    repository: Repository,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.info.session_id
    }

    pub fn user(&self) -> &str {
        &self.info.user
    }

    /// Committed revision this session reads at
    pub fn revision(&self) -> RevisionNumber {
        self.info.revision
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    fn metadata(&self) -> &MetadataManager {
        &self.repository.metadata
    }

    pub async fn node(&self, path: &Path) -> Result<Option<NodeRepresentation>> {
        self.metadata().node_representation(&self.info, path).await
    }

    pub async fn children(&self, path: &Path) -> Result<Vec<NodeRepresentation>> {
        self.metadata().children_of(&self.info, path).await
    }

    pub async fn referrers(&self, path: &Path) -> Result<Vec<NodeRepresentation>> {
        self.metadata().referring_nodes(&self.info, path).await
    }

    pub async fn references_to(&self, path: &Path) -> Result<Vec<InverseNodeReference>> {
        self.metadata().references_to(&self.info, path).await
    }

    pub async fn create_node(
        &self,
        parent: &Path,
        name: &str,
        node_type: NodeType,
        properties: Properties,
    ) -> Result<NodeRepresentation> {
        self.metadata()
            .create_node(&self.info, parent, name, node_type, properties)
            .await
    }

    pub async fn update_node(&self, path: &Path, update: NodeUpdate) -> Result<NodeRepresentation> {
        self.metadata().update_node(&self.info, path, update).await
    }

    pub async fn delete_node(&self, path: &Path) -> Result<()> {
        self.metadata().delete_node(&self.info, path).await
    }

    /// Store a payload and return the reference to put in a property
    pub async fn upload(&self, content: Bytes) -> Result<BinaryReference> {
        let length = content.len() as u64;
        self.repository
            .binaries
            .create_file(record_stream(vec![content]), Some(length))
            .await
    }

    pub async fn read_binary(&self, reference: &BinaryReference) -> Result<Option<Bytes>> {
        self.repository.binaries.read(reference).await
    }

    /// Paths with uncommitted edits, ordered by path
    pub async fn pending_paths(&self) -> Result<Vec<Path>> {
        let staged: Vec<_> = self
            .repository
            .partitions
            .working_area
            .all_for(self.id())
            .try_collect()
            .await?;
        Ok(staged.into_iter().map(|edit| edit.working.path).collect())
    }

    /// Commit pending edits; `None` if there were none
    ///
    /// Afterwards the session reads at the repository's current revision.
    pub async fn commit(&mut self) -> Result<Option<RevisionNumber>> {
        let committed = self.repository.commit.commit_session(self.id()).await?;
        self.info.revision = self.repository.current_revision().await?;
        self.repository
            .sync
            .update_session_info(self.info.clone())
            .await?;
        Ok(committed)
    }

    /// Re-pin to the current revision, keeping pending edits
    pub async fn refresh(&mut self) -> Result<RevisionNumber> {
        self.info.revision = self.repository.current_revision().await?;
        self.repository
            .sync
            .update_session_info(self.info.clone())
            .await?;
        Ok(self.info.revision)
    }

    /// Discard pending edits and leave the registry
    pub async fn close(self) -> Result<()> {
        let partitions = &self.repository.partitions;
        partitions.working_area.delete_all_for(self.id()).await?;
        partitions.working_index.delete_all_for(self.id()).await?;
        self.repository.sync.remove_session_info(self.id()).await?;
        info!(session = %self.id(), "session closed");
        Ok(())
    }
}
