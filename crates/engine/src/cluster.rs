//! Cluster-wide mutual exclusion and the session registry

use arbor_core::{Result, SessionId, SessionInfo};
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Proof of holding a named global lock; released on drop
pub struct GlobalLockGuard {
    name: String,
    _held: Box<dyn Send + Sync>,
}

impl GlobalLockGuard {
    /// Wrap a backend-specific guard
    pub fn new(name: impl Into<String>, held: impl Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            _held: Box::new(held),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for GlobalLockGuard {
    fn drop(&mut self) {
        debug!(lock = %self.name, "global lock released");
    }
}

/// Global locking plus the session registry
///
/// Lock acquisition is try-once: a held lock yields `None`, never a wait.
#[async_trait]
pub trait ClusterSynchronizationService: Send + Sync {
    async fn try_acquire(&self, name: &str) -> Result<Option<GlobalLockGuard>>;

    async fn add_session_info(&self, info: SessionInfo) -> Result<()>;

    async fn update_session_info(&self, info: SessionInfo) -> Result<()>;

    async fn get_session_info(&self, session_id: SessionId) -> Result<Option<SessionInfo>>;

    async fn remove_session_info(&self, session_id: SessionId) -> Result<()>;
}

/// Run `f` while holding the global lock `name`
///
/// Returns `Ok(None)` without running `f` if the lock is held elsewhere.
pub async fn try_with_global_lock<F, Fut, T>(
    sync: &dyn ClusterSynchronizationService,
    name: &str,
    f: F,
) -> Result<Option<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let Some(guard) = sync.try_acquire(name).await? else {
        debug!(lock = %name, "global lock busy");
        return Ok(None);
    };
    let result = f().await;
    drop(guard);
    result.map(Some)
}

/// Single-process synchronization service
///
/// Locks are tokio mutexes looked up by name; the registry is a concurrent map.
#[derive(Default)]
pub struct LocalClusterSync {
    locks: DashMap<String, Arc<Mutex<()>>>,
    sessions: DashMap<SessionId, SessionInfo>,
}

impl LocalClusterSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl ClusterSynchronizationService for LocalClusterSync {
    async fn try_acquire(&self, name: &str) -> Result<Option<GlobalLockGuard>> {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        Ok(lock
            .try_lock_owned()
            .ok()
            .map(|held| GlobalLockGuard::new(name, held)))
    }

    async fn add_session_info(&self, info: SessionInfo) -> Result<()> {
        self.sessions.insert(info.session_id, info);
        Ok(())
    }

    async fn update_session_info(&self, info: SessionInfo) -> Result<()> {
        self.sessions.insert(info.session_id, info);
        Ok(())
    }

    async fn get_session_info(&self, session_id: SessionId) -> Result<Option<SessionInfo>> {
        Ok(self.sessions.get(&session_id).map(|info| info.clone()))
    }

    async fn remove_session_info(&self, session_id: SessionId) -> Result<()> {
        self.sessions.remove(&session_id);
        Ok(())
    }
}
