//! Key/value storage shim for episode logs.
//!
//! Persistence is strictly best-effort: callers go through [`persist_episode_best_effort`] and
//! friends, which log failures and carry on with in-memory state.

use crate::error::{Result, SessionError};
use crate::history::QueryRecord;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key under `root`. File names are content hashes of the key, so session
/// ids never touch the path.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.trim().is_empty() {
            return Err(SessionError::InvalidKey("empty key".to_string()));
        }
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        Ok(self.root.join(format!("{name}.json")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn episode_key(session_id: &str) -> String {
    format!("episodes/{session_id}")
}

pub async fn load_episodes(store: &dyn SessionStore, session_id: &str) -> Result<Vec<QueryRecord>> {
    match store.get(&episode_key(session_id)).await? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(Vec::new()),
    }
}

async fn append_episode(
    store: &dyn SessionStore,
    session_id: &str,
    record: &QueryRecord,
    cap: usize,
) -> Result<()> {
    // A corrupt log is replaced rather than blocking new episodes.
    let mut episodes = load_episodes(store, session_id).await.unwrap_or_default();
    episodes.push(record.clone());
    let overflow = episodes.len().saturating_sub(cap.max(1));
    episodes.drain(..overflow);
    store
        .set(&episode_key(session_id), serde_json::to_vec(&episodes)?)
        .await
}

/// Append `record` to the session's episode log, keeping the newest `cap` entries.
pub async fn persist_episode_best_effort(
    store: &dyn SessionStore,
    session_id: &str,
    record: &QueryRecord,
    cap: usize,
) {
    if let Err(err) = append_episode(store, session_id, record, cap).await {
        log::warn!("episode log for session {session_id} not persisted: {err}");
    }
}

pub async fn clear_episodes_best_effort(store: &dyn SessionStore, session_id: &str) {
    if let Err(err) = store.set(&episode_key(session_id), b"[]".to_vec()).await {
        log::warn!("episode log for session {session_id} not cleared: {err}");
    }
}
