use crate::util::{now_ms, random_id};
use relay_search::WorkspaceScanner;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub root: PathBuf,
    pub run_id: String,
    pub registered_at_ms: u64,
    pub file_count: usize,
    /// The scan stopped at the configured file ceiling.
    pub truncated: bool,
}

/// Cloneable so that every waiter on a deduplicated bootstrap sees the same failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace '{path}' cannot be resolved: {reason}")]
    Unresolvable { path: String, reason: String },

    #[error("workspace '{0}' is not a directory")]
    NotADirectory(String),

    #[error("workspace scan failed: {0}")]
    ScanFailed(String),
}

/// Canonical workspace roots that have been bootstrapped in this process.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    max_files: usize,
    records: Mutex<HashMap<PathBuf, WorkspaceRecord>>,
}

impl WorkspaceRegistry {
    #[must_use]
    pub fn new(max_files: usize) -> Self {
        Self {
            max_files: max_files.max(1),
            records: Mutex::new(HashMap::new()),
        }
    }

    pub async fn canonicalize(raw: &str) -> Result<PathBuf, WorkspaceError> {
        let trimmed = raw.trim();
        let root = tokio::fs::canonicalize(trimmed)
            .await
            .map_err(|err| WorkspaceError::Unresolvable {
                path: trimmed.to_string(),
                reason: err.to_string(),
            })?;
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|err| WorkspaceError::Unresolvable {
                path: trimmed.to_string(),
                reason: err.to_string(),
            })?;
        if !meta.is_dir() {
            return Err(WorkspaceError::NotADirectory(root.display().to_string()));
        }
        Ok(root)
    }

    /// Scan `root` and (re-)register it under a fresh run id.
    pub async fn bootstrap(&self, root: &Path) -> Result<WorkspaceRecord, WorkspaceError> {
        let scanner = WorkspaceScanner::new(root, self.max_files);
        let scan = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|err| WorkspaceError::ScanFailed(err.to_string()))?;

        let record = WorkspaceRecord {
            root: root.to_path_buf(),
            run_id: random_id("run"),
            registered_at_ms: now_ms(),
            file_count: scan.files.len(),
            truncated: scan.truncated,
        };
        log::info!(
            "bootstrapped {} ({} file(s), run {})",
            root.display(),
            record.file_count,
            record.run_id
        );
        self.lock().insert(root.to_path_buf(), record.clone());
        Ok(record)
    }

    #[must_use]
    pub fn get(&self, root: &Path) -> Option<WorkspaceRecord> {
        self.lock().get(root).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, WorkspaceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
