//! File-backed adapters.
//!
//! - `JsonFileDirectory`: directory snapshot read from a JSON document
//! - `JsonlHistoryStore`: one `HistoryRecord` per line, append-only

use async_trait::async_trait;
use shared_types::{Directory, Guild, HistoryRecord, User};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{DirectoryError, HistoryError};
use crate::ports::{DirectoryProvider, HistoryStore};

/// Directory read from `{"guilds": [...], "users": [...]}` on every query,
/// so edits to the file take effect without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Directory, DirectoryError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DirectoryError(format!("{}: {e}", self.path.display())))?;
        serde_json::from_slice(&raw)
            .map_err(|e| DirectoryError(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl DirectoryProvider for JsonFileDirectory {
    async fn list_guilds_with_channels(&self) -> Result<Vec<Guild>, DirectoryError> {
        Ok(self.load().await?.guilds)
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(self.load().await?.users)
    }
}

/// Append-only JSON Lines history file.
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    // Serializes appends so concurrent writes never interleave within a line.
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back. A missing file is an empty history.
    pub async fn read_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(HistoryError::from))
            .collect()
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(id = %record.id, path = %self.path.display(), "history record appended");
        Ok(())
    }
}
