//! Persistence of completed analyses

use crate::error::StoreError;
use crate::orchestrator::AnalysisRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Default number of records kept by [`JsonHistoryStore`]
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Receives every completed record
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Persist one record
    async fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError>;
}

/// Most recent analyses in a JSON file, one per symbol, newest first
pub struct JsonHistoryStore {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
}

impl JsonHistoryStore {
    /// Store at `path` keeping the default number of records
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_HISTORY_CAPACITY)
    }

    /// Store at `path` keeping at most `capacity` records
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Location of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved records, newest first; empty when the file does not exist
    pub async fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn read(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl AnalysisSink for JsonHistoryStore {
    async fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let mut records = self.read().await?;
        records.retain(|existing| existing.symbol != record.symbol);
        records.insert(0, record.clone());
        records.truncate(self.capacity);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(&records)?;
        tokio::fs::write(&self.path, json).await?;

        debug!(path = %self.path.display(), records = records.len(), "analysis history saved");
        Ok(())
    }
}
