//! Key/value storage capability behind the field registry and settings.
//!
//! Records are opaque strings (JSON in practice). `TieredStore` pairs a
//! primary store with a fallback that takes over whenever the primary fails.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local store. Lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        records.remove(key);
        Ok(())
    }
}

/// One file per key under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Primary store with a fallback used whenever the primary errors.
///
/// A key whose last write or delete landed in the fallback is read from the
/// fallback until the primary accepts a write for it again.
pub struct TieredStore {
    primary: Arc<dyn KeyValueStore>,
    fallback: Arc<dyn KeyValueStore>,
    failed_over: Mutex<HashSet<String>>,
}

impl TieredStore {
    pub fn new(primary: Arc<dyn KeyValueStore>, fallback: Arc<dyn KeyValueStore>) -> Self {
        Self {
            primary,
            fallback,
            failed_over: Mutex::new(HashSet::new()),
        }
    }

    fn is_failed_over(&self, key: &str) -> bool {
        self.failed_over
            .lock()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    fn mark_failed_over(&self, key: &str, failed_over: bool) {
        if let Ok(mut keys) = self.failed_over.lock() {
            if failed_over {
                keys.insert(key.to_string());
            } else {
                keys.remove(key);
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for TieredStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.is_failed_over(key) {
            return self.fallback.get(key).await;
        }

        match self.primary.get(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "Primary store read failed, using fallback");
                self.fallback.get(key).await
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.primary.set(key, value).await {
            Ok(()) => {
                self.mark_failed_over(key, false);
                Ok(())
            }
            Err(e) => {
                warn!(key, error = %e, "Primary store write failed, using fallback");
                self.fallback.set(key, value).await?;
                self.mark_failed_over(key, true);
                Ok(())
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.primary.delete(key).await {
            Ok(()) => {
                self.mark_failed_over(key, false);
                if let Err(e) = self.fallback.delete(key).await {
                    warn!(key, error = %e, "Failed to clear fallback copy");
                }
                Ok(())
            }
            Err(e) => {
                warn!(key, error = %e, "Primary store delete failed, using fallback");
                self.fallback.delete(key).await?;
                self.mark_failed_over(key, true);
                Ok(())
            }
        }
    }
}

/// Store that fails every call. Used to exercise degraded paths.
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(StorageError::Unavailable("backend offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(StorageError::Unavailable("backend offline".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(StorageError::Unavailable("backend offline".to_string()))
    }
}

/// Store that reads fine but rejects every write, like a read-only data dir.
#[cfg(test)]
pub(crate) struct ReadOnlyStore {
    pub(crate) record: Option<String>,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(self.record.clone())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }
}
