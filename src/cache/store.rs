//! Key-value backends for the TTL cache

use crate::logging::get_logger;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a backend write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Writing would exceed the storage budget
    #[error("storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Any other backend failure
    #[error("storage I/O failure: {0}")]
    Io(String),
}

/// Durable string key-value store with a capacity limit
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// In-memory store; capacity counts key and value bytes
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    max_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_bytes(max_bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_bytes: Some(max_bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_quota(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let Some(max) = self.max_bytes else {
            return Ok(());
        };
        let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
        let available = max.saturating_sub(self.used_bytes() - replaced);
        let needed = key.len() + value.len();
        if needed > available {
            return Err(StoreError::QuotaExceeded { needed, available });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.check_quota(key, &value)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole map is rewritten after every mutation. A missing or corrupt
/// file opens as an empty store.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    logger: crate::logging::StructuredLogger,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P, max_bytes: usize) -> Self {
        let logger = get_logger("cache-store");
        let path = path.as_ref().to_path_buf();
        let mut inner = MemoryStore::with_capacity_bytes(max_bytes);

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => {
                    logger.debug(&format!(
                        "Loaded {} cache entries from {}",
                        entries.len(),
                        path.display()
                    ));
                    inner.entries = entries;
                }
                Err(e) => logger.warn(&format!(
                    "Ignoring corrupt cache file {}: {}",
                    path.display(),
                    e
                )),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logger.info("No cache file found, starting empty");
            }
            Err(e) => logger.warn(&format!(
                "Cannot read cache file {}: {}",
                path.display(),
                e
            )),
        }

        Self {
            path,
            inner,
            logger,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.used_bytes()
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        let contents =
            serde_json::to_string(&self.inner.entries).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let previous = self.inner.get(key);
        self.inner.set(key, value)?;
        if let Err(e) = self.persist() {
            match previous {
                Some(old) => {
                    self.inner.entries.insert(key.to_string(), old);
                }
                None => self.inner.remove(key),
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        if self.inner.entries.remove(key).is_some() {
            if let Err(e) = self.persist() {
                self.logger
                    .warn(&format!("Failed to persist removal of {}: {}", key, e));
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}
