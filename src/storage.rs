//! Durable Local Storage
//!
//! A byte-oriented key-value store used to persist serialized snapshots of
//! each collection and the pending-operation queue under fixed keys. The
//! local copy is what the UI renders from; the remote store is only an
//! eventually-consistent mirror of it.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{Result, StorageError};

/// Fixed storage keys for the four persisted documents.
pub mod keys {
    pub const INVENTORY: &str = "inventory";
    pub const SHOPPING_LISTS: &str = "shopping_lists";
    pub const SAVED_RECIPES: &str = "saved_recipes";
    pub const PENDING_OPS: &str = "pending_ops";
}

/// Narrow contract over platform-durable storage: get/set/remove of opaque
/// bytes under fixed keys. Implemented by [`FileStore`] in production and
/// [`MemoryStore`] in tests.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed helpers over the byte store. Missing keys deserialize to `None`;
/// corrupt documents are reported as [`StorageError::Corrupt`] rather than
/// silently replaced.
pub fn get_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Write {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &bytes)
}

/// Filesystem-backed store: one JSON document per key under a data
/// directory (default `~/.local/share/larder/`).
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store at the default platform data directory.
    pub fn new() -> Result<Self> {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder");
        Self::at(base)
    }

    /// Create a store rooted at an explicit directory.
    pub fn at(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        // Write through a temp file so a crash mid-write never leaves a
        // truncated snapshot behind.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value).map_err(|e| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Write {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
