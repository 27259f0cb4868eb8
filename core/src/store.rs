//! Process-wide key-value string storage backing the session.
//!
//! # Design
//! `KeyValueStore` is the client's equivalent of browser local storage. The
//! multi-key operations are the primitives and each one is atomic, so a
//! session's token and user can be written, read and removed as a pair.
//! Single-key helpers are provided on top.
//!
//! Neither implementation caches values on the caller's side: `FileStore`
//! re-reads its file on every access, so a read always observes the last
//! write made through any handle in the process.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Storage("store lock poisoned".to_string())
    }
}

/// A string key-value store shared by every component of the client.
pub trait KeyValueStore: Send + Sync {
    /// Read several keys in one consistent snapshot. The result has one
    /// entry per requested key, in order.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError>;

    /// Write several entries atomically: readers see all of them or none.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Remove several keys atomically. Missing keys are ignored.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Write `entries` only if `key` currently holds `expected`. The check
    /// and the write happen under one lock. Returns whether it wrote.
    fn set_many_if(
        &self,
        key: &str,
        expected: &str,
        entries: &[(&str, &str)],
    ) -> Result<bool, StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_many(&[key])
    }
}

/// In-memory store; lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = self.entries.read()?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set_many(&self, items: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut entries = self.entries.write()?;
        for (key, value) in items {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.write()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn set_many_if(
        &self,
        key: &str,
        expected: &str,
        items: &[(&str, &str)],
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write()?;
        if entries.get(key).map(String::as_str) != Some(expected) {
            return Ok(false);
        }
        for (k, v) in items {
            entries.insert((*k).to_string(), (*v).to_string());
        }
        Ok(true)
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// original, so a crash never leaves a half-written file behind. An
/// in-process lock orders read-modify-write cycles; separate processes
/// sharing the file are not coordinated beyond the atomic rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)
            .map_err(|e| StoreError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            StoreError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), keys = entries.len(), "session file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let _guard = self.lock.lock()?;
        let entries = self.load()?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn set_many(&self, items: &[(&str, &str)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock()?;
        let mut entries = self.load()?;
        for (key, value) in items {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        self.save(&entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock()?;
        let mut entries = self.load()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries)
    }

    fn set_many_if(
        &self,
        key: &str,
        expected: &str,
        items: &[(&str, &str)],
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock()?;
        let mut entries = self.load()?;
        if entries.get(key).map(String::as_str) != Some(expected) {
            return Ok(false);
        }
        for (k, v) in items {
            entries.insert((*k).to_string(), (*v).to_string());
        }
        self.save(&entries)?;
        Ok(true)
    }
}
