//! Client-local key-value storage for the session.
//!
//! The session is two string values under fixed keys. Backends apply a batch
//! of writes as one unit so that a token is never observable without its
//! user (or the other way round).

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StorageError;

/// One write in a storage batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageWrite {
    Set { key: String, value: String },
    Remove { key: String },
}

impl StorageWrite {
    #[must_use]
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// Synchronous key-value storage scoped to the client.
pub trait SessionStorage: Send + Sync {
    /// Reads one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Applies all writes, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn apply(&self, writes: &[StorageWrite]) -> Result<(), StorageError>;
}

impl<T: SessionStorage + ?Sized> SessionStorage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn apply(&self, writes: &[StorageWrite]) -> Result<(), StorageError> {
        (**self).apply(writes)
    }
}

/// In-memory storage; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn apply(&self, writes: &[StorageWrite]) -> Result<(), StorageError> {
        let mut values = self.values.write();
        apply_writes(&mut values, writes);
        Ok(())
    }
}

/// Durable storage in a JSON file.
///
/// Every batch rewrites the whole file through a temporary sibling followed
/// by a rename, so readers see either the old or the new contents. The file
/// is re-read on every `get`, which lets several clients share one file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: &std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(&e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }
        let body = serde_json::to_string_pretty(values).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, body).map_err(|e| self.io_error(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(&e))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn apply(&self, writes: &[StorageWrite]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let mut values = self.read_all()?;
        apply_writes(&mut values, writes);
        self.write_all(&values)?;
        tracing::debug!(path = %self.path.display(), writes = writes.len(), "session storage updated");
        Ok(())
    }
}

fn apply_writes(values: &mut BTreeMap<String, String>, writes: &[StorageWrite]) {
    for write in writes {
        match write {
            StorageWrite::Set { key, value } => {
                values.insert(key.clone(), value.clone());
            }
            StorageWrite::Remove { key } => {
                values.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn SessionStorage) {
        assert_eq!(storage.get("authToken").expect("get"), None);

        storage
            .apply(&[
                StorageWrite::set("authToken", "t"),
                StorageWrite::set("currentUser", "{}"),
            ])
            .expect("apply");
        assert_eq!(storage.get("authToken").expect("get").as_deref(), Some("t"));
        assert_eq!(storage.get("currentUser").expect("get").as_deref(), Some("{}"));

        storage
            .apply(&[
                StorageWrite::remove("authToken"),
                StorageWrite::remove("currentUser"),
            ])
            .expect("apply");
        assert_eq!(storage.get("authToken").expect("get"), None);
        assert_eq!(storage.get("currentUser").expect("get"), None);
    }

    #[test]
    fn memory_storage_set_and_remove() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn file_storage_set_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        exercise(&FileStorage::new(dir.path().join("nested/session.json")));
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        FileStorage::new(&path)
            .apply(&[StorageWrite::set("authToken", "persisted")])
            .expect("apply");

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("authToken").expect("get").as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn file_storage_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        FileStorage::new(&path)
            .apply(&[StorageWrite::set("k", "v")])
            .expect("apply");
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["session.json".to_string()]);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").expect("write");
        let err = FileStorage::new(&path).get("authToken").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
