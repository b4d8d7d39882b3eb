//! JSON-file backed storage that survives restarts of the shell.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::Storage;
use crate::errors::AppResult;

/// Storage persisted as a single JSON object on disk.
///
/// Every mutation rewrites the whole file through a temporary sibling and a rename, so a
/// crash mid-write leaves the previous contents intact. The in-memory map only changes
/// once the rename has succeeded.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Open the storage file, creating parent directories as needed.
    ///
    /// A missing file starts empty, and so does a corrupt one after a warning.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt storage file {:?}: {}", path, e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.flush(&HashMap::new())?;
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.path(), path.as_path());
        storage.set("authToken", "abc").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("authToken").as_deref(), Some("abc"));

        reopened.remove("authToken").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert!(reopened.get("authToken").is_none());
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested");
        let path = dir.join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("authToken", "abc").unwrap();

        // Writes fail once the directory is gone
        std::fs::remove_dir_all(&dir).unwrap();

        let err = storage.set("userSession", "{}").unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(storage.get("userSession").is_none());

        assert!(storage.remove("authToken").is_err());
        assert!(storage.clear().is_err());
        assert_eq!(storage.get("authToken").as_deref(), Some("abc"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get("userSession").is_none());

        storage.set("userSession", "{}").unwrap();
        assert_eq!(storage.get("userSession").as_deref(), Some("{}"));
    }
}
