//! Key-value world storage.
//!
//! Mirrors the host's world-storage facility: named binary payloads with no
//! directory structure. `DirStorage` is the on-disk implementation,
//! `MemoryStorage` backs tests.

use crate::StorageError;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub trait WorldStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Idempotent: deleting an absent key succeeds silently.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
    fn exists(&self, key: &str) -> bool;
    fn list_keys(&self) -> Vec<String>;
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// One file per key under a world storage directory.
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.bin", key))
    }
}

impl WorldStorage for DirStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    fn list_keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                name.strip_suffix(".bin").map(str::to_string)
            })
            .collect();
        keys.sort();
        keys
    }
}

/// In-memory storage for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorldStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn list_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        storage.write("a", b"hello").unwrap();
        assert_eq!(storage.read("a").unwrap().unwrap(), b"hello");
        assert!(storage.exists("a"));
        storage.delete("a").unwrap();
        assert!(!storage.exists("a"));
        assert!(storage.read("a").unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_key_is_silent() {
        let mut storage = MemoryStorage::new();
        assert!(storage.delete("never-written").is_ok());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let mut storage = MemoryStorage::new();
        assert!(storage.write("../escape", b"x").is_err());
        assert!(storage.write("", b"x").is_err());
    }

    #[test]
    fn test_dir_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirStorage::open(dir.path()).unwrap();

        storage.write("g1_Freighter", b"payload").unwrap();
        assert!(storage.exists("g1_Freighter"));
        assert_eq!(storage.read("g1_Freighter").unwrap().unwrap(), b"payload");
        assert_eq!(storage.list_keys(), vec!["g1_Freighter".to_string()]);

        storage.delete("g1_Freighter").unwrap();
        storage.delete("g1_Freighter").unwrap();
        assert!(!storage.exists("g1_Freighter"));
    }
}
