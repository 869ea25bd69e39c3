//! Global index of prefab file keys.
//!
//! Every key physically written during a successful store is registered
//! here before the prefab counts as stored; every key removed is
//! unregistered. Blocks check their grid-name lists against this set to
//! find stale entries with no backing file.

use crate::backend::WorldStorage;
use crate::blob::{decode_blob, encode_blob};
use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const INDEX_KEY: &str = "index";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileIndex {
    file_keys: BTreeSet<String>,
}

impl FileIndex {
    /// Load the index from storage. A missing or unreadable index file
    /// yields a fresh empty index, never a crash.
    pub fn load(storage: &dyn WorldStorage) -> Self {
        match storage.read(INDEX_KEY) {
            Ok(Some(bytes)) => match decode_blob(INDEX_KEY, &bytes) {
                Ok(index) => index,
                Err(e) => {
                    tracing::error!("failed to load file index, starting fresh: {}", e);
                    Self::default()
                }
            },
            Ok(None) => {
                tracing::info!("creating a new file index");
                Self::default()
            }
            Err(e) => {
                tracing::error!("failed to read file index, starting fresh: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn WorldStorage) -> Result<(), StorageError> {
        let bytes = encode_blob(self)?;
        storage.write(INDEX_KEY, &bytes)
    }

    pub fn register(&mut self, key: &str) -> bool {
        self.file_keys.insert(key.to_string())
    }

    pub fn unregister(&mut self, key: &str) -> bool {
        self.file_keys.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.file_keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.file_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.file_keys.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;

    #[test]
    fn test_register_unregister_contains() {
        let mut index = FileIndex::default();
        assert!(index.register("g1_Freighter"));
        assert!(!index.register("g1_Freighter"));
        assert!(index.contains("g1_Freighter"));
        assert!(index.unregister("g1_Freighter"));
        assert!(!index.unregister("g1_Freighter"));
        assert!(!index.contains("g1_Freighter"));
    }

    #[test]
    fn test_load_missing_index_is_fresh() {
        let storage = MemoryStorage::new();
        let index = FileIndex::load(&storage);
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut storage = MemoryStorage::new();
        let mut index = FileIndex::default();
        index.register("a_1");
        index.register("b_2");
        index.save(&mut storage).unwrap();

        let loaded = FileIndex::load(&storage);
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_corrupt_index_starts_fresh() {
        let mut storage = MemoryStorage::new();
        storage.write(INDEX_KEY, &[1, 2, 3]).unwrap();
        let index = FileIndex::load(&storage);
        assert!(index.is_empty());
    }
}
