//! Prefab repository: the single persistence boundary for stored prefabs
//! and per-block records. Keys are `{scope}_{name}` so the same prefab name
//! can coexist across distinct blocks; writes register in the file index,
//! deletes unregister.

use crate::backend::WorldStorage;
use crate::blob::{decode_blob, encode_blob};
use crate::index::FileIndex;
use crate::record::{BlockBlob, BlockRecord, LegacyRecord};
use crate::StorageError;
use garage_core::{allocate_unique_name, EntityId, Prefab, StorageScope};
use uuid::Uuid;

fn block_key(entity: EntityId) -> String {
    format!("garage_{}", entity)
}

pub struct PrefabRepository<S: WorldStorage> {
    storage: S,
    index: FileIndex,
}

impl<S: WorldStorage> PrefabRepository<S> {
    /// Open the repository over a storage backend, loading the file index.
    pub fn open(storage: S) -> Self {
        let index = FileIndex::load(&storage);
        Self { storage, index }
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist a prefab under its scope. Saving to an existing key
    /// overwrites.
    pub fn save(&mut self, scope: StorageScope, prefab: &Prefab) -> Result<(), StorageError> {
        let key = scope.key_for(&prefab.name);
        let bytes = encode_blob(prefab)?;
        self.storage.write(&key, &bytes)?;
        self.index.register(&key);
        self.index.save(&mut self.storage)?;
        tracing::info!(%key, bodies = prefab.body_count(), "prefab saved");
        Ok(())
    }

    /// Load a prefab. A missing file is `None`, never an error, so callers
    /// can self-heal stale name-list entries.
    pub fn load(&self, scope: StorageScope, name: &str) -> Result<Option<Prefab>, StorageError> {
        let key = scope.key_for(name);
        match self.storage.read(&key)? {
            Some(bytes) => Ok(Some(decode_blob(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove a persisted prefab. Succeeds silently if already absent.
    pub fn delete(&mut self, scope: StorageScope, name: &str) -> Result<(), StorageError> {
        let key = scope.key_for(name);
        self.storage.delete(&key)?;
        if self.index.unregister(&key) {
            self.index.save(&mut self.storage)?;
        }
        Ok(())
    }

    pub fn exists(&self, scope: StorageScope, name: &str) -> bool {
        self.storage.exists(&scope.key_for(name))
    }

    /// Whether the grid-name entry has a backing file, per the index.
    pub fn is_backed(&self, scope: StorageScope, name: &str) -> bool {
        let key = scope.key_for(name);
        self.index.contains(&key) && self.storage.exists(&key)
    }

    pub fn save_block_record(
        &mut self,
        entity: EntityId,
        record: &BlockRecord,
    ) -> Result<(), StorageError> {
        let bytes = encode_blob(&BlockBlob::Current(record.clone()))?;
        self.storage.write(&block_key(entity), &bytes)
    }

    /// Load a block's record, migrating any legacy layout forward. Returns
    /// `None` for a block that never saved anything.
    pub fn load_block_record(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<BlockRecord>, StorageError> {
        let key = block_key(entity);
        let Some(bytes) = self.storage.read(&key)? else {
            return Ok(None);
        };

        match decode_blob::<BlockBlob>(&key, &bytes) {
            Ok(BlockBlob::Current(record)) => Ok(Some(record)),
            Ok(BlockBlob::Legacy(legacy)) => Ok(Some(self.migrate_legacy(entity, legacy)?)),
            Err(_) => {
                // Pre-envelope file: a bare legacy record
                let legacy: LegacyRecord = decode_blob(&key, &bytes)?;
                tracing::warn!(%entity, "migrating legacy garage record");
                Ok(Some(self.migrate_legacy(entity, legacy)?))
            }
        }
    }

    /// Rewrite a legacy record under a fresh GUID scope: inline prefabs are
    /// written out as files, entity-id-keyed files are renamed, the index
    /// picks up every key, and the new record is persisted under the block
    /// key. Names with no recoverable body are dropped (self-heal).
    pub fn migrate_legacy(
        &mut self,
        entity: EntityId,
        legacy: LegacyRecord,
    ) -> Result<BlockRecord, StorageError> {
        let guid = Uuid::new_v4();
        let scope = StorageScope::Guid(guid);
        let legacy_scope = StorageScope::Legacy(entity);
        let mut grid_names: Vec<String> = Vec::new();

        for mut prefab in legacy.stored {
            prefab.name = allocate_unique_name(&prefab.name, &grid_names);
            self.save(scope, &prefab)?;
            grid_names.push(prefab.name.clone());
        }

        for name in legacy.grid_names {
            match self.load(legacy_scope, &name) {
                Ok(Some(mut prefab)) => {
                    prefab.name = allocate_unique_name(&name, &grid_names);
                    self.save(scope, &prefab)?;
                    self.delete(legacy_scope, &name)?;
                    grid_names.push(prefab.name.clone());
                }
                Ok(None) => {
                    tracing::warn!(%entity, %name, "legacy grid has no backing file, dropping");
                }
                Err(e) => {
                    tracing::error!(%entity, %name, "legacy grid file unreadable, dropping: {}", e);
                    self.delete(legacy_scope, &name)?;
                }
            }
        }

        let record = BlockRecord {
            scope: guid,
            grid_names,
        };
        self.save_block_record(entity, &record)?;
        tracing::info!(%entity, scope = %record.scope, grids = record.grid_names.len(),
            "legacy garage record migrated");
        Ok(record)
    }
}
