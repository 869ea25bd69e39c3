use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PlayerId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SteamId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FactionId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity that namespaces a block's stored prefabs in the
/// repository. Engine entity ids are not stable across grid rebuilds or
/// world reloads, so current-layout blocks carry a GUID instead; the legacy
/// entity-id variant only exists so old files can be read and migrated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageScope {
    Guid(Uuid),
    Legacy(EntityId),
}

impl StorageScope {
    pub fn fresh() -> Self {
        Self::Guid(Uuid::new_v4())
    }

    /// Repository key for a prefab stored under this scope. The same prefab
    /// name can coexist across distinct blocks without collision.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}_{}", self, name)
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guid(guid) => write!(f, "{}", guid),
            Self::Legacy(id) => write!(f, "{}", id),
        }
    }
}
