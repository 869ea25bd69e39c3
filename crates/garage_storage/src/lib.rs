// Garage storage library - persistence boundary for stored prefabs: the
// world-storage key-value abstraction, the compressed blob discipline, the
// global file index and the per-block record with legacy migration.

pub mod backend;
pub mod blob;
pub mod index;
pub mod record;
pub mod repository;

pub use backend::{DirStorage, MemoryStorage, WorldStorage};
pub use index::FileIndex;
pub use record::{BlockRecord, LegacyRecord};
pub use repository::PrefabRepository;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[source] bincode::Error),

    #[error("corrupt blob under key '{key}': {detail}")]
    Corrupt { key: String, detail: String },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}
