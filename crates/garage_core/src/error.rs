use crate::ids::EntityId;
use thiserror::Error;

/// Error taxonomy for the garage core. Handlers at the host boundary log
/// these and drop the request; nothing here is allowed to escape into the
/// host's simulation loop.
#[derive(Debug, Error)]
pub enum GarageError {
    #[error("structure {0} no longer exists")]
    StructureGone(EntityId),

    #[error("body codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("host error: {0}")]
    Host(String),

    #[error("config error: {0}")]
    Config(String),
}
