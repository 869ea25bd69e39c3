// Garage core library - domain types shared by the storage, protocol and
// block crates: ids, body specs, the prefab codec, naming, sync wrappers,
// cooldowns and the host abstraction seams.

pub mod body;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod host;
pub mod ids;
pub mod naming;
pub mod prefab;
pub mod sync;
pub mod volume;

// Re-export commonly used types
pub use body::{BlockSpec, BodySpec, Pose};
pub use config::GarageConfig;
pub use cooldown::{epoch_ms, Cooldown};
pub use error::GarageError;
pub use host::{
    AccessList, EntityQuery, HostWorld, Obstruction, PlayerRelation, SafeZone, SafeZoneQuery,
    VoxelQuery, ZoneShape,
};
pub use ids::{EntityId, FactionId, PlayerId, SteamId, StorageScope};
pub use naming::allocate_unique_name;
pub use prefab::Prefab;
pub use sync::{SyncUpdate, Synced};
pub use volume::Aabb;
