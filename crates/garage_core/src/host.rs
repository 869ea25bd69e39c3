//! Seams toward the host engine.
//!
//! The surrounding game owns physics, entities, voxels and safe zones; the
//! garage core only ever talks to it through these traits, injected where
//! needed. Nothing in here is looked up dynamically at runtime.

use crate::body::{BodySpec, Pose};
use crate::error::GarageError;
use crate::ids::{EntityId, FactionId, PlayerId, SteamId};
use crate::volume::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Relation between two players as the host's faction system sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerRelation {
    Owner,
    FactionShare,
    Neutral,
    Enemies,
}

impl PlayerRelation {
    /// Hostile or neutral ownership blocks storing a grid.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Neutral | Self::Enemies)
    }
}

/// Structure/entity access the state machine and codec need from the host.
pub trait HostWorld {
    /// Whether `id` still resolves to a live structure.
    fn structure_exists(&self, id: EntityId) -> bool;

    /// World position of an entity, if it is still live.
    fn entity_position(&self, id: EntityId) -> Option<DVec3>;

    fn display_name(&self, id: EntityId) -> Option<String>;

    /// The mechanically-linked group containing `id`, in host enumeration
    /// order. Includes `id` itself.
    fn mechanical_group(&self, id: EntityId) -> Vec<EntityId>;

    /// Serialize one live structure into an opaque body payload.
    fn serialize_body(&self, id: EntityId) -> Result<String, GarageError>;

    /// Create a live body from a spec, returning its new entity id.
    fn spawn_body(&mut self, spec: &BodySpec) -> Result<EntityId, GarageError>;

    /// Remove an entity from the world (store consumed it, or a preview was
    /// discarded). Must tolerate already-gone entities.
    fn remove_entity(&mut self, id: EntityId);

    fn is_static(&self, id: EntityId) -> bool;

    /// Player currently controlling the structure, if any.
    fn controlling_player(&self, id: EntityId) -> Option<PlayerId>;

    /// Majority owners of the structure.
    fn big_owners(&self, id: EntityId) -> Vec<PlayerId>;

    fn relation(&self, requester: PlayerId, other: PlayerId) -> PlayerRelation;

    fn faction_of(&self, player: PlayerId) -> Option<FactionId>;

    /// First structure hit by a ray from the camera, if any.
    fn raycast_structure(&self, origin: DVec3, dir: DVec3, max_distance: f64) -> Option<EntityId>;
}

/// Voxel terrain sampling for placement validation.
pub trait VoxelQuery {
    /// Fraction (0..=1) of the oriented box at `pose` that overlaps voxel
    /// content. `None` when no voxel body is near the box at all.
    fn voxel_content_in_box(&self, local_aabb: &Aabb, pose: &Pose) -> Option<f32>;
}

/// Entity found inside a candidate placement region.
#[derive(Debug, Clone)]
pub enum Obstruction {
    Block {
        entity: EntityId,
        grid: EntityId,
        name: String,
    },
    Character {
        entity: EntityId,
        controller: Option<PlayerId>,
        name: String,
    },
    FloatingObject {
        entity: EntityId,
        name: String,
    },
}

/// Entity lookup for placement validation.
pub trait EntityQuery {
    fn obstructions_in_aabb(&self, aabb: &Aabb) -> Vec<Obstruction>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessList {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneShape {
    Sphere { center: DVec3, radius: f64 },
    Box(Aabb),
}

impl ZoneShape {
    pub fn intersects(&self, aabb: &Aabb) -> bool {
        match self {
            Self::Sphere { center, radius } => aabb.intersects_sphere(*center, *radius),
            Self::Box(zone) => zone.intersects(aabb),
        }
    }
}

/// Host-defined volume with player/faction access policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeZone {
    pub shape: ZoneShape,
    pub access_players: AccessList,
    pub access_factions: AccessList,
    pub players: Vec<PlayerId>,
    pub factions: Vec<FactionId>,
}

/// Safe-zone lookup for placement validation.
pub trait SafeZoneQuery {
    /// Zones whose volume intersects `aabb`.
    fn zones_intersecting(&self, aabb: &Aabb) -> Vec<SafeZone>;

    /// Whether this user bypasses safe-zone restrictions entirely.
    fn is_admin(&self, steam: SteamId) -> bool;
}
