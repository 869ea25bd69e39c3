use crate::ids::PlayerId;
use crate::volume::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// World transform of a body: position plus forward/up basis vectors, the
/// way the host engine expresses grid orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub forward: DVec3,
    pub up: DVec3,
}

impl Pose {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            forward: DVec3::NEG_Z,
            up: DVec3::Y,
        }
    }
}

/// One block inside a body spec. The payload is opaque host data; the core
/// only ever touches ownership and interactive-occupant state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub owner: PlayerId,
    /// Pilot or autopilot occupying a seat at capture time.
    pub occupant: Option<PlayerId>,
    #[serde(default)]
    pub payload: String,
}

/// Editable specification of one rigid structure, the unit a prefab body
/// blob decodes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    pub pose: Pose,
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub mirror_x: Option<i32>,
    pub mirror_y: Option<i32>,
    pub mirror_z: Option<i32>,
    pub is_static: bool,
    pub create_physics: bool,
    pub is_respawn: bool,
    /// Bounding box in the body's local frame, captured at store time.
    pub local_aabb: Aabb,
    pub blocks: Vec<BlockSpec>,
}

impl BodySpec {
    /// Clears everything a freshly placed body must not inherit from the
    /// moment it was captured: motion, mirror planes, static/respawn
    /// flagging and any phantom seat occupants.
    pub fn normalize_for_spawn(&mut self) {
        self.linear_velocity = DVec3::ZERO;
        self.angular_velocity = DVec3::ZERO;
        self.mirror_x = None;
        self.mirror_y = None;
        self.mirror_z = None;
        self.is_static = false;
        self.create_physics = true;
        self.is_respawn = false;
        for block in &mut self.blocks {
            block.occupant = None;
        }
    }

    /// Reassign every block to `owner`, as done before spawning a placed
    /// prefab for the requesting player.
    pub fn reassign_owner(&mut self, owner: PlayerId) {
        for block in &mut self.blocks {
            block.owner = owner;
        }
    }

    /// Local bounding box carried to the candidate position.
    pub fn world_aabb(&self) -> Aabb {
        self.local_aabb.translated(self.pose.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> BodySpec {
        BodySpec {
            name: "Test".into(),
            pose: Pose::at(DVec3::new(1.0, 2.0, 3.0)),
            linear_velocity: DVec3::new(10.0, 0.0, 0.0),
            angular_velocity: DVec3::new(0.0, 1.0, 0.0),
            mirror_x: Some(4),
            mirror_y: None,
            mirror_z: Some(-2),
            is_static: true,
            create_physics: false,
            is_respawn: true,
            local_aabb: Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(5.0)),
            blocks: vec![BlockSpec {
                owner: PlayerId(7),
                occupant: Some(PlayerId(7)),
                payload: String::new(),
            }],
        }
    }

    #[test]
    fn test_normalize_for_spawn() {
        let mut body = sample_body();
        body.normalize_for_spawn();
        assert_eq!(body.linear_velocity, DVec3::ZERO);
        assert_eq!(body.angular_velocity, DVec3::ZERO);
        assert!(body.mirror_x.is_none() && body.mirror_y.is_none() && body.mirror_z.is_none());
        assert!(!body.is_static);
        assert!(body.create_physics);
        assert!(!body.is_respawn);
        assert!(body.blocks.iter().all(|b| b.occupant.is_none()));
    }

    #[test]
    fn test_reassign_owner() {
        let mut body = sample_body();
        body.reassign_owner(PlayerId(99));
        assert!(body.blocks.iter().all(|b| b.owner == PlayerId(99)));
    }

    #[test]
    fn test_world_aabb_follows_pose() {
        let body = sample_body();
        let aabb = body.world_aabb();
        assert_eq!(aabb.center(), DVec3::new(1.0, 2.0, 3.0));
    }
}
