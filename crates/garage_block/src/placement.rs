//! Placement validation for the place operation.
//!
//! The client runs this every frame against the preview to color it and
//! explain a refusal; the server runs the same pass once more before
//! committing a spawn. Checks run in a fixed order: cooldown, voxel
//! overlap, entity obstruction, safe zones.

use garage_core::{
    Aabb, AccessList, BodySpec, EntityId, EntityQuery, FactionId, Obstruction, PlayerId, SafeZone,
    SafeZoneQuery, SteamId, VoxelQuery,
};
use glam::DVec3;
use std::fmt;

/// Largest fraction of a body volume that may overlap voxel terrain.
pub const VOXEL_OVERLAP_LIMIT: f32 = 0.1;

/// Validation seams, borrowed from the host for one pass.
pub struct PlacementContext<'a> {
    pub voxels: &'a dyn VoxelQuery,
    pub entities: &'a dyn EntityQuery,
    pub zones: &'a dyn SafeZoneQuery,
}

/// Who is asking to place, with everything zone policy needs.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub player: PlayerId,
    pub steam: SteamId,
    pub faction: Option<FactionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementIssue {
    Cooldown { remaining_ms: u64 },
    VoxelOverlap { fraction: f32 },
    Obstructed { name: String },
    UncontrolledCharacter { name: String },
    ZoneDeniedPlayer,
    ZoneDeniedFaction,
    ZoneRestricted,
}

impl PlacementIssue {
    /// An uncontrolled character inside the landing zone warns the player
    /// but does not block the placement.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::UncontrolledCharacter { .. })
    }
}

impl fmt::Display for PlacementIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cooldown { remaining_ms } => {
                write!(f, "Spawn cooldown: {}s remaining", remaining_ms.div_ceil(1000))
            }
            Self::VoxelOverlap { fraction } => {
                write!(f, "Voxel obstruction: {:.0}% of the grid volume", fraction * 100.0)
            }
            Self::Obstructed { name } => write!(f, "Obstructed by {}", name),
            Self::UncontrolledCharacter { name } => {
                write!(f, "Warning: {} is inside the landing zone", name)
            }
            Self::ZoneDeniedPlayer => write!(f, "A safe zone blocks you from building here"),
            Self::ZoneDeniedFaction => {
                write!(f, "A safe zone blocks your faction from building here")
            }
            Self::ZoneRestricted => write!(f, "A safe zone restricts building here"),
        }
    }
}

/// Outcome of one validation pass. Non-blocking issues still surface as
/// messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verdict {
    pub issues: Vec<PlacementIssue>,
}

impl Verdict {
    pub fn allowed(&self) -> bool {
        self.issues.iter().all(|issue| !issue.is_blocking())
    }

    /// First blocking issue, the one a rejection reports.
    pub fn blocking_reason(&self) -> Option<String> {
        self.issues
            .iter()
            .find(|issue| issue.is_blocking())
            .map(|issue| issue.to_string())
    }
}

/// Validate `bodies` at their current poses. `ignore` lists preview grids
/// so they never count as obstructions against themselves. An active
/// cooldown short-circuits the physical checks.
pub fn validate_placement(
    ctx: &PlacementContext<'_>,
    requester: &Requester,
    bodies: &[BodySpec],
    ignore: &[EntityId],
    cooldown_remaining_ms: u64,
) -> Verdict {
    let mut verdict = Verdict::default();

    if cooldown_remaining_ms > 0 {
        verdict.issues.push(PlacementIssue::Cooldown {
            remaining_ms: cooldown_remaining_ms,
        });
        return verdict;
    }

    let Some(combined) = combined_aabb(bodies) else {
        return verdict;
    };

    for body in bodies {
        if let Some(fraction) = ctx.voxels.voxel_content_in_box(&body.local_aabb, &body.pose) {
            if fraction > VOXEL_OVERLAP_LIMIT {
                verdict.issues.push(PlacementIssue::VoxelOverlap { fraction });
                break;
            }
        }
    }

    for obstruction in ctx.entities.obstructions_in_aabb(&combined) {
        match obstruction {
            Obstruction::Block { grid, name, .. } => {
                if !ignore.contains(&grid) {
                    verdict.issues.push(PlacementIssue::Obstructed { name });
                }
            }
            Obstruction::Character {
                controller: Some(_),
                name,
                ..
            } => {
                verdict.issues.push(PlacementIssue::Obstructed { name });
            }
            Obstruction::Character {
                controller: None,
                name,
                ..
            } => {
                verdict
                    .issues
                    .push(PlacementIssue::UncontrolledCharacter { name });
            }
            Obstruction::FloatingObject { name, .. } => {
                verdict.issues.push(PlacementIssue::Obstructed { name });
            }
        }
    }

    if !ctx.zones.is_admin(requester.steam) {
        for zone in ctx.zones.zones_intersecting(&combined) {
            if let Some(issue) = zone_issue(&zone, requester) {
                verdict.issues.push(issue);
                break;
            }
        }
    }

    verdict
}

/// Move every body so the parent (`bodies[0]`) sits at `anchor`, keeping
/// the relative offsets captured in `stored_positions`.
pub fn pose_bodies_at(bodies: &mut [BodySpec], stored_positions: &[DVec3], anchor: DVec3) {
    let Some(&parent) = stored_positions.first() else {
        return;
    };
    for (body, &stored) in bodies.iter_mut().zip(stored_positions) {
        body.pose.position = anchor - (parent - stored);
    }
}

fn combined_aabb(bodies: &[BodySpec]) -> Option<Aabb> {
    let mut boxes = bodies.iter().map(|body| body.world_aabb());
    let first = boxes.next()?;
    Some(boxes.fold(first, |acc, b| acc.union(&b)))
}

/// One zone's answer for one requester. An explicit deny beats an explicit
/// allow; an allow-list zone with no matching entry denies by default.
fn zone_issue(zone: &SafeZone, requester: &Requester) -> Option<PlacementIssue> {
    let player_listed = zone.players.contains(&requester.player);
    if zone.access_players == AccessList::Blacklist && player_listed {
        return Some(PlacementIssue::ZoneDeniedPlayer);
    }
    if zone.access_players == AccessList::Whitelist && player_listed {
        return None;
    }

    if let Some(faction) = requester.faction {
        let faction_listed = zone.factions.contains(&faction);
        if zone.access_factions == AccessList::Blacklist && faction_listed {
            return Some(PlacementIssue::ZoneDeniedFaction);
        }
        if zone.access_factions == AccessList::Whitelist && faction_listed {
            return None;
        }
    }

    if zone.access_players == AccessList::Whitelist
        || zone.access_factions == AccessList::Whitelist
    {
        return Some(PlacementIssue::ZoneRestricted);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::{Pose, ZoneShape};

    struct NoVoxels;
    impl VoxelQuery for NoVoxels {
        fn voxel_content_in_box(&self, _: &Aabb, _: &Pose) -> Option<f32> {
            None
        }
    }

    struct Terrain(f32);
    impl VoxelQuery for Terrain {
        fn voxel_content_in_box(&self, _: &Aabb, _: &Pose) -> Option<f32> {
            Some(self.0)
        }
    }

    struct Clear;
    impl EntityQuery for Clear {
        fn obstructions_in_aabb(&self, _: &Aabb) -> Vec<Obstruction> {
            Vec::new()
        }
    }

    struct Crowd(Vec<Obstruction>);
    impl EntityQuery for Crowd {
        fn obstructions_in_aabb(&self, _: &Aabb) -> Vec<Obstruction> {
            self.0.clone()
        }
    }

    struct Zones {
        zones: Vec<SafeZone>,
        admin: bool,
    }
    impl SafeZoneQuery for Zones {
        fn zones_intersecting(&self, _: &Aabb) -> Vec<SafeZone> {
            self.zones.clone()
        }
        fn is_admin(&self, _: SteamId) -> bool {
            self.admin
        }
    }

    fn open_space() -> Zones {
        Zones {
            zones: Vec::new(),
            admin: false,
        }
    }

    fn body_at(position: DVec3) -> BodySpec {
        BodySpec {
            name: "hull".into(),
            pose: Pose::at(position),
            linear_velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            mirror_x: None,
            mirror_y: None,
            mirror_z: None,
            is_static: false,
            create_physics: true,
            is_respawn: false,
            local_aabb: Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(5.0)),
            blocks: Vec::new(),
        }
    }

    fn anyone() -> Requester {
        Requester {
            player: PlayerId(1),
            steam: SteamId(100),
            faction: Some(FactionId(7)),
        }
    }

    fn everywhere_zone(
        access_players: AccessList,
        access_factions: AccessList,
        players: Vec<PlayerId>,
        factions: Vec<FactionId>,
    ) -> SafeZone {
        SafeZone {
            shape: ZoneShape::Box(Aabb::from_center_half_extents(
                DVec3::ZERO,
                DVec3::splat(1000.0),
            )),
            access_players,
            access_factions,
            players,
            factions,
        }
    }

    #[test]
    fn test_clear_space_is_allowed() {
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &open_space(),
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert!(verdict.allowed());
        assert!(verdict.issues.is_empty());
    }

    #[test]
    fn test_cooldown_short_circuits_physical_checks() {
        // terrain fully overlaps, but the cooldown issue is the only one
        let ctx = PlacementContext {
            voxels: &Terrain(1.0),
            entities: &Clear,
            zones: &open_space(),
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 4_000);
        assert_eq!(
            verdict.issues,
            vec![PlacementIssue::Cooldown { remaining_ms: 4_000 }]
        );
        assert!(!verdict.allowed());
    }

    #[test]
    fn test_voxel_overlap_at_limit_is_allowed() {
        let ctx = PlacementContext {
            voxels: &Terrain(VOXEL_OVERLAP_LIMIT),
            entities: &Clear,
            zones: &open_space(),
        };
        assert!(validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0).allowed());
    }

    #[test]
    fn test_voxel_overlap_past_limit_blocks() {
        let ctx = PlacementContext {
            voxels: &Terrain(0.4),
            entities: &Clear,
            zones: &open_space(),
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert!(!verdict.allowed());
        assert_eq!(
            verdict.issues,
            vec![PlacementIssue::VoxelOverlap { fraction: 0.4 }]
        );
    }

    #[test]
    fn test_preview_grids_do_not_obstruct_themselves() {
        let preview = EntityId(42);
        let crowd = Crowd(vec![Obstruction::Block {
            entity: EntityId(1),
            grid: preview,
            name: "preview hull".into(),
        }]);
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &crowd,
            zones: &open_space(),
        };
        assert!(
            validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[preview], 0).allowed()
        );
    }

    #[test]
    fn test_uncontrolled_character_warns_without_blocking() {
        let crowd = Crowd(vec![Obstruction::Character {
            entity: EntityId(5),
            controller: None,
            name: "Engineer".into(),
        }]);
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &crowd,
            zones: &open_space(),
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert!(verdict.allowed());
        assert_eq!(verdict.issues.len(), 1);
        assert!(!verdict.issues[0].is_blocking());
    }

    #[test]
    fn test_controlled_character_blocks() {
        let crowd = Crowd(vec![Obstruction::Character {
            entity: EntityId(5),
            controller: Some(PlayerId(9)),
            name: "Pilot".into(),
        }]);
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &crowd,
            zones: &open_space(),
        };
        assert!(!validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0).allowed());
    }

    #[test]
    fn test_blacklisted_player_is_denied() {
        let zones = Zones {
            zones: vec![everywhere_zone(
                AccessList::Blacklist,
                AccessList::Blacklist,
                vec![PlayerId(1)],
                Vec::new(),
            )],
            admin: false,
        };
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &zones,
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert_eq!(verdict.issues, vec![PlacementIssue::ZoneDeniedPlayer]);
    }

    #[test]
    fn test_whitelisted_player_passes_an_allow_list_zone() {
        let zones = Zones {
            zones: vec![everywhere_zone(
                AccessList::Whitelist,
                AccessList::Whitelist,
                vec![PlayerId(1)],
                Vec::new(),
            )],
            admin: false,
        };
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &zones,
        };
        assert!(validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0).allowed());
    }

    #[test]
    fn test_faction_blacklist_beats_membership() {
        let zones = Zones {
            zones: vec![everywhere_zone(
                AccessList::Blacklist,
                AccessList::Blacklist,
                Vec::new(),
                vec![FactionId(7)],
            )],
            admin: false,
        };
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &zones,
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert_eq!(verdict.issues, vec![PlacementIssue::ZoneDeniedFaction]);
    }

    #[test]
    fn test_allow_list_zone_rejects_the_unlisted() {
        let zones = Zones {
            zones: vec![everywhere_zone(
                AccessList::Whitelist,
                AccessList::Whitelist,
                vec![PlayerId(99)],
                vec![FactionId(3)],
            )],
            admin: false,
        };
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &zones,
        };
        let verdict = validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0);
        assert_eq!(verdict.issues, vec![PlacementIssue::ZoneRestricted]);
    }

    #[test]
    fn test_admin_bypasses_zone_policy() {
        let zones = Zones {
            zones: vec![everywhere_zone(
                AccessList::Whitelist,
                AccessList::Whitelist,
                Vec::new(),
                Vec::new(),
            )],
            admin: true,
        };
        let ctx = PlacementContext {
            voxels: &NoVoxels,
            entities: &Clear,
            zones: &zones,
        };
        assert!(validate_placement(&ctx, &anyone(), &[body_at(DVec3::ZERO)], &[], 0).allowed());
    }

    #[test]
    fn test_pose_bodies_preserves_relative_layout() {
        let mut bodies = vec![
            body_at(DVec3::new(10.0, 0.0, 0.0)),
            body_at(DVec3::new(14.0, 2.0, 0.0)),
        ];
        let stored: Vec<DVec3> = bodies.iter().map(|b| b.pose.position).collect();
        let anchor = DVec3::new(100.0, 50.0, -20.0);
        pose_bodies_at(&mut bodies, &stored, anchor);
        assert_eq!(bodies[0].pose.position, anchor);
        assert_eq!(
            bodies[1].pose.position - bodies[0].pose.position,
            DVec3::new(4.0, 2.0, 0.0)
        );
    }
}
