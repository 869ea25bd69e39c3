//! The garage block state machine.
//!
//! One instance per physical block, on both server and client. Interaction
//! (spectator selection, preview positioning) runs wherever the local
//! player is; the block never touches the engine directly and instead
//! returns [`BlockAction`]s for the host integration to carry out. Grid
//! commands always go through [`BlockAction::Send`]; a hosting player's
//! embedding loops them straight back into the server session.

use crate::build::PreviewBuild;
use crate::placement::{self, PlacementContext, Requester};
use crate::selection::{self, SelectDenied};
use garage_core::{
    BodySpec, Cooldown, EntityId, GarageConfig, HostWorld, Pose, Prefab, StorageScope, SyncUpdate,
    Synced,
};
use garage_protocol::{Message, PlaceGridData, PreviewGridData, StoreGridData};
use glam::DVec3;

/// How far the selection ray reaches while picking a source grid.
pub const SELECT_RANGE: f64 = 500.0;

/// Placement distance when destination selection starts.
const PLACEMENT_START_DISTANCE: f64 = 100.0;

/// Scroll wheel to placement-distance scale.
const SCROLL_STEP: f64 = 0.25;

/// Per-frame local input relevant to the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub camera: Pose,
    /// Left click.
    pub confirm: bool,
    /// Right click.
    pub cancel: bool,
    pub scroll_delta: f64,
    pub now_ms: u64,
}

/// Side effect for the host integration to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockAction {
    /// Route a command toward the server (loop back locally when hosting).
    Send(Message),
    EnterSpectator,
    ReleaseCamera,
    Highlight { ids: Vec<EntityId>, valid: bool },
    ClearHighlight { ids: Vec<EntityId> },
    /// Create preview entities for these bodies; report their ids back
    /// through [`GarageBlock::preview_spawned`].
    SpawnPreview { bodies: Vec<BodySpec> },
    DiscardPreview { ids: Vec<EntityId> },
    Notify { text: String, warning: bool },
}

enum Mode {
    Idle,
    SelectingSource {
        target: Option<EntityId>,
        group: Vec<EntityId>,
        denied: Option<SelectDenied>,
    },
    SelectingDestination {
        name: String,
        stage: Stage,
    },
}

enum Stage {
    /// Waiting for the server's prefab payload.
    AwaitingPayload,
    /// Unpacking on the worker thread.
    Building(PreviewBuild),
    /// Preview follows the camera until confirmed or cancelled.
    Positioning {
        bodies: Vec<BodySpec>,
        stored_positions: Vec<DVec3>,
        preview_ids: Vec<EntityId>,
    },
}

pub struct GarageBlock {
    pub entity: EntityId,
    pub parent_grid: EntityId,
    pub scope: StorageScope,
    grid_names: Synced<Vec<String>>,
    display_hologram: Synced<bool>,
    pub store_cooldown: Cooldown,
    pub spawn_cooldown: Cooldown,
    pub(crate) store_gate: Cooldown,
    pub(crate) place_gate: Cooldown,
    placement_distance: f64,
    selected: Option<String>,
    mode: Mode,
}

impl GarageBlock {
    pub fn new(entity: EntityId, parent_grid: EntityId) -> Self {
        Self::with_scope(entity, parent_grid, StorageScope::fresh())
    }

    /// Construct with a known scope, the load-from-record path.
    pub fn with_scope(entity: EntityId, parent_grid: EntityId, scope: StorageScope) -> Self {
        Self {
            entity,
            parent_grid,
            scope,
            grid_names: Synced::new(Vec::new()),
            display_hologram: Synced::new(false),
            store_cooldown: Cooldown::new(),
            spawn_cooldown: Cooldown::new(),
            store_gate: Cooldown::new(),
            place_gate: Cooldown::new(),
            placement_distance: PLACEMENT_START_DISTANCE,
            selected: None,
            mode: Mode::Idle,
        }
    }

    pub fn grid_names(&self) -> &[String] {
        self.grid_names.get()
    }

    /// Replace the name list (list-owner side). A terminal selection that
    /// no longer resolves is dropped.
    pub fn set_grid_names(&mut self, names: Vec<String>) -> bool {
        let changed = self.grid_names.set(names);
        self.drop_stale_selection();
        changed
    }

    pub fn take_names_update(&mut self) -> Option<SyncUpdate<Vec<String>>> {
        self.grid_names.take_update()
    }

    pub fn apply_names_update(&mut self, update: SyncUpdate<Vec<String>>) -> bool {
        let applied = self.grid_names.apply(update);
        if applied {
            self.drop_stale_selection();
        }
        applied
    }

    pub fn hologram_enabled(&self) -> bool {
        *self.display_hologram.get()
    }

    pub fn set_hologram(&mut self, enabled: bool) -> bool {
        self.display_hologram.set(enabled)
    }

    pub fn take_hologram_update(&mut self) -> Option<SyncUpdate<bool>> {
        self.display_hologram.take_update()
    }

    pub fn apply_hologram_update(&mut self, update: SyncUpdate<bool>) -> bool {
        self.display_hologram.apply(update)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Pick a stored grid in the terminal list. Unknown names are ignored.
    pub fn select(&mut self, name: &str) -> bool {
        if self.grid_names.get().iter().any(|n| n == name) {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.mode, Mode::Idle)
    }

    /// Enter spectator selection of a grid to store.
    pub fn begin_source_selection(&mut self) -> Vec<BlockAction> {
        let mut actions = self.reset_view();
        self.mode = Mode::SelectingSource {
            target: None,
            group: Vec::new(),
            denied: None,
        };
        actions.push(BlockAction::EnterSpectator);
        actions
    }

    /// Enter spectator placement of the selected stored grid. Requests the
    /// prefab payload from the server first.
    pub fn begin_placement(&mut self) -> Vec<BlockAction> {
        let Some(name) = self.selected.clone() else {
            return vec![BlockAction::Notify {
                text: "Select a stored grid first".into(),
                warning: true,
            }];
        };
        let mut actions = self.reset_view();
        self.placement_distance = PLACEMENT_START_DISTANCE;
        self.mode = Mode::SelectingDestination {
            name: name.clone(),
            stage: Stage::AwaitingPayload,
        };
        actions.push(BlockAction::EnterSpectator);
        actions.push(BlockAction::Send(Message::Preview(PreviewGridData {
            garage: self.entity,
            scope: self.scope,
            name,
        })));
        actions
    }

    /// Feed the server's answer to a preview request. Replies for a name we
    /// are no longer waiting on are ignored.
    pub fn preview_payload(&mut self, name: &str, prefab: Option<Prefab>) -> Vec<BlockAction> {
        let waiting = matches!(
            &self.mode,
            Mode::SelectingDestination { name: expected, stage: Stage::AwaitingPayload }
                if expected == name
        );
        if !waiting {
            tracing::debug!(name, "stale preview payload ignored");
            return Vec::new();
        }
        match prefab {
            Some(source) => {
                if let Mode::SelectingDestination { stage, .. } = &mut self.mode {
                    *stage = Stage::Building(PreviewBuild::start(source));
                }
                Vec::new()
            }
            None => {
                let mut actions = vec![BlockAction::Notify {
                    text: format!("Stored grid {} no longer exists", name),
                    warning: true,
                }];
                actions.extend(self.reset_view());
                actions
            }
        }
    }

    /// Host integration reports the entities it created for a
    /// [`BlockAction::SpawnPreview`].
    pub fn preview_spawned(&mut self, ids: Vec<EntityId>) {
        if let Mode::SelectingDestination {
            stage: Stage::Positioning { preview_ids, .. },
            ..
        } = &mut self.mode
        {
            *preview_ids = ids;
        }
    }

    /// Abort whatever interaction is in progress.
    pub fn cancel(&mut self) -> Vec<BlockAction> {
        self.reset_view()
    }

    /// Drive the interaction one frame. A no-op while idle.
    pub fn tick(
        &mut self,
        host: &dyn HostWorld,
        checks: &PlacementContext<'_>,
        requester: &Requester,
        config: &GarageConfig,
        input: &TickInput,
    ) -> Vec<BlockAction> {
        if self.is_idle() {
            return Vec::new();
        }
        if input.cancel || self.out_of_range(host, &input.camera, config) {
            return self.reset_view();
        }

        let mut actions = Vec::new();
        let mut finish = false;

        match &mut self.mode {
            Mode::Idle => {}
            Mode::SelectingSource {
                target,
                group,
                denied,
            } => {
                let hit =
                    host.raycast_structure(input.camera.position, input.camera.forward, SELECT_RANGE);
                if hit != *target {
                    if !group.is_empty() {
                        actions.push(BlockAction::ClearHighlight { ids: group.clone() });
                    }
                    *target = hit;
                    *group = Vec::new();
                    *denied = None;
                    if let Some(structure) = hit {
                        match selection::evaluate_target(
                            host,
                            config,
                            requester.player,
                            self.parent_grid,
                            structure,
                            self.grid_names.get().len(),
                        ) {
                            Ok(found) => *group = found,
                            Err(reason) => {
                                // highlight the whole group red anyway
                                *group = host.mechanical_group(structure);
                                *denied = Some(reason);
                            }
                        }
                    }
                }
                if target.is_some() {
                    actions.push(BlockAction::Highlight {
                        ids: group.clone(),
                        valid: denied.is_none(),
                    });
                    match denied {
                        Some(reason) => actions.push(BlockAction::Notify {
                            text: reason.to_string(),
                            warning: true,
                        }),
                        None => {
                            if input.confirm {
                                let remaining = self.store_cooldown.remaining_ms(
                                    input.now_ms,
                                    config.storage_cooldown_ms(),
                                );
                                if remaining > 0 {
                                    actions.push(BlockAction::Notify {
                                        text: format!(
                                            "Storage cooldown: {}s remaining",
                                            remaining.div_ceil(1000)
                                        ),
                                        warning: true,
                                    });
                                } else if let Some(structure) = *target {
                                    actions.push(BlockAction::Send(Message::Store(
                                        StoreGridData {
                                            garage: self.entity,
                                            scope: self.scope,
                                            target: structure,
                                            sent_at_ms: input.now_ms,
                                        },
                                    )));
                                    self.store_cooldown.reset(input.now_ms);
                                    finish = true;
                                }
                            }
                        }
                    }
                }
            }
            Mode::SelectingDestination { name, stage } => match stage {
                Stage::AwaitingPayload => {
                    actions.push(BlockAction::Notify {
                        text: format!("Requesting {}...", name),
                        warning: false,
                    });
                }
                Stage::Building(build) => match build.poll() {
                    Some(bodies) if bodies.is_empty() => {
                        actions.push(BlockAction::Notify {
                            text: "Nothing to place".into(),
                            warning: true,
                        });
                        finish = true;
                    }
                    Some(bodies) => {
                        let stored_positions =
                            bodies.iter().map(|b| b.pose.position).collect();
                        actions.push(BlockAction::SpawnPreview {
                            bodies: bodies.clone(),
                        });
                        *stage = Stage::Positioning {
                            bodies,
                            stored_positions,
                            preview_ids: Vec::new(),
                        };
                    }
                    None => {
                        actions.push(BlockAction::Notify {
                            text: "Building preview...".into(),
                            warning: false,
                        });
                    }
                },
                Stage::Positioning {
                    bodies,
                    stored_positions,
                    preview_ids,
                } => {
                    self.placement_distance = (self.placement_distance
                        + input.scroll_delta * SCROLL_STEP)
                        .clamp(0.0, config.camera_placement_distance);
                    let anchor =
                        input.camera.position + input.camera.forward * self.placement_distance;
                    placement::pose_bodies_at(bodies, stored_positions, anchor);

                    let verdict = placement::validate_placement(
                        checks,
                        requester,
                        bodies,
                        preview_ids,
                        self.spawn_cooldown
                            .remaining_ms(input.now_ms, config.spawn_cooldown_ms()),
                    );
                    if !preview_ids.is_empty() {
                        actions.push(BlockAction::Highlight {
                            ids: preview_ids.clone(),
                            valid: verdict.allowed(),
                        });
                    }
                    for issue in &verdict.issues {
                        actions.push(BlockAction::Notify {
                            text: issue.to_string(),
                            warning: issue.is_blocking(),
                        });
                    }
                    if input.confirm && verdict.allowed() {
                        actions.push(BlockAction::Send(Message::Place(PlaceGridData {
                            garage: self.entity,
                            scope: self.scope,
                            name: name.clone(),
                            position: anchor,
                            new_owner: requester.player,
                            sent_at_ms: input.now_ms,
                        })));
                        self.spawn_cooldown.reset(input.now_ms);
                        finish = true;
                    }
                }
            },
        }

        if finish {
            actions.extend(self.reset_view());
        }
        actions
    }

    fn out_of_range(&self, host: &dyn HostWorld, camera: &Pose, config: &GarageConfig) -> bool {
        match host.entity_position(self.entity) {
            Some(position) => position.distance(camera.position) > config.camera_orbit_distance,
            // block died under the player
            None => true,
        }
    }

    /// Tear down whatever the current interaction created and go idle.
    fn reset_view(&mut self) -> Vec<BlockAction> {
        let mut actions = Vec::new();
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => return actions,
            Mode::SelectingSource { group, .. } => {
                if !group.is_empty() {
                    actions.push(BlockAction::ClearHighlight { ids: group });
                }
            }
            Mode::SelectingDestination { stage, .. } => match stage {
                Stage::AwaitingPayload => {}
                Stage::Building(build) => build.cancel(),
                Stage::Positioning { preview_ids, .. } => {
                    if !preview_ids.is_empty() {
                        actions.push(BlockAction::DiscardPreview { ids: preview_ids });
                    }
                }
            },
        }
        actions.push(BlockAction::ReleaseCamera);
        actions
    }

    fn drop_stale_selection(&mut self) {
        if let Some(selected) = &self.selected {
            if !self.grid_names.get().contains(selected) {
                self.selected = None;
            }
        }
    }
}
