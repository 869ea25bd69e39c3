//! Server-side command handling.
//!
//! One session per world. Blocks register here when they enter the world;
//! their records come back from the repository (migrating legacy layouts
//! forward) and go back out on world save. Every mutating command is
//! re-validated server-side, so the client-side passes are advisory only.

use crate::block::GarageBlock;
use crate::placement::{self, PlacementContext, PlacementIssue, Requester};
use crate::selection;
use ahash::AHashMap;
use garage_core::{
    allocate_unique_name, prefab, EntityId, GarageConfig, HostWorld, PlayerId, StorageScope,
    SteamId,
};
use garage_protocol::{Message, PlaceGridData, PreviewGridData, StoreGridData};
use garage_storage::{BlockRecord, PrefabRepository, StorageError, WorldStorage};
use glam::DVec3;

/// Where a reply goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Requester,
    Broadcast,
}

/// Who sent the command being handled.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub player: PlayerId,
    pub steam: SteamId,
}

pub struct GarageSession<S: WorldStorage> {
    config: GarageConfig,
    repo: PrefabRepository<S>,
    blocks: AHashMap<EntityId, GarageBlock>,
}

impl<S: WorldStorage> GarageSession<S> {
    pub fn new(config: GarageConfig, repo: PrefabRepository<S>) -> Self {
        Self {
            config,
            repo,
            blocks: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &GarageConfig {
        &self.config
    }

    pub fn repository(&self) -> &PrefabRepository<S> {
        &self.repo
    }

    pub fn block(&self, entity: EntityId) -> Option<&GarageBlock> {
        self.blocks.get(&entity)
    }

    pub fn block_mut(&mut self, entity: EntityId) -> Option<&mut GarageBlock> {
        self.blocks.get_mut(&entity)
    }

    /// Bring a block online: restore its record (migrating legacy layouts)
    /// or start fresh, then drop any name with no backing file.
    pub fn register_block(
        &mut self,
        entity: EntityId,
        parent_grid: EntityId,
    ) -> Result<(), StorageError> {
        if self.blocks.contains_key(&entity) {
            return Ok(());
        }
        let mut block = match self.repo.load_block_record(entity)? {
            Some(record) => {
                let mut block = GarageBlock::with_scope(
                    entity,
                    parent_grid,
                    StorageScope::Guid(record.scope),
                );
                block.set_grid_names(record.grid_names);
                block
            }
            None => GarageBlock::new(entity, parent_grid),
        };
        self.heal_grid_list(&mut block);
        // restoring state is not a change worth broadcasting
        let _ = block.take_names_update();
        tracing::info!(%entity, grids = block.grid_names().len(), "garage block registered");
        self.blocks.insert(entity, block);
        Ok(())
    }

    pub fn unregister_block(&mut self, entity: EntityId) -> Option<GarageBlock> {
        self.blocks.remove(&entity)
    }

    /// Persist one block's record. Unknown blocks are a no-op.
    pub fn save_block(&mut self, entity: EntityId) -> Result<(), StorageError> {
        let Some(block) = self.blocks.get(&entity) else {
            return Ok(());
        };
        // registered blocks always carry a guid scope; legacy scopes only
        // exist inside the migration path
        let StorageScope::Guid(scope) = block.scope else {
            return Ok(());
        };
        let record = BlockRecord {
            scope,
            grid_names: block.grid_names().to_vec(),
        };
        self.repo.save_block_record(entity, &record)
    }

    /// World-save hook: persist every registered block.
    pub fn save_all(&mut self) -> Result<(), StorageError> {
        let entities: Vec<EntityId> = self.blocks.keys().copied().collect();
        for entity in entities {
            self.save_block(entity)?;
        }
        Ok(())
    }

    /// Handle one client command, returning the replies to route.
    pub fn handle_message(
        &mut self,
        world: &mut dyn HostWorld,
        checks: &PlacementContext<'_>,
        ctx: &RequestContext,
        message: Message,
    ) -> Vec<(Destination, Message)> {
        match message {
            Message::Store(data) => self.handle_store(world, ctx, data),
            Message::Preview(data) => self.handle_preview(data),
            Message::Place(data) => self.handle_place(world, checks, ctx, data),
            Message::RequestSettings => vec![(
                Destination::Requester,
                Message::Settings(self.config.clone()),
            )],
            other => {
                tracing::warn!(?other, "ignoring non-command message");
                Vec::new()
            }
        }
    }

    fn handle_store(
        &mut self,
        world: &mut dyn HostWorld,
        ctx: &RequestContext,
        data: StoreGridData,
    ) -> Vec<(Destination, Message)> {
        let config = self.config.clone();
        let Some(block) = self.blocks.get_mut(&data.garage) else {
            tracing::warn!(garage = %data.garage, "store for unknown block");
            return Vec::new();
        };

        let gate_remaining = block
            .store_gate
            .remaining_ms(data.sent_at_ms, config.command_min_interval_ms);
        if gate_remaining > 0 {
            tracing::debug!(garage = %data.garage, remaining = gate_remaining, "store inside command gate");
            return Vec::new();
        }
        let remaining = block
            .store_cooldown
            .remaining_ms(data.sent_at_ms, config.storage_cooldown_ms());
        if remaining > 0 {
            return reject(
                data.garage,
                format!("Storage cooldown: {}s remaining", remaining.div_ceil(1000)),
            );
        }
        block.store_gate.reset(data.sent_at_ms);

        let group = match selection::evaluate_target(
            world,
            &config,
            ctx.player,
            block.parent_grid,
            data.target,
            block.grid_names().len(),
        ) {
            Ok(group) => group,
            Err(denied) => return reject(data.garage, denied.to_string()),
        };

        let mut stored = match prefab::pack(world, data.target) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(garage = %data.garage, "pack failed: {}", e);
                return reject(data.garage, "Grid could not be stored".into());
            }
        };
        stored.name = allocate_unique_name(&stored.name, block.grid_names());

        if let Err(e) = self.repo.save(block.scope, &stored) {
            tracing::error!(garage = %data.garage, "prefab save failed: {}", e);
            return reject(data.garage, "Storage failure, grid not stored".into());
        }

        let mut names = block.grid_names().to_vec();
        names.push(stored.name.clone());
        block.set_grid_names(names);
        block.store_cooldown.reset(data.sent_at_ms);
        for grid in group {
            world.remove_entity(grid);
        }
        tracing::info!(garage = %data.garage, name = %stored.name, "grid stored");

        match block.take_names_update() {
            Some(update) => vec![(
                Destination::Broadcast,
                Message::GridListUpdate {
                    garage: data.garage,
                    update,
                },
            )],
            None => Vec::new(),
        }
    }

    fn handle_preview(&mut self, data: PreviewGridData) -> Vec<(Destination, Message)> {
        let Some(block) = self.blocks.get_mut(&data.garage) else {
            tracing::warn!(garage = %data.garage, "preview for unknown block");
            return vec![(
                Destination::Requester,
                Message::PreviewReply {
                    garage: data.garage,
                    name: data.name,
                    prefab: None,
                },
            )];
        };

        let loaded = match self.repo.load(block.scope, &data.name) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(garage = %data.garage, name = %data.name, "prefab load failed: {}", e);
                None
            }
        };

        let mut replies = Vec::new();
        if loaded.is_none() {
            tracing::warn!(garage = %data.garage, name = %data.name, "preview for missing prefab, healing list");
            let names: Vec<String> = block
                .grid_names()
                .iter()
                .filter(|name| name.as_str() != data.name)
                .cloned()
                .collect();
            block.set_grid_names(names);
            if let Some(update) = block.take_names_update() {
                replies.push((
                    Destination::Broadcast,
                    Message::GridListUpdate {
                        garage: data.garage,
                        update,
                    },
                ));
            }
        }
        replies.push((
            Destination::Requester,
            Message::PreviewReply {
                garage: data.garage,
                name: data.name,
                prefab: loaded,
            },
        ));
        replies
    }

    fn handle_place(
        &mut self,
        world: &mut dyn HostWorld,
        checks: &PlacementContext<'_>,
        ctx: &RequestContext,
        data: PlaceGridData,
    ) -> Vec<(Destination, Message)> {
        let config = self.config.clone();
        let Some(block) = self.blocks.get_mut(&data.garage) else {
            tracing::warn!(garage = %data.garage, "place for unknown block");
            return Vec::new();
        };

        let gate_remaining = block
            .place_gate
            .remaining_ms(data.sent_at_ms, config.command_min_interval_ms);
        if gate_remaining > 0 {
            tracing::debug!(garage = %data.garage, remaining = gate_remaining, "place inside command gate");
            return Vec::new();
        }
        let cooldown_remaining = block
            .spawn_cooldown
            .remaining_ms(data.sent_at_ms, config.spawn_cooldown_ms());
        if cooldown_remaining > 0 {
            return reject(
                data.garage,
                PlacementIssue::Cooldown {
                    remaining_ms: cooldown_remaining,
                }
                .to_string(),
            );
        }
        block.place_gate.reset(data.sent_at_ms);

        let loaded = match self.repo.load(block.scope, &data.name) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(garage = %data.garage, name = %data.name, "prefab load failed: {}", e);
                None
            }
        };
        let Some(source) = loaded else {
            tracing::warn!(garage = %data.garage, name = %data.name, "place for missing prefab, healing list");
            let names: Vec<String> = block
                .grid_names()
                .iter()
                .filter(|name| name.as_str() != data.name)
                .cloned()
                .collect();
            block.set_grid_names(names);
            let mut replies = reject(
                data.garage,
                format!("Stored grid {} no longer exists", data.name),
            );
            if let Some(update) = block.take_names_update() {
                replies.push((
                    Destination::Broadcast,
                    Message::GridListUpdate {
                        garage: data.garage,
                        update,
                    },
                ));
            }
            return replies;
        };

        let mut bodies = match prefab::unpack(&source) {
            Ok(bodies) => bodies,
            Err(e) => {
                tracing::error!(garage = %data.garage, name = %data.name, "unpack failed: {}", e);
                return reject(data.garage, "Stored grid data is corrupt".into());
            }
        };
        if bodies.is_empty() {
            tracing::warn!(garage = %data.garage, name = %data.name, "stored prefab has no bodies");
            return reject(data.garage, "Nothing to place".into());
        }

        let stored_positions: Vec<DVec3> = bodies.iter().map(|b| b.pose.position).collect();
        placement::pose_bodies_at(&mut bodies, &stored_positions, data.position);
        for body in &mut bodies {
            body.reassign_owner(data.new_owner);
        }

        let requester = Requester {
            player: ctx.player,
            steam: ctx.steam,
            faction: world.faction_of(ctx.player),
        };
        let verdict =
            placement::validate_placement(checks, &requester, &bodies, &[], cooldown_remaining);
        if !verdict.allowed() {
            let reason = verdict
                .blocking_reason()
                .unwrap_or_else(|| "Placement blocked".into());
            return reject(data.garage, reason);
        }

        let mut spawned = Vec::with_capacity(bodies.len());
        for body in &bodies {
            match world.spawn_body(body) {
                Ok(id) => spawned.push(id),
                Err(e) => {
                    tracing::error!(garage = %data.garage, name = %data.name, "spawn failed, rolling back: {}", e);
                    for id in spawned {
                        world.remove_entity(id);
                    }
                    return reject(data.garage, "Placement failed".into());
                }
            }
        }

        if let Err(e) = self.repo.delete(block.scope, &data.name) {
            // the spawn already happened; the stale file gets healed later
            tracing::error!(garage = %data.garage, name = %data.name, "failed to delete placed prefab: {}", e);
        }
        let names: Vec<String> = block
            .grid_names()
            .iter()
            .filter(|name| name.as_str() != data.name)
            .cloned()
            .collect();
        block.set_grid_names(names);
        block.spawn_cooldown.reset(data.sent_at_ms);
        tracing::info!(garage = %data.garage, name = %data.name, grids = spawned.len(), "grid placed");

        match block.take_names_update() {
            Some(update) => vec![(
                Destination::Broadcast,
                Message::GridListUpdate {
                    garage: data.garage,
                    update,
                },
            )],
            None => Vec::new(),
        }
    }

    /// Drop list entries whose backing file is gone, preserving order.
    fn heal_grid_list(&self, block: &mut GarageBlock) {
        let names: Vec<String> = block
            .grid_names()
            .iter()
            .filter(|name| {
                let backed = self.repo.is_backed(block.scope, name.as_str());
                if !backed {
                    tracing::warn!(block = %block.entity, %name, "dropping stored grid with no backing file");
                }
                backed
            })
            .cloned()
            .collect();
        block.set_grid_names(names);
    }
}

fn reject(garage: EntityId, reason: String) -> Vec<(Destination, Message)> {
    vec![(Destination::Requester, Message::Reject { garage, reason })]
}
