//! Source-grid eligibility for the store operation.
//!
//! The client runs this every frame while the player is picking a grid, to
//! color the highlight and explain a refusal; the server runs it once more
//! before packing, so a stale or forged command cannot store what the
//! player could not select.

use garage_core::{EntityId, GarageConfig, HostWorld, PlayerId};
use thiserror::Error;

/// Why a looked-at grid cannot be stored. The message is shown to the
/// player verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectDenied {
    #[error("Cannot store the grid this block is built on")]
    ParentGrid,
    #[error("Cannot store static grids")]
    StaticGrid,
    #[error("Cannot store unowned grids")]
    Unowned,
    #[error("Cannot store grids with blocks owned by another faction")]
    ForeignBlocks,
    #[error("Cannot store a grid while someone is controlling it")]
    Occupied,
    #[error("Storage limit of {0} grids reached")]
    StorageFull(usize),
}

/// Check whether `target` and everything mechanically linked to it may be
/// stored by `requester`. Every grid in the group must pass; returns the
/// group (for highlighting and removal) on success.
pub fn evaluate_target(
    host: &dyn HostWorld,
    config: &GarageConfig,
    requester: PlayerId,
    parent_grid: EntityId,
    target: EntityId,
    stored_count: usize,
) -> Result<Vec<EntityId>, SelectDenied> {
    let group = host.mechanical_group(target);
    for &grid in &group {
        if grid == parent_grid {
            return Err(SelectDenied::ParentGrid);
        }
        if host.is_static(grid) {
            return Err(SelectDenied::StaticGrid);
        }
        let owners = host.big_owners(grid);
        if owners.is_empty() {
            if !config.allow_unowned_grid_storage {
                return Err(SelectDenied::Unowned);
            }
        } else if owners
            .iter()
            .any(|&owner| host.relation(requester, owner).is_foreign())
        {
            return Err(SelectDenied::ForeignBlocks);
        }
        if host.controlling_player(grid).is_some() {
            return Err(SelectDenied::Occupied);
        }
    }
    if stored_count >= config.max_stored_grid_count {
        return Err(SelectDenied::StorageFull(config.max_stored_grid_count));
    }
    Ok(group)
}
