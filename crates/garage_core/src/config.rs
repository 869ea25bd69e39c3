//! Server-authoritative garage configuration.
//!
//! Loaded from `config/garage.json` on the server (created with defaults if
//! missing) and pushed to clients on join.

use crate::error::GarageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageConfig {
    /// Seconds a block must wait between accepted store operations.
    pub storage_cooldown_secs: f64,

    /// Seconds a block must wait between accepted place operations.
    pub spawn_cooldown_secs: f64,

    /// Minimum milliseconds between mutating commands of the same kind for
    /// the same block, measured on the request-carried timestamp.
    pub command_min_interval_ms: u64,

    /// Maximum camera distance from the block while in spectator mode.
    pub camera_orbit_distance: f64,

    /// Upper bound for the scroll-adjustable placement distance.
    pub camera_placement_distance: f64,

    /// Maximum number of prefabs one block may hold.
    pub max_stored_grid_count: usize,

    /// Whether grids without any owning player may be stored.
    pub allow_unowned_grid_storage: bool,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            storage_cooldown_secs: 30.0,
            spawn_cooldown_secs: 30.0,
            command_min_interval_ms: 200,
            camera_orbit_distance: 1000.0,
            camera_placement_distance: 500.0,
            max_stored_grid_count: 10,
            allow_unowned_grid_storage: false,
        }
    }
}

impl GarageConfig {
    pub fn storage_cooldown_ms(&self) -> u64 {
        (self.storage_cooldown_secs * 1000.0) as u64
    }

    pub fn spawn_cooldown_ms(&self) -> u64 {
        (self.spawn_cooldown_secs * 1000.0) as u64
    }

    /// Load configuration from `path`, or create the file with defaults if
    /// it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self, GarageError> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| GarageError::Config(format!("failed to read {:?}: {}", path, e)))?;
            let config: GarageConfig = serde_json::from_str(&content)
                .map_err(|e| GarageError::Config(format!("failed to parse {:?}: {}", path, e)))?;
            tracing::info!(path = %path.display(), "loaded garage config");
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "garage config missing, wrote defaults");
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), GarageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| GarageError::Config(format!("failed to create {:?}: {}", parent, e)))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GarageError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| GarageError::Config(format!("failed to write {:?}: {}", path, e)))?;
        Ok(())
    }
}
