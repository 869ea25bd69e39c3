//! Wire format for the garage command surface.
//!
//! Messages are flat structs of primitive fields exchanged over the host's
//! app-level command channel; transport, reliable delivery and dispatch
//! registration belong to the host. Payloads live for exactly one
//! request/response round trip.

use garage_core::{EntityId, GarageConfig, PlayerId, Prefab, StorageScope, SyncUpdate};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] bincode::Error),
}

/// Store the structure `target` into the garage block. `sent_at_ms` is the
/// sender's wall clock; the server gates on it, not on receipt time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreGridData {
    pub garage: EntityId,
    pub scope: StorageScope,
    pub target: EntityId,
    pub sent_at_ms: u64,
}

/// Ask the server for a prefab's body payloads so the client can build a
/// local preview. Not cooldown-gated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewGridData {
    pub garage: EntityId,
    pub scope: StorageScope,
    pub name: String,
}

/// Commit a placement at the chosen position, reassigning ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceGridData {
    pub garage: EntityId,
    pub scope: StorageScope,
    pub name: String,
    pub position: DVec3,
    pub new_owner: PlayerId,
    pub sent_at_ms: u64,
}

/// Protocol messages exchanged between client and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    // Client to Server
    Store(StoreGridData),
    Preview(PreviewGridData),
    Place(PlaceGridData),
    RequestSettings,

    // Server to Client
    PreviewReply {
        garage: EntityId,
        name: String,
        prefab: Option<Prefab>,
    },
    GridListUpdate {
        garage: EntityId,
        update: SyncUpdate<Vec<String>>,
    },
    Settings(GarageConfig),
    Reject {
        garage: EntityId,
        reason: String,
    },
}

pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(message).map_err(ProtocolError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}
