//! Prefab codec: a structure plus its mechanically-linked sub-grids packed
//! into the storable unit, and back into editable body specs.

use crate::body::BodySpec;
use crate::error::GarageError;
use crate::host::HostWorld;
use crate::ids::EntityId;
use serde::{Deserialize, Serialize};

/// The serialized, storable unit representing one structure and its linked
/// sub-structures. `bodies[0]` is the parent; the rest follow in host
/// enumeration order. Immutable once persisted, until deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefab {
    pub name: String,
    /// Serialized body payloads, opaque to everything but the codec.
    pub bodies: Vec<String>,
}

impl Prefab {
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

pub fn encode_body(spec: &BodySpec) -> Result<String, GarageError> {
    Ok(serde_json::to_string(spec)?)
}

pub fn decode_body(payload: &str) -> Result<BodySpec, GarageError> {
    Ok(serde_json::from_str(payload)?)
}

/// Serialize `target` and its mechanical group into a prefab. Fails if the
/// target no longer resolves to a live structure.
pub fn pack(host: &dyn HostWorld, target: EntityId) -> Result<Prefab, GarageError> {
    if !host.structure_exists(target) {
        return Err(GarageError::StructureGone(target));
    }

    let name = host
        .display_name(target)
        .unwrap_or_else(|| format!("Grid {}", target));

    let mut bodies = Vec::new();
    bodies.push(host.serialize_body(target)?);
    for peer in host.mechanical_group(target) {
        if peer != target {
            bodies.push(host.serialize_body(peer)?);
        }
    }

    Ok(Prefab { name, bodies })
}

/// Decode every stored body back to an editable spec, normalized for spawn:
/// zero velocity, no mirror planes, non-static, physics enabled, respawn
/// flag and seat occupants cleared. An empty body list yields an empty Vec;
/// callers treat that as nothing to place, not an error.
pub fn unpack(prefab: &Prefab) -> Result<Vec<BodySpec>, GarageError> {
    let mut specs = Vec::with_capacity(prefab.bodies.len());
    for payload in &prefab.bodies {
        let mut spec = decode_body(payload)?;
        spec.normalize_for_spawn();
        specs.push(spec);
    }
    Ok(specs)
}
