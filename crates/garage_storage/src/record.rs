//! Per-block persisted records.
//!
//! Current layout: a `BlockRecord` holding the block's stable GUID scope
//! and its grid-name list, with prefab bodies stored as separate
//! `{scope}_{name}` files. Legacy layout: prefabs inlined in the record
//! and/or files keyed by the volatile entity id; read-only, migrated
//! forward on first load.

use garage_core::Prefab;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current per-block record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub scope: Uuid,
    pub grid_names: Vec<String>,
}

/// Legacy per-block record. `stored` carries inline prefabs from the oldest
/// layout; `grid_names` carries names whose bodies live in entity-id-keyed
/// files from the intermediate layout. Either list may be empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyRecord {
    #[serde(default)]
    pub stored: Vec<Prefab>,
    #[serde(default)]
    pub grid_names: Vec<String>,
}

/// Tagged on-disk envelope so current and legacy layouts can share the
/// block's fixed storage key. Genuinely old files predate the envelope and
/// decode as a bare `LegacyRecord` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockBlob {
    Legacy(LegacyRecord),
    Current(BlockRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{decode_blob, encode_blob};

    #[test]
    fn test_envelope_round_trip() {
        let record = BlockRecord {
            scope: Uuid::new_v4(),
            grid_names: vec!["Freighter".into(), "Miner".into()],
        };
        let bytes = encode_blob(&BlockBlob::Current(record.clone())).unwrap();
        match decode_blob::<BlockBlob>("k", &bytes).unwrap() {
            BlockBlob::Current(read) => assert_eq!(read, record),
            other => panic!("unexpected blob: {:?}", other),
        }
    }

    #[test]
    fn test_bare_legacy_record_still_decodes() {
        let legacy = LegacyRecord {
            stored: vec![Prefab {
                name: "Old".into(),
                bodies: vec!["{}".into()],
            }],
            grid_names: Vec::new(),
        };
        // Written by a version that predates the envelope
        let bytes = encode_blob(&legacy).unwrap();
        assert!(decode_blob::<BlockBlob>("k", &bytes).is_err());
        let read: LegacyRecord = decode_blob("k", &bytes).unwrap();
        assert_eq!(read, legacy);
    }
}
