//! Binary blob discipline: bincode then gzip on the way out, gunzip then
//! bincode on the way in, with a fallback to the uncompressed legacy
//! encoding for blobs written before compression was introduced.

use crate::StorageError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

pub fn encode_blob<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let raw = bincode::serialize(value).map_err(StorageError::Encode)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

pub fn decode_blob<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StorageError> {
    let mut decompressed = Vec::new();
    match GzDecoder::new(bytes).read_to_end(&mut decompressed) {
        Ok(_) => bincode::deserialize(&decompressed).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            detail: e.to_string(),
        }),
        Err(_) => {
            // Legacy blobs were written without compression
            tracing::warn!(key, "blob is not gzip, trying uncompressed decode");
            bincode::deserialize(bytes).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                detail: e.to_string(),
            })
        }
    }
}
