//! Whole-buffer codec: a [`SnapshotHeader`] followed by a JSON array of records.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::Result;
use crate::storage::header::{SnapshotHeader, SNAPSHOT_HEADER_SIZE};

pub fn encode<R: Serialize>(items: &[R]) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(items)?;
    let header = SnapshotHeader::for_payload(&payload)?;
    let mut bytes = Vec::with_capacity(SNAPSHOT_HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<R>> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    let payload = &bytes[SNAPSHOT_HEADER_SIZE..];
    header.validate_crc(payload)?;
    Ok(serde_json::from_slice(payload)?)
}
