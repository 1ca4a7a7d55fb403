use crate::core::{Error, Result};

pub const SNAPSHOT_MAGIC: u32 = 0x5453_4C31; // "TSL1"
pub const SNAPSHOT_VERSION: u32 = 1;
pub const SNAPSHOT_HEADER_SIZE: usize = 16;
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

pub const MAGIC_OFFSET: usize = 0;
pub const VERSION_OFFSET: usize = 4;
pub const PAYLOAD_LEN_OFFSET: usize = 8;
pub const CHECKSUM_OFFSET: usize = 12;

/// Fixed header in front of every persisted series snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub payload_len: u32,
    /// CRC32 of the payload bytes.
    pub checksum: u32,
}

impl SnapshotHeader {
    pub fn for_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge);
        }
        Ok(Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            payload_len: payload.len() as u32,
            checksum: Self::crc32(payload),
        })
    }

    pub fn to_bytes(&self) -> [u8; SNAPSHOT_HEADER_SIZE] {
        let mut buf = [0u8; SNAPSHOT_HEADER_SIZE];
        buf[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&self.magic.to_le_bytes());
        buf[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&self.version.to_le_bytes());
        buf[PAYLOAD_LEN_OFFSET..PAYLOAD_LEN_OFFSET + 4]
            .copy_from_slice(&self.payload_len.to_le_bytes());
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Parse and validate magic and version. Checksum is validated separately
    /// against the payload with [`SnapshotHeader::validate_crc`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SNAPSHOT_HEADER_SIZE {
            return Err(Error::Corrupt("snapshot shorter than header"));
        }
        let magic = read_u32(bytes, MAGIC_OFFSET);
        if magic != SNAPSHOT_MAGIC {
            return Err(Error::Corrupt("snapshot magic mismatch"));
        }
        let version = read_u32(bytes, VERSION_OFFSET);
        if version != SNAPSHOT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(Self {
            magic,
            version,
            payload_len: read_u32(bytes, PAYLOAD_LEN_OFFSET),
            checksum: read_u32(bytes, CHECKSUM_OFFSET),
        })
    }

    pub fn crc32(payload: &[u8]) -> u32 {
        use crc32fast::Hasher;
        let mut hasher = Hasher::new();
        hasher.update(payload);
        hasher.finalize()
    }

    pub fn validate_crc(&self, payload: &[u8]) -> Result<()> {
        if payload.len() != self.payload_len as usize {
            return Err(Error::Corrupt("snapshot payload length mismatch"));
        }
        if Self::crc32(payload) == self.checksum {
            Ok(())
        } else {
            Err(Error::Corrupt("crc mismatch"))
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
