//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20-byte SHA-1 digests, shown as 40 lowercase hex characters.
//! Pack indexes store them in raw binary form sorted by their numeric value,
//! which is exactly the byte-wise ordering derived here.

use crate::artifacts::objects::{OBJECT_ID_BYTES, OBJECT_ID_LENGTH};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    /// Parse and validate an object ID from its hex form
    ///
    /// # Arguments
    ///
    /// * `id` - 40-character hexadecimal string
    pub fn try_parse(id: &str) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        hex::decode_to_slice(id, &mut bytes)
            .map_err(|_| anyhow::anyhow!("Invalid object ID characters: {}", id))?;

        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Read an object ID from its binary form (20 bytes)
    ///
    /// Used for index hash tables, tree entries and hash-delta base references.
    pub fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_BYTES] {
        &self.0
    }

    /// First byte of the ID, the bucket used by pack index fan-out tables
    pub fn fan_out_bucket(&self) -> usize {
        usize::from(self.0[0])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated form used in log output
    pub fn to_short_oid(&self) -> String {
        let mut short = self.to_hex();
        short.truncate(7);
        short
    }

    /// Relative path of the loose object file, `ab/cdef...`
    pub fn to_loose_path(&self) -> std::path::PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        std::path::PathBuf::from(dir).join(file)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::try_parse(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
