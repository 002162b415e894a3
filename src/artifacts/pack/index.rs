//! Pack index (`.idx`) reader
//!
//! ## File Format (Version 2)
//!
//! ```text
//! Header (8 bytes):
//!   - Signature: "\377tOc" (4 bytes)
//!   - Version: 2 (4 bytes)
//!
//! Fan-out table (256 x 4 bytes):
//!   - Entry N: number of objects whose first hash byte is <= N
//!
//! Tables (one row per object, same order):
//!   - Object names, ascending (20 bytes each)
//!   - CRC32 of the packed record (4 bytes each)
//!   - Pack offsets (4 bytes each, MSB set means "see 64-bit table")
//!
//! Trailer (40 bytes):
//!   - SHA-1 of the matching pack file
//!   - SHA-1 of everything above
//! ```
//!
//! All integers are big-endian. The 64-bit offset table used by packs larger
//! than 2 GiB is not supported.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::OBJECT_ID_BYTES;
use crate::artifacts::pack::error::{PackError, PackResult};
use crate::artifacts::pack::varint;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Magic signature identifying version 2+ index files
pub const INDEX_SIGNATURE: [u8; 4] = *b"\xfftOc";

/// Index file format version
pub const INDEX_VERSION: u32 = 2;

const FAN_OUT_ENTRIES: usize = 256;

/// Bytes per object across the name, CRC and offset tables
const ROW_SIZE: usize = OBJECT_ID_BYTES + 4 + 4;

const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackIndexEntry {
    pub oid: ObjectId,
    pub offset: u64,
}

/// Parsed pack index: object ids sorted ascending, each with its pack offset
#[derive(Debug, Clone)]
pub struct PackIndex {
    fan_out: [u32; FAN_OUT_ENTRIES],
    entries: Vec<PackIndexEntry>,
    pack_checksum: Option<ObjectId>,
    checksum_matches: bool,
}

impl PackIndex {
    pub fn open(path: &Path) -> PackResult<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> PackResult<Self> {
        let mut reader = data;

        if reader.len() < INDEX_SIGNATURE.len() || reader[..4] != INDEX_SIGNATURE {
            return Err(PackError::Format("not a Git pack index file".to_string()));
        }
        reader = &reader[4..];

        let version = varint::read_u32_be(&mut reader).map_err(truncated)?;
        if version != INDEX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut fan_out = [0u32; FAN_OUT_ENTRIES];
        let mut previous = 0;
        for (bucket, slot) in fan_out.iter_mut().enumerate() {
            let count = varint::read_u32_be(&mut reader).map_err(truncated)?;
            if count < previous {
                return Err(PackError::Format(format!(
                    "fan-out table decreases at bucket {bucket:02x}"
                )));
            }
            *slot = count;
            previous = count;
        }

        let count = fan_out[FAN_OUT_ENTRIES - 1] as usize;
        if count.checked_mul(ROW_SIZE).is_none_or(|needed| needed > reader.len()) {
            return Err(PackError::Format(format!(
                "index declares {count} objects but is truncated"
            )));
        }

        let mut oids = Vec::with_capacity(count);
        for _ in 0..count {
            oids.push(ObjectId::read_from(&mut reader).map_err(truncated)?);
        }

        // CRCs only matter when copying raw records between packs
        reader = &reader[count * 4..];

        let mut entries: Vec<PackIndexEntry> = Vec::with_capacity(count);
        for (position, oid) in oids.into_iter().enumerate() {
            let offset = varint::read_u32_be(&mut reader).map_err(truncated)?;
            if offset & LARGE_OFFSET_FLAG != 0 {
                return Err(PackError::Format(
                    "64-bit pack offsets are not supported".to_string(),
                ));
            }
            if let Some(previous) = entries.last()
                && previous.oid >= oid
            {
                return Err(PackError::Format(format!(
                    "object names are not strictly ascending at position {position}"
                )));
            }
            let bucket = oid.fan_out_bucket();
            let lower = if bucket == 0 { 0 } else { fan_out[bucket - 1] as usize };
            if position < lower || position >= fan_out[bucket] as usize {
                return Err(PackError::Format(format!(
                    "object {oid} is outside its fan-out bucket"
                )));
            }
            entries.push(PackIndexEntry {
                oid,
                offset: u64::from(offset),
            });
        }

        let (pack_checksum, checksum_matches) = if reader.len() >= 2 * OBJECT_ID_BYTES {
            let body_end = data.len() - reader.len() + OBJECT_ID_BYTES;
            let pack_checksum = ObjectId::read_from(&mut reader).map_err(truncated)?;
            let recorded = &reader[..OBJECT_ID_BYTES];
            let computed = Sha1::digest(&data[..body_end]);
            (Some(pack_checksum), computed.as_slice() == recorded)
        } else {
            (None, false)
        };

        Ok(PackIndex {
            fan_out,
            entries,
            pack_checksum,
            checksum_matches,
        })
    }

    /// Look up the pack offset of `oid`
    ///
    /// The fan-out table narrows the search to the ids sharing the first byte;
    /// a binary search finishes it. Absence is not an error: the object may
    /// live in another pack or be missing from a shallow clone.
    pub fn offset_of(&self, oid: &ObjectId) -> Option<u64> {
        let bucket = oid.fan_out_bucket();
        let start = if bucket == 0 { 0 } else { self.fan_out[bucket - 1] as usize };
        let end = self.fan_out[bucket] as usize;

        let candidates = &self.entries[start..end];
        candidates
            .binary_search_by(|entry| entry.oid.cmp(oid))
            .ok()
            .map(|i| candidates[i].offset)
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.offset_of(oid).is_some()
    }

    pub fn entries(&self) -> &[PackIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative object count for every first-byte bucket
    pub fn fan_out(&self) -> &[u32; FAN_OUT_ENTRIES] {
        &self.fan_out
    }

    /// SHA-1 of the pack file this index describes, if the trailer is present
    pub fn pack_checksum(&self) -> Option<&ObjectId> {
        self.pack_checksum.as_ref()
    }

    /// Whether the trailing index checksum matches the index contents
    pub fn verify_checksum(&self) -> bool {
        self.checksum_matches
    }
}

fn truncated(error: std::io::Error) -> PackError {
    PackError::Format(format!("truncated pack index: {error}"))
}
