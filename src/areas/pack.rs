//! One pack file and its index
//!
//! ## Pack File Format
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "PACK" (4 bytes)
//!   - Version: 2 or 3 (4 bytes)
//!   - Object count (4 bytes)
//!
//! Records (no padding, no count of their own):
//!   - Object header: type and inflated size (variable length)
//!   - Offset deltas: distance back to the base record (variable length)
//!   - Hash deltas: base object id (20 bytes)
//!   - Zlib stream inflating to exactly the header size
//!
//! Trailer:
//!   - SHA-1 of everything above (20 bytes)
//! ```
//!
//! Records are only ever reached through offsets from the index; the pack is
//! never read sequentially.

use crate::artifacts::objects::commit::GitCommit;
use crate::artifacts::objects::object::DecodedObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::cache::{CacheLimits, DecodeCache};
use crate::artifacts::pack::delta::{self, MAX_PREALLOCATION, ObjectSource};
use crate::artifacts::pack::error::{PackError, PackResult};
use crate::artifacts::pack::header::{DeltaBase, ObjectHeader, PackObjectType};
use crate::artifacts::pack::index::PackIndex;
use crate::artifacts::pack::varint;
use bytes::Bytes;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Magic signature at the start of every pack file
pub const PACK_SIGNATURE: [u8; 4] = *b"PACK";

const PACK_HEADER_SIZE: u64 = 12;

#[derive(Debug)]
pub struct Pack {
    name: String,
    path: PathBuf,
    index: PackIndex,
    reader: BufReader<File>,
    version: u32,
    object_count: u32,
    size: u64,
    cache: DecodeCache,
}

impl Pack {
    /// Open a pack given the path of its `.idx`, its `.pack`, or their shared
    /// stem.
    pub fn open(path: &Path) -> PackResult<Self> {
        Self::open_with(path, CacheLimits::default())
    }

    pub fn open_with(path: &Path, limits: CacheLimits) -> PackResult<Self> {
        let stem = path.with_extension("");
        let index_path = stem.with_extension("idx");
        let pack_path = stem.with_extension("pack");
        let name = stem
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let index = PackIndex::open(&index_path)?;
        if !index.verify_checksum() {
            tracing::warn!(index = %index_path.display(), "pack index checksum mismatch");
        }

        let file = File::open(&pack_path)?;
        let size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature).map_err(truncated_header)?;
        if signature != PACK_SIGNATURE {
            return Err(PackError::Format(format!(
                "{} is not a Git pack file",
                pack_path.display()
            )));
        }
        let version = varint::read_u32_be(&mut reader).map_err(truncated_header)?;
        if !matches!(version, 2 | 3) {
            return Err(PackError::UnsupportedVersion(version));
        }
        let object_count = varint::read_u32_be(&mut reader).map_err(truncated_header)?;
        if object_count as usize != index.len() {
            tracing::warn!(
                pack = %pack_path.display(),
                pack_count = object_count,
                index_count = index.len(),
                "pack and index disagree on object count"
            );
        }

        tracing::debug!(pack = %name, objects = index.len(), bytes = size, "opened pack");

        Ok(Pack {
            name,
            path: pack_path,
            index,
            reader,
            version,
            object_count,
            size,
            cache: DecodeCache::new(limits),
        })
    }

    /// File stem shared by the `.idx` and `.pack` files
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Object count declared by the pack header
    pub fn object_count(&self) -> u32 {
        self.object_count
    }

    /// Size of the `.pack` file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset_of(&self, oid: &ObjectId) -> Option<u64> {
        self.index.offset_of(oid)
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.index.contains(oid)
    }

    pub fn read_header(&mut self, offset: u64) -> PackResult<ObjectHeader> {
        if offset < PACK_HEADER_SIZE || offset >= self.size {
            return Err(PackError::corrupt(format!(
                "offset {offset} is outside {}",
                self.path.display()
            )));
        }
        self.reader.seek(SeekFrom::Start(offset))?;
        ObjectHeader::read_from(&mut self.reader, offset)
    }

    /// Read a record header and inflate its payload.
    ///
    /// The zlib stream is not told its compressed length; it has to produce
    /// exactly the size declared in the header. Records with a reserved type
    /// tag are rejected without being inflated.
    pub fn read_payload(&mut self, offset: u64) -> PackResult<(ObjectHeader, Bytes)> {
        let header = self.read_header(offset)?;
        if let PackObjectType::Unsupported(tag) = header.object_type {
            return Err(PackError::corrupt(format!(
                "unsupported object type {tag} at offset {offset}"
            )));
        }

        let mut payload = Vec::with_capacity(header.size.min(MAX_PREALLOCATION) as usize);
        let decoder = flate2::bufread::ZlibDecoder::new(&mut self.reader);
        decoder
            .take(header.size.saturating_add(1))
            .read_to_end(&mut payload)
            .map_err(|source| PackError::Decompression { offset, source })?;

        if payload.len() as u64 != header.size {
            return Err(PackError::corrupt(format!(
                "object at offset {offset} inflates to {} bytes, header says {}",
                payload.len(),
                header.size
            )));
        }

        Ok((header, Bytes::from(payload)))
    }

    /// Fully decode the record at `offset`, replaying delta chains
    pub fn object_at(&mut self, offset: u64) -> PackResult<DecodedObject> {
        delta::resolve(self, offset)
    }

    /// Decode the object `oid`, or `None` if this pack does not hold it
    pub fn object(&mut self, oid: &ObjectId) -> PackResult<Option<DecodedObject>> {
        match self.offset_of(oid) {
            Some(offset) => self.object_at(offset).map(Some),
            None => Ok(None),
        }
    }

    pub fn object_type_at(&mut self, offset: u64) -> PackResult<ObjectType> {
        delta::resolve_type(self, offset)
    }

    pub fn object_size_at(&mut self, offset: u64) -> PackResult<u64> {
        delta::resolve_size(self, offset)
    }

    /// Every commit stored in this pack, in index order.
    ///
    /// Commits that fail to decode are logged and skipped; only failures that
    /// affect the whole pack are returned.
    pub fn commits(&mut self) -> PackResult<Vec<GitCommit>> {
        let entries = self.index.entries().to_vec();
        let mut commits = Vec::new();

        for entry in entries {
            let decoded = self.object_type_at(entry.offset).and_then(|object_type| {
                match object_type {
                    ObjectType::Commit => self.object_at(entry.offset).map(Some),
                    _ => Ok(None),
                }
            });

            match decoded {
                Ok(Some(object)) => commits.push(GitCommit::parse(entry.oid, &object.content)),
                Ok(None) => {}
                Err(e) if e.is_object_local() => {
                    tracing::warn!(pack = %self.name, oid = %entry.oid, error = %e, "skipping unreadable object");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(commits)
    }

    pub fn cache(&self) -> &DecodeCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl ObjectSource for Pack {
    type Location = u64;

    fn read_header(&mut self, at: u64) -> PackResult<ObjectHeader> {
        Pack::read_header(self, at)
    }

    fn read_payload(&mut self, at: u64) -> PackResult<(ObjectHeader, Bytes)> {
        Pack::read_payload(self, at)
    }

    fn base_location(&self, _at: u64, base: &DeltaBase) -> Option<u64> {
        match base {
            DeltaBase::Offset(offset) => Some(*offset),
            DeltaBase::Id(oid) => self.offset_of(oid),
        }
    }

    fn cached(&mut self, at: u64) -> Option<DecodedObject> {
        self.cache.get(at)
    }

    fn remember(&mut self, at: u64, object: &DecodedObject) {
        self.cache.insert(at, object);
    }
}

fn truncated_header(error: std::io::Error) -> PackError {
    PackError::Format(format!("truncated pack header: {error}"))
}
