//! Pack object record headers
//!
//! Each record in a pack starts with a variable-length header carrying the
//! object type and its inflated size. Delta records follow it with a reference
//! to their base: a backwards distance for offset deltas or a 20-byte object
//! id for hash deltas. The zlib stream starts right after.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::error::{PackError, PackResult};
use crate::artifacts::pack::varint;
use std::io::Read;

/// Type tag stored in the three type bits of a record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
    OfsDelta,
    RefDelta,
    /// Tags 0 and 5 are reserved; such records are never inflated
    Unsupported(u8),
}

impl PackObjectType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => PackObjectType::Commit,
            2 => PackObjectType::Tree,
            3 => PackObjectType::Blob,
            4 => PackObjectType::Tag,
            6 => PackObjectType::OfsDelta,
            7 => PackObjectType::RefDelta,
            other => PackObjectType::Unsupported(other),
        }
    }

    /// The stored object type, or `None` for deltas and reserved tags
    pub fn object_type(&self) -> Option<ObjectType> {
        match self {
            PackObjectType::Commit => Some(ObjectType::Commit),
            PackObjectType::Tree => Some(ObjectType::Tree),
            PackObjectType::Blob => Some(ObjectType::Blob),
            PackObjectType::Tag => Some(ObjectType::Tag),
            _ => None,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, PackObjectType::OfsDelta | PackObjectType::RefDelta)
    }
}

impl From<ObjectType> for PackObjectType {
    fn from(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Commit => PackObjectType::Commit,
            ObjectType::Tree => PackObjectType::Tree,
            ObjectType::Blob => PackObjectType::Blob,
            ObjectType::Tag => PackObjectType::Tag,
        }
    }
}

/// Where a delta record finds its base object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeltaBase {
    /// Absolute offset of the base within the same pack
    Offset(u64),
    /// Object id of the base, which may live in any pack
    Id(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub object_type: PackObjectType,
    /// Inflated size of the payload; for deltas, the size of the delta stream
    pub size: u64,
    /// Offset of the record itself
    pub offset: u64,
    /// Offset of the first compressed byte
    pub payload_offset: u64,
    pub delta_base: Option<DeltaBase>,
}

impl ObjectHeader {
    /// Decode a record header from `reader`, positioned at `offset`.
    ///
    /// Consumes the type/size bytes plus any delta base reference, leaving the
    /// reader at the start of the zlib stream.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R, offset: u64) -> PackResult<Self> {
        let mut counting = CountingReader::new(reader);

        let (tag, size) = varint::read_type_and_size(&mut counting).map_err(|e| {
            PackError::corrupt(format!("unreadable object header at offset {offset}: {e}"))
        })?;
        let object_type = PackObjectType::from_tag(tag);

        let delta_base = match object_type {
            PackObjectType::OfsDelta => {
                let distance = varint::read_base_distance(&mut counting).map_err(|e| {
                    PackError::corrupt(format!("unreadable delta base at offset {offset}: {e}"))
                })?;
                if distance == 0 || distance > offset {
                    return Err(PackError::corrupt(format!(
                        "delta at offset {offset} points {distance} bytes back"
                    )));
                }
                Some(DeltaBase::Offset(offset - distance))
            }
            PackObjectType::RefDelta => {
                let id = ObjectId::read_from(&mut counting).map_err(|e| {
                    PackError::corrupt(format!("unreadable delta base at offset {offset}: {e}"))
                })?;
                Some(DeltaBase::Id(id))
            }
            _ => None,
        };

        Ok(ObjectHeader {
            object_type,
            size,
            offset,
            payload_offset: offset + counting.consumed,
            delta_base,
        })
    }
}

struct CountingReader<'r, R: Read + ?Sized> {
    inner: &'r mut R,
    consumed: u64,
}

impl<'r, R: Read + ?Sized> CountingReader<'r, R> {
    fn new(inner: &'r mut R) -> Self {
        CountingReader { inner, consumed: 0 }
    }
}

impl<R: Read + ?Sized> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}
