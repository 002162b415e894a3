//! Delta decoding and delta chain resolution
//!
//! Once inflated, both offset deltas and hash deltas carry the same payload:
//!
//! ```text
//! <source length: 7-bit varint> <target length: 7-bit varint>
//! <instruction>*
//!
//! copy:   1oooosss [offset bytes...] [size bytes...]
//!         bits 0-3 select which of 4 little-endian offset bytes follow,
//!         bits 4-6 select which of 3 little-endian size bytes follow,
//!         a size of zero means 0x10000
//! insert: 0nnnnnnn followed by n literal bytes (n > 0)
//! ```
//!
//! The opcode byte `0x00` is reserved and rejected.
//!
//! A delta's base may itself be a delta. [`resolve`] walks the chain down to
//! a whole object and replays the deltas back up, guarding against cycles that
//! only a corrupt pack could contain.

use crate::artifacts::objects::object::DecodedObject;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::error::{PackError, PackResult};
use crate::artifacts::pack::header::{DeltaBase, ObjectHeader};
use crate::artifacts::pack::varint;
use bytes::Bytes;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Longest delta chain followed before the pack is declared corrupt
pub const MAX_DELTA_DEPTH: usize = 4096;

/// Upper bound on the buffer reserved up front for one inflated or rebuilt
/// object
pub const MAX_PREALLOCATION: u64 = 1 << 20;

const COPY_ZERO_SIZE: u64 = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaInstruction {
    /// Copy `length` bytes of the base starting at `offset`
    Copy { offset: u64, length: u64 },
    /// Append literal bytes carried by the delta itself
    Insert(Bytes),
}

/// A parsed delta payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub source_length: u64,
    pub target_length: u64,
    pub instructions: Vec<DeltaInstruction>,
}

impl Delta {
    /// Decode every instruction of an inflated delta payload.
    ///
    /// Copies reaching past the declared source length are rejected here, so a
    /// successfully parsed delta can only fail to apply against a base of the
    /// wrong size.
    pub fn parse(payload: &Bytes) -> PackResult<Self> {
        let mut reader = &payload[..];
        let source_length = varint::read_size(&mut reader).map_err(bad_size)?;
        let target_length = varint::read_size(&mut reader).map_err(bad_size)?;

        let mut instructions = Vec::new();
        let mut produced = 0u64;
        let mut position = payload.len() - reader.len();

        while position < payload.len() {
            let opcode = payload[position];
            position += 1;

            let instruction = if opcode & 0x80 != 0 {
                let mut offset = 0u64;
                for (i, bit) in [0x01, 0x02, 0x04, 0x08].into_iter().enumerate() {
                    if opcode & bit != 0 {
                        offset |= u64::from(next_byte(payload, &mut position)?) << (8 * i);
                    }
                }
                let mut length = 0u64;
                for (i, bit) in [0x10, 0x20, 0x40].into_iter().enumerate() {
                    if opcode & bit != 0 {
                        length |= u64::from(next_byte(payload, &mut position)?) << (8 * i);
                    }
                }
                if length == 0 {
                    length = COPY_ZERO_SIZE;
                }
                if offset + length > source_length {
                    return Err(PackError::corrupt(format!(
                        "delta copies {length} bytes at {offset} from a {source_length} byte base"
                    )));
                }
                produced += length;
                DeltaInstruction::Copy { offset, length }
            } else if opcode != 0 {
                let length = usize::from(opcode);
                if position + length > payload.len() {
                    return Err(PackError::corrupt("delta insert runs past end of payload"));
                }
                produced += length as u64;
                let literal = payload.slice(position..position + length);
                position += length;
                DeltaInstruction::Insert(literal)
            } else {
                return Err(PackError::corrupt("reserved delta opcode 0x00"));
            };

            instructions.push(instruction);
        }

        if produced != target_length {
            return Err(PackError::corrupt(format!(
                "delta produces {produced} bytes but declares {target_length}"
            )));
        }

        Ok(Delta {
            source_length,
            target_length,
            instructions,
        })
    }

    /// Read only the declared target length of a delta payload
    pub fn target_length(payload: &[u8]) -> PackResult<u64> {
        let mut reader = payload;
        varint::read_size(&mut reader).map_err(bad_size)?;
        varint::read_size(&mut reader).map_err(bad_size)
    }

    /// Rebuild the target object from `base`
    pub fn apply(&self, base: &[u8]) -> PackResult<Vec<u8>> {
        if base.len() as u64 != self.source_length {
            return Err(PackError::corrupt(format!(
                "delta expects a {} byte base, found {} bytes",
                self.source_length,
                base.len()
            )));
        }

        let mut target = Vec::with_capacity(self.target_length.min(MAX_PREALLOCATION) as usize);
        for instruction in &self.instructions {
            match instruction {
                DeltaInstruction::Copy { offset, length } => {
                    // bounds were checked against source_length while parsing
                    let start = *offset as usize;
                    target.extend_from_slice(&base[start..start + *length as usize]);
                }
                DeltaInstruction::Insert(literal) => target.extend_from_slice(literal),
            }
        }

        Ok(target)
    }
}

fn next_byte(payload: &[u8], position: &mut usize) -> PackResult<u8> {
    let byte = payload
        .get(*position)
        .copied()
        .ok_or_else(|| PackError::corrupt("delta copy instruction truncated"))?;
    *position += 1;
    Ok(byte)
}

fn bad_size(error: std::io::Error) -> PackError {
    PackError::corrupt(format!("unreadable delta size: {error}"))
}

/// Random access to packed records, as needed to follow delta chains
///
/// Implemented by a single pack (locations are offsets) and by a whole
/// repository (locations also name the pack, so hash deltas can cross packs).
pub trait ObjectSource {
    type Location: Copy + Eq + Hash + Debug;

    fn read_header(&mut self, at: Self::Location) -> PackResult<ObjectHeader>;

    /// Read the header and the inflated payload of the record at `at`.
    ///
    /// For deltas the payload is the raw delta stream.
    fn read_payload(&mut self, at: Self::Location) -> PackResult<(ObjectHeader, Bytes)>;

    /// Where the base of the delta stored at `at` lives
    fn base_location(&self, at: Self::Location, base: &DeltaBase) -> Option<Self::Location>;

    fn cached(&mut self, _at: Self::Location) -> Option<DecodedObject> {
        None
    }

    fn remember(&mut self, _at: Self::Location, _object: &DecodedObject) {}
}

fn next_in_chain<S: ObjectSource + ?Sized>(
    source: &S,
    at: S::Location,
    header: &ObjectHeader,
) -> PackResult<S::Location> {
    match &header.delta_base {
        Some(base) => source.base_location(at, base).ok_or_else(|| match base {
            DeltaBase::Id(id) => PackError::MissingBase(*id),
            DeltaBase::Offset(offset) => {
                PackError::corrupt(format!("delta base offset {offset} is not a record"))
            }
        }),
        None => Err(PackError::corrupt(format!(
            "unsupported object type {:?} at {at:?}",
            header.object_type
        ))),
    }
}

/// Fully decode the object stored at `at`, replaying any delta chain.
pub fn resolve<S: ObjectSource + ?Sized>(
    source: &mut S,
    at: S::Location,
) -> PackResult<DecodedObject> {
    let mut pending: Vec<(S::Location, Bytes)> = Vec::new();
    let mut visited = HashSet::new();
    let mut current = at;

    let mut object = loop {
        if let Some(hit) = source.cached(current) {
            break hit;
        }
        if !visited.insert(current) {
            return Err(PackError::corrupt(format!(
                "delta cycle through {current:?}"
            )));
        }
        if pending.len() >= MAX_DELTA_DEPTH {
            return Err(PackError::corrupt(format!(
                "delta chain from {at:?} is deeper than {MAX_DELTA_DEPTH}"
            )));
        }

        let (header, payload) = source.read_payload(current)?;
        if let Some(object_type) = header.object_type.object_type() {
            let object = DecodedObject::new(object_type, payload);
            source.remember(current, &object);
            break object;
        }

        let base = next_in_chain(&*source, current, &header)?;
        pending.push((current, payload));
        current = base;
    };

    while let Some((location, payload)) = pending.pop() {
        let delta = Delta::parse(&payload)?;
        let content = delta.apply(&object.content)?;
        object = DecodedObject::new(object.object_type, Bytes::from(content));
        source.remember(location, &object);
    }

    Ok(object)
}

/// Find the type the object at `at` resolves to without inflating anything.
///
/// Only record headers along the delta chain are read, which is enough to
/// prove what a chain will produce.
pub fn resolve_type<S: ObjectSource + ?Sized>(
    source: &mut S,
    at: S::Location,
) -> PackResult<ObjectType> {
    let mut visited = HashSet::new();
    let mut current = at;

    loop {
        if let Some(hit) = source.cached(current) {
            return Ok(hit.object_type);
        }
        if !visited.insert(current) || visited.len() > MAX_DELTA_DEPTH {
            return Err(PackError::corrupt(format!(
                "delta chain from {at:?} does not terminate"
            )));
        }

        let header = source.read_header(current)?;
        if let Some(object_type) = header.object_type.object_type() {
            return Ok(object_type);
        }
        current = next_in_chain(&*source, current, &header)?;
    }
}

/// Inflated size of the object at `at`.
///
/// Whole objects answer from their header; deltas answer from the target
/// length declared at the start of their own payload.
pub fn resolve_size<S: ObjectSource + ?Sized>(source: &mut S, at: S::Location) -> PackResult<u64> {
    if let Some(hit) = source.cached(at) {
        return Ok(hit.len() as u64);
    }
    let header = source.read_header(at)?;
    if header.object_type.object_type().is_some() {
        return Ok(header.size);
    }
    next_in_chain(&*source, at, &header)?;

    let (_, payload) = source.read_payload(at)?;
    Delta::target_length(&payload)
}
