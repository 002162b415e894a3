//! Integer encodings used by the pack formats
//!
//! Three encodings appear in the same files:
//!
//! - fixed 32-bit big-endian fields (index fan-out, offsets, pack header)
//! - the object header: 3-bit type and 4 low size bits in the first byte,
//!   then 7 bits per byte, least significant group first
//! - the offset-delta base distance: 7 bits per byte, most significant group
//!   first, with an extra `+1` folded in before every shift
//!
//! Delta payloads start with two sizes in the plain little-endian 7-bit form.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

fn overflow(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{what} does not fit in 64 bits"),
    )
}

pub fn read_u32_be<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    reader.read_u32::<BigEndian>()
}

/// Read an object header, returning the raw type tag and the inflated size.
pub fn read_type_and_size<R: Read + ?Sized>(reader: &mut R) -> io::Result<(u8, u64)> {
    let mut byte = reader.read_u8()?;
    let type_tag = (byte & 0x70) >> 4;
    let mut size = u64::from(byte & 0x0f);
    let mut shift = 4u32;

    while byte & 0x80 != 0 {
        if shift >= u64::BITS {
            return Err(overflow("object size"));
        }
        byte = reader.read_u8()?;
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    Ok((type_tag, size))
}

/// Read the distance from an offset-delta back to its base object.
pub fn read_base_distance<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut byte = reader.read_u8()?;
    let mut distance = u64::from(byte & 0x7f);

    while byte & 0x80 != 0 {
        byte = reader.read_u8()?;
        distance = distance
            .checked_add(1)
            .and_then(|d| d.checked_mul(0x80))
            .ok_or_else(|| overflow("delta base distance"))?
            | u64::from(byte & 0x7f);
    }

    Ok(distance)
}

/// Read one of the two size fields at the start of a delta payload.
pub fn read_size<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut size = 0u64;
    let mut shift = 0u32;

    loop {
        if shift >= u64::BITS {
            return Err(overflow("delta size"));
        }
        let byte = reader.read_u8()?;
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}
