//! Pack file formats
//!
//! Git stores most objects in pack files: one `.pack` holding zlib-compressed
//! records (whole objects or deltas against other records) and one `.idx`
//! mapping object ids to record offsets.
//!
//! - `varint`: integer encodings shared by both files
//! - `index`: `.idx` version 2 reader
//! - `header`: per-record type, size and delta base reference
//! - `delta`: delta instruction decoding and chain resolution
//! - `cache`: bounded cache of decoded records
//! - `error`: failures raised while reading packs

pub mod cache;
pub mod delta;
pub mod error;
pub mod header;
pub mod index;
pub mod varint;
