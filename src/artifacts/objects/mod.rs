//! Git object types
//!
//! Git stores all content as objects identified by SHA-1 hashes:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, parent commit, tree)
//! - **Tag**: Annotated reference to another object
//!
//! Only trees and commits are interpreted; blobs are handed to callers as raw
//! bytes and tags are carried through untouched.

pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in binary format
pub const OBJECT_ID_BYTES: usize = 20;
