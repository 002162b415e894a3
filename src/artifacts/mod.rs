//! Git data structures and algorithms
//!
//! Nothing in here owns a file handle:
//!
//! - `objects`: Git object types (object ids, commits, trees)
//! - `pack`: pack index and pack record codecs, delta resolution
//! - `history`: scan configuration, path filters and the file provider contract

pub mod history;
pub mod objects;
pub mod pack;
