//! Command implementations
//!
//! Commands fall into two groups:
//!
//! - `plumbing`: direct access to objects, trees and pack indexes
//! - `scan`: draining a file provider (history or filesystem)

pub mod plumbing;
pub mod scan;
