//! Components that own file handles
//!
//! - `pack`: one `.pack`/`.idx` pair, with its decode cache
//! - `loose`: loose objects under `objects/??/`
//! - `repository`: every pack and loose object of one repository behind one lookup
//! - `tree_walker`: flattening a root tree into its files
//! - `history`: lazy enumeration of every file in a repository's history
//! - `filesystem`: lazy enumeration of the files below a directory

pub mod filesystem;
pub mod history;
pub mod loose;
pub mod pack;
pub mod repository;
pub mod tree_walker;
