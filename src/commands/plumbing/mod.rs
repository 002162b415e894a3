//! Plumbing commands (low-level object access)
//!
//! These expose the pack reader directly and are mostly useful to inspect a
//! repository before scanning it.
//!
//! ## Commands
//!
//! - `cat-file`: Print an object, its type or its size
//! - `ls-tree`: List every file below a tree or commit
//! - `rev-list`: List the commits a history scan visits, in scan order
//! - `show-index`: Dump the entries of a pack index

pub mod cat_file;
pub mod ls_tree;
pub mod rev_list;
pub mod show_index;
