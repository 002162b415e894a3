//! Git tree object
//!
//! Trees represent directory snapshots in Git. They list files (blobs),
//! subdirectories (other trees) and submodules (gitlinks), with their names and
//! modes.
//!
//! ## Format
//!
//! Each entry: `<octal mode> <name>\0<20-byte sha1>`, entries concatenated with
//! no separator or count.

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::io::BufRead;

const MODE_TYPE_MASK: u32 = 0o170000;
const MODE_REGULAR_FILE: u32 = 0o100000;
const MODE_DIRECTORY: u32 = 0o040000;
const MODE_SYMLINK: u32 = 0o120000;
const MODE_GITLINK: u32 = 0o160000;

/// One entry of a tree
///
/// Once handed out by a tree walk, `path` holds the full path from the root
/// tree rather than the bare entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: u32,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, mode: u32, oid: ObjectId) -> Self {
        TreeEntry {
            path: path.into(),
            mode,
            oid,
        }
    }

    pub fn is_regular_file(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_REGULAR_FILE
    }

    /// Directories and gitlinks, both of which point at another object that
    /// has to be expanded
    pub fn is_subtree(&self) -> bool {
        matches!(self.mode & MODE_TYPE_MASK, MODE_DIRECTORY | MODE_GITLINK)
    }

    pub fn is_gitlink(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_GITLINK
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_SYMLINK
    }

    /// Object type name as shown by `ls-tree`
    pub fn kind(&self) -> &'static str {
        match self.mode & MODE_TYPE_MASK {
            MODE_DIRECTORY => "tree",
            MODE_GITLINK => "commit",
            _ => "blob",
        }
    }

    /// Copy of this entry with its name prefixed by `parent`
    pub fn under(&self, parent: &str) -> TreeEntry {
        let path = if parent.is_empty() {
            self.path.clone()
        } else {
            format!("{parent}/{}", self.path)
        };
        TreeEntry::new(path, self.mode, self.oid)
    }
}

/// Git tree object, entries kept in on-disk order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<TreeEntry>> for Tree {
    fn from(entries: Vec<TreeEntry>) -> Self {
        Tree { entries }
    }
}

impl Unpackable for Tree {
    /// Decode every entry, failing the whole tree on the first malformed one.
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = Vec::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(anyhow::anyhow!(
                    "unexpected EOF in mode of entry {}",
                    entries.len()
                ));
            }
            let mode_str = std::str::from_utf8(&mode_bytes)?;
            let mode = u32::from_str_radix(mode_str, 8)
                .with_context(|| format!("invalid mode {mode_str:?}"))?;

            // Read "name\0"
            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.pop() != Some(b'\0') {
                return Err(anyhow::anyhow!(
                    "unexpected EOF in name of entry {}",
                    entries.len()
                ));
            }
            let name = String::from_utf8_lossy(&name_bytes).into_owned();

            let oid = ObjectId::read_from(&mut reader)
                .with_context(|| format!("unexpected EOF in object id of {name:?}"))?;

            entries.push(TreeEntry::new(name, mode, oid));
        }

        Ok(Tree { entries })
    }
}
