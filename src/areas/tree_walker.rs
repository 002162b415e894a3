//! Flattening a root tree into the regular files below it
//!
//! The walk is depth-first in on-disk order and driven by an explicit stack, so
//! callers pull one file at a time and deep histories never recurse. Subtrees
//! that cannot be resolved (pruned history, submodules, damaged objects) are
//! logged and skipped; they never end the walk.

use crate::artifacts::history::object_cache::ObjectCache;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};

/// Anything that can hand out decoded trees by id
pub trait TreeSource {
    /// `Ok(None)` when the tree is simply not there
    fn tree(&mut self, oid: &ObjectId) -> anyhow::Result<Option<Tree>>;
}

#[derive(Debug)]
struct Frame {
    oid: ObjectId,
    prefix: String,
    entries: std::vec::IntoIter<TreeEntry>,
}

impl Frame {
    fn new(oid: ObjectId, prefix: String, tree: Tree) -> Self {
        Frame {
            oid,
            prefix,
            entries: tree.into_entries().into_iter(),
        }
    }
}

/// An in-progress walk over one root tree
#[derive(Debug)]
pub struct TreeWalk {
    stack: Vec<Frame>,
}

impl TreeWalk {
    /// Start walking from `root`, or `None` if the root tree is absent.
    ///
    /// A root that exists but fails to decode is an error: nothing below it
    /// can be trusted.
    pub fn start<S: TreeSource + ?Sized>(
        source: &mut S,
        root: &ObjectId,
    ) -> anyhow::Result<Option<Self>> {
        Ok(source.tree(root)?.map(|tree| TreeWalk {
            stack: vec![Frame::new(*root, String::new(), tree)],
        }))
    }

    /// Next regular file, with its full path from the root.
    ///
    /// With a `cache`, files whose path already mapped to the same blob id are
    /// skipped. Symlinks are never yielded.
    pub fn next_leaf<S: TreeSource + ?Sized>(
        &mut self,
        source: &mut S,
        mut cache: Option<&mut ObjectCache>,
    ) -> Option<TreeEntry> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            if entry.is_regular_file() {
                if let Some(cache) = cache.as_deref_mut()
                    && !cache.add(&entry, &frame.prefix)
                {
                    continue;
                }
                return Some(entry.under(&frame.prefix));
            }

            let entry = entry.under(&frame.prefix);
            if entry.is_subtree() {
                self.descend(source, entry);
            } else {
                tracing::debug!(path = %entry.path, mode = %format_args!("{:o}", entry.mode), "skipping non-file entry");
            }
        }
    }

    fn descend<S: TreeSource + ?Sized>(&mut self, source: &mut S, entry: TreeEntry) {
        if self.stack.iter().any(|frame| frame.oid == entry.oid) {
            tracing::warn!(path = %entry.path, oid = %entry.oid, "tree contains itself, skipping");
            return;
        }

        match source.tree(&entry.oid) {
            Ok(Some(tree)) => self.stack.push(Frame::new(entry.oid, entry.path, tree)),
            Ok(None) if entry.is_gitlink() => {
                tracing::debug!(path = %entry.path, oid = %entry.oid, "submodule commit not in this repository");
            }
            Ok(None) => {
                tracing::warn!(path = %entry.path, oid = %entry.oid, "subtree missing, skipping");
            }
            Err(e) if entry.is_gitlink() => {
                tracing::debug!(path = %entry.path, oid = %entry.oid, error = %e, "submodule is not a tree");
            }
            Err(e) => {
                tracing::warn!(path = %entry.path, oid = %entry.oid, error = %e, "skipping unreadable subtree");
            }
        }
    }
}

/// Collect every regular file below `root`, or `None` if `root` is absent
pub fn walk_tree<S: TreeSource + ?Sized>(
    source: &mut S,
    root: &ObjectId,
    mut cache: Option<&mut ObjectCache>,
) -> anyhow::Result<Option<Vec<TreeEntry>>> {
    let Some(mut walk) = TreeWalk::start(source, root)? else {
        return Ok(None);
    };

    let mut leaves = Vec::new();
    while let Some(leaf) = walk.next_leaf(source, cache.as_deref_mut()) {
        leaves.push(leaf);
    }
    Ok(Some(leaves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const FILE: u32 = 0o100644;
    const DIR: u32 = 0o040000;
    const LINK: u32 = 0o120000;
    const GITLINK: u32 = 0o160000;

    fn oid(fill: u8) -> ObjectId {
        ObjectId::from_bytes([fill; 20])
    }

    #[derive(Default)]
    struct MemoryTrees {
        trees: HashMap<ObjectId, Tree>,
        broken: Vec<ObjectId>,
    }

    impl MemoryTrees {
        fn with(mut self, id: u8, entries: Vec<TreeEntry>) -> Self {
            self.trees.insert(oid(id), Tree::from(entries));
            self
        }
    }

    impl TreeSource for MemoryTrees {
        fn tree(&mut self, id: &ObjectId) -> anyhow::Result<Option<Tree>> {
            if self.broken.contains(id) {
                return Err(anyhow::anyhow!("corrupt tree"));
            }
            Ok(self.trees.get(id).cloned())
        }
    }

    fn paths(leaves: &[TreeEntry]) -> Vec<&str> {
        leaves.iter().map(|leaf| leaf.path.as_str()).collect()
    }

    fn sample() -> MemoryTrees {
        MemoryTrees::default()
            .with(
                1,
                vec![
                    TreeEntry::new("README.md", FILE, oid(10)),
                    TreeEntry::new("docs", DIR, oid(2)),
                    TreeEntry::new("link", LINK, oid(11)),
                    TreeEntry::new("vendor", GITLINK, oid(99)),
                    TreeEntry::new("zz.txt", FILE, oid(12)),
                ],
            )
            .with(2, vec![TreeEntry::new("deep", DIR, oid(3))])
            .with(3, vec![TreeEntry::new("notes.md", FILE, oid(13))])
    }

    #[test]
    fn flattens_depth_first_in_disk_order() {
        let mut trees = sample();
        let leaves = walk_tree(&mut trees, &oid(1), None).unwrap().unwrap();

        assert_eq!(paths(&leaves), vec!["README.md", "docs/deep/notes.md", "zz.txt"]);
        assert_eq!(leaves[1].oid, oid(13));
    }

    #[test]
    fn missing_root_is_none() {
        let mut trees = sample();
        assert!(walk_tree(&mut trees, &oid(42), None).unwrap().is_none());
    }

    #[test]
    fn broken_subtree_is_skipped() {
        let mut trees = sample();
        trees.broken.push(oid(3));
        let leaves = walk_tree(&mut trees, &oid(1), None).unwrap().unwrap();

        assert_eq!(paths(&leaves), vec!["README.md", "zz.txt"]);
    }

    #[test]
    fn cache_suppresses_unchanged_files_on_second_walk() {
        let mut trees = sample().with(
            4,
            vec![
                TreeEntry::new("README.md", FILE, oid(10)),
                TreeEntry::new("docs", DIR, oid(2)),
                TreeEntry::new("zz.txt", FILE, oid(20)),
            ],
        );
        let mut cache = ObjectCache::new();

        let first = walk_tree(&mut trees, &oid(1), Some(&mut cache)).unwrap().unwrap();
        let second = walk_tree(&mut trees, &oid(4), Some(&mut cache)).unwrap().unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(paths(&second), vec!["zz.txt"]);
    }

    #[test]
    fn self_referencing_tree_terminates() {
        let mut trees = MemoryTrees::default().with(
            1,
            vec![
                TreeEntry::new("loop", DIR, oid(1)),
                TreeEntry::new("file", FILE, oid(10)),
            ],
        );
        let leaves = walk_tree(&mut trees, &oid(1), None).unwrap().unwrap();

        assert_eq!(paths(&leaves), vec!["file"]);
    }
}
