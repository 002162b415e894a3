use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use std::collections::HashMap;

/// Last blob id seen at every path during one repository scan
///
/// Walking commits oldest first, a file is reported only when its path is new
/// or its content changed since the previous commit that carried it.
#[derive(Debug, Default)]
pub struct ObjectCache {
    seen: HashMap<String, ObjectId>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `leaf` (a bare entry name) found under `parent_path`.
    ///
    /// Returns `false` when the same path already mapped to the same id, i.e.
    /// the file has been reported before and can be skipped.
    pub fn add(&mut self, leaf: &TreeEntry, parent_path: &str) -> bool {
        let path = if parent_path.is_empty() {
            leaf.path.clone()
        } else {
            format!("{parent_path}/{}", leaf.path)
        };

        match self.seen.insert(path, leaf.oid) {
            Some(previous) => previous != leaf.oid,
            None => true,
        }
    }

    pub fn get(&self, path: &str) -> Option<&ObjectId> {
        self.seen.get(path)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
