use crate::artifacts::objects::object::DecodedObject;
use std::collections::{HashMap, VecDeque};

/// Bounds for the per-pack decode cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Objects decoding to this many bytes or more are never cached
    pub max_object_size: usize,
    /// Upper bound on the summed size of all cached objects
    pub max_total_size: usize,
}

impl CacheLimits {
    pub fn disabled() -> Self {
        CacheLimits {
            max_object_size: 0,
            max_total_size: 0,
        }
    }
}

impl Default for CacheLimits {
    fn default() -> Self {
        CacheLimits {
            max_object_size: 10 * 1024,
            max_total_size: 16 * 1024 * 1024,
        }
    }
}

/// Recently decoded objects of one pack, keyed by record offset
///
/// Shared delta bases (and trees reused across commits) are resolved once
/// instead of being re-inflated for every object that refers to them.
/// Eviction is first-in first-out.
#[derive(Debug, Default)]
pub struct DecodeCache {
    limits: CacheLimits,
    entries: HashMap<u64, DecodedObject>,
    order: VecDeque<u64>,
    total_size: usize,
}

impl DecodeCache {
    pub fn new(limits: CacheLimits) -> Self {
        DecodeCache {
            limits,
            ..Default::default()
        }
    }

    pub fn get(&self, offset: u64) -> Option<DecodedObject> {
        self.entries.get(&offset).cloned()
    }

    pub fn insert(&mut self, offset: u64, object: &DecodedObject) {
        let size = object.len();
        if size >= self.limits.max_object_size
            || size > self.limits.max_total_size
            || self.entries.contains_key(&offset)
        {
            return;
        }

        while self.total_size + size > self.limits.max_total_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total_size -= evicted.len();
            }
        }

        self.entries.insert(offset, object.clone());
        self.order.push_back(offset);
        self.total_size += size;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_size = 0;
    }
}
