use super::lru::RecencyList;
use super::replacer::Replacer;
use super::{CacheKey, KeyRange};

/// Evicts the most recently used key, counting both pushes and hits as uses.
#[derive(Debug)]
pub struct MruReplacer<K> {
    list: RecencyList<K>,
    range: KeyRange<K>,
    capacity: usize,
}

impl<K: CacheKey> MruReplacer<K> {
    pub fn new(range: KeyRange<K>, capacity: usize) -> Self {
        Self {
            list: RecencyList::with_capacity(capacity),
            range,
            capacity,
        }
    }
}

impl<K: CacheKey> Replacer<K> for MruReplacer<K> {
    fn hit(&mut self, key: K) {
        self.list.touch(key);
    }

    fn push(&mut self, key: K) -> bool {
        if self.list.len() >= self.capacity || !self.range.contains(&key) {
            return false;
        }
        self.list.push_front(key)
    }

    fn pop(&mut self) -> Option<K> {
        self.list.pop_front()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
