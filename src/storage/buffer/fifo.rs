use super::replacer::Replacer;
use super::{CacheKey, KeyRange};
use std::collections::{HashSet, VecDeque};

/// Evicts keys in the order they were pushed. Hits do not matter.
#[derive(Debug)]
pub struct FifoReplacer<K> {
    queue: VecDeque<K>,
    members: HashSet<K>,
    range: KeyRange<K>,
    capacity: usize,
}

impl<K: CacheKey> FifoReplacer<K> {
    pub fn new(range: KeyRange<K>, capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            range,
            capacity,
        }
    }
}

impl<K: CacheKey> Replacer<K> for FifoReplacer<K> {
    fn hit(&mut self, _key: K) {}

    fn push(&mut self, key: K) -> bool {
        if self.queue.len() >= self.capacity || !self.range.contains(&key) {
            return false;
        }
        if !self.members.insert(key) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    fn pop(&mut self) -> Option<K> {
        let key = self.queue.pop_front()?;
        self.members.remove(&key);
        Some(key)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
