use super::replacer::Replacer;
use super::{CacheKey, KeyRange};
use std::collections::HashSet;

/// Evicts the most recently pushed key. Hits do not matter.
#[derive(Debug)]
pub struct LifoReplacer<K> {
    stack: Vec<K>,
    members: HashSet<K>,
    range: KeyRange<K>,
    capacity: usize,
}

impl<K: CacheKey> LifoReplacer<K> {
    pub fn new(range: KeyRange<K>, capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            range,
            capacity,
        }
    }
}

impl<K: CacheKey> Replacer<K> for LifoReplacer<K> {
    fn hit(&mut self, _key: K) {}

    fn push(&mut self, key: K) -> bool {
        if self.stack.len() >= self.capacity || !self.range.contains(&key) {
            return false;
        }
        if !self.members.insert(key) {
            return false;
        }
        self.stack.push(key);
        true
    }

    fn pop(&mut self) -> Option<K> {
        let key = self.stack.pop()?;
        self.members.remove(&key);
        Some(key)
    }

    fn len(&self) -> usize {
        self.stack.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
