use super::replacer::Replacer;
use super::{CacheKey, KeyRange};
use std::collections::HashMap;

/// Keys ordered by recency of use, with O(1) push, touch and removal at either
/// end. Links are stored by key; `head` is the most recently used key and
/// `tail` the least recently used one.
#[derive(Debug)]
pub(crate) struct RecencyList<K> {
    links: HashMap<K, Link<K>>,
    head: Option<K>,
    tail: Option<K>,
}

#[derive(Debug, Clone, Copy)]
struct Link<K> {
    prev: Option<K>,
    next: Option<K>,
}

impl<K: CacheKey> RecencyList<K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            links: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    /// Insert a new key as most recently used. Returns false if already present.
    pub(crate) fn push_front(&mut self, key: K) -> bool {
        if self.links.contains_key(&key) {
            return false;
        }
        self.links.insert(
            key,
            Link {
                prev: None,
                next: None,
            },
        );
        self.attach_front(key);
        true
    }

    /// Mark a present key as most recently used.
    pub(crate) fn touch(&mut self, key: K) {
        if self.head == Some(key) || !self.links.contains_key(&key) {
            return;
        }
        self.detach(key);
        self.attach_front(key);
    }

    pub(crate) fn pop_front(&mut self) -> Option<K> {
        let key = self.head?;
        self.detach(key);
        self.links.remove(&key);
        Some(key)
    }

    pub(crate) fn pop_back(&mut self) -> Option<K> {
        let key = self.tail?;
        self.detach(key);
        self.links.remove(&key);
        Some(key)
    }

    fn detach(&mut self, key: K) {
        let Some(&Link { prev, next }) = self.links.get(&key) else {
            return;
        };

        if self.head == Some(key) {
            self.head = next;
        }
        if self.tail == Some(key) {
            self.tail = prev;
        }
        if let Some(link) = prev.and_then(|p| self.links.get_mut(&p)) {
            link.next = next;
        }
        if let Some(link) = next.and_then(|n| self.links.get_mut(&n)) {
            link.prev = prev;
        }
        if let Some(link) = self.links.get_mut(&key) {
            link.prev = None;
            link.next = None;
        }
    }

    fn attach_front(&mut self, key: K) {
        let old_head = self.head;
        if let Some(link) = self.links.get_mut(&key) {
            link.prev = None;
            link.next = old_head;
        }
        if let Some(link) = old_head.and_then(|h| self.links.get_mut(&h)) {
            link.prev = Some(key);
        }
        self.head = Some(key);
        if self.tail.is_none() {
            self.tail = Some(key);
        }
    }
}

/// Evicts the least recently used key.
#[derive(Debug)]
pub struct LruReplacer<K> {
    list: RecencyList<K>,
    range: KeyRange<K>,
    capacity: usize,
}

impl<K: CacheKey> LruReplacer<K> {
    pub fn new(range: KeyRange<K>, capacity: usize) -> Self {
        Self {
            list: RecencyList::with_capacity(capacity),
            range,
            capacity,
        }
    }
}

impl<K: CacheKey> Replacer<K> for LruReplacer<K> {
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
        self.list.pop_back()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacer(capacity: usize) -> LruReplacer<u32> {
        LruReplacer::new(KeyRange::new(0, 999), capacity)
    }

    #[test]
    fn test_basic_lru_operations() {
        let mut replacer = replacer(3);

        assert_eq!(replacer.len(), 0);
        assert_eq!(replacer.pop(), None);

        replacer.push(1);
        replacer.push(2);
        replacer.push(3);
        assert_eq!(replacer.len(), 3);

        assert_eq!(replacer.pop(), Some(1));
        assert_eq!(replacer.pop(), Some(2));
        assert_eq!(replacer.pop(), Some(3));
        assert_eq!(replacer.pop(), None);
    }

    #[test]
    fn test_hit_promotes() {
        let mut replacer = replacer(3);
        replacer.push(1);
        replacer.push(2);
        replacer.push(3);

        replacer.hit(1);
        assert_eq!(replacer.pop(), Some(2));
        assert_eq!(replacer.pop(), Some(3));
        assert_eq!(replacer.pop(), Some(1));
    }

    #[test]
    fn test_duplicate_push() {
        let mut replacer = replacer(2);
        assert!(replacer.push(1));
        assert!(!replacer.push(1));
        assert_eq!(replacer.len(), 1);
    }

    #[test]
    fn test_hit_non_existent() {
        let mut replacer = replacer(2);
        replacer.hit(999);
        assert_eq!(replacer.len(), 0);
        replacer.push(1);
        replacer.hit(7);
        assert_eq!(replacer.pop(), Some(1));
    }

    #[test]
    fn test_complex_scenario() {
        let mut replacer = replacer(4);

        replacer.push(1);
        replacer.push(2);
        replacer.push(3);
        replacer.hit(2);
        replacer.hit(1);

        // recency: 3 < 2 < 1
        assert_eq!(replacer.pop(), Some(3));

        replacer.push(4);
        replacer.hit(2);

        // recency: 1 < 4 < 2
        assert_eq!(replacer.pop(), Some(1));
        assert_eq!(replacer.pop(), Some(4));
        assert_eq!(replacer.pop(), Some(2));
        assert!(replacer.is_empty());
    }

    #[test]
    fn test_recency_list_both_ends() {
        let mut list = RecencyList::with_capacity(4);
        for key in [1u8, 2, 3, 4] {
            list.push_front(key);
        }
        list.touch(2);
        // front 2, 4, 3, 1 back
        assert_eq!(list.pop_front(), Some(2));
        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), Some(3));
        assert_eq!(list.pop_front(), Some(4));
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.len(), 0);
    }
}
