use super::replacer::Replacer;
use super::{create_replacer, CacheKey, CachePolicy};
use parking_lot::Mutex;

/// Serializes access to a single-threaded replacer so that several threads of
/// a buffer pool can drive it through `&self`.
#[derive(Debug)]
pub struct SharedReplacer<K> {
    inner: Mutex<Box<dyn Replacer<K>>>,
    capacity: usize,
}

impl<K: CacheKey> SharedReplacer<K> {
    pub fn new(inner: Box<dyn Replacer<K>>) -> Self {
        let capacity = inner.capacity();
        Self {
            inner: Mutex::new(inner),
            capacity,
        }
    }

    pub fn with_policy(policy: CachePolicy, min: K, max: K, capacity: usize) -> Self {
        Self::new(create_replacer(policy, min, max, capacity))
    }

    pub fn hit(&self, key: K) {
        self.inner.lock().hit(key);
    }

    pub fn push(&self, key: K) -> bool {
        self.inner.lock().push(key)
    }

    pub fn pop(&self) -> Option<K> {
        self.inner.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_concurrent(&self) -> bool {
        true
    }
}

impl<K: CacheKey> Replacer<K> for SharedReplacer<K> {
    fn hit(&mut self, key: K) {
        self.inner.get_mut().hit(key);
    }

    fn push(&mut self, key: K) -> bool {
        self.inner.get_mut().push(key)
    }

    fn pop(&mut self) -> Option<K> {
        self.inner.get_mut().pop()
    }

    fn len(&self) -> usize {
        SharedReplacer::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_concurrent(&self) -> bool {
        true
    }
}
