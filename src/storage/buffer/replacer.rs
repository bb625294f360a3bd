use std::fmt::Debug;

pub trait Replacer<K>: Send + Debug {
    /// Record an access to a resident key. Absent keys are ignored.
    fn hit(&mut self, key: K);

    /// Start tracking a key. Returns false if the key is already tracked, lies
    /// outside the configured key range or the replacer is full.
    fn push(&mut self, key: K) -> bool;

    /// Select and stop tracking a victim. Returns None if nothing is tracked.
    fn pop(&mut self) -> Option<K>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Whether the replacer may be driven from several threads at once.
    fn is_concurrent(&self) -> bool {
        false
    }
}
