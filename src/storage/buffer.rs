//! Page cache replacement policies.
//!
//! A buffer pool built on top of the page database decides which resident page
//! to drop through a [`Replacer`]. Policies are picked at runtime through
//! [`CachePolicy`] and built by a [`ReplacerFactory`] from the page-id range
//! they will see and their capacity.

pub mod fifo;
pub mod lifo;
pub mod lru;
pub mod mru;
pub mod replacer;
pub mod shared;

use crate::storage::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::str::FromStr;

pub use fifo::FifoReplacer;
pub use lifo::LifoReplacer;
pub use lru::LruReplacer;
pub use mru::MruReplacer;
pub use replacer::Replacer;
pub use shared::SharedReplacer;

/// Keys a replacer can track, usually page ids.
pub trait CacheKey: Copy + Eq + Hash + PartialOrd + Debug + Send + 'static {}

impl<K: Copy + Eq + Hash + PartialOrd + Debug + Send + 'static> CacheKey for K {}

/// Inclusive range of keys a replacer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange<K> {
    pub min: K,
    pub max: K,
}

impl<K: CacheKey> KeyRange<K> {
    pub fn new(min: K, max: K) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.min <= *key && *key <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    Fifo,
    Lifo,
    Lru,
    Mru,
}

impl CachePolicy {
    pub const ALL: [CachePolicy; 4] = [
        CachePolicy::Fifo,
        CachePolicy::Lifo,
        CachePolicy::Lru,
        CachePolicy::Mru,
    ];

    /// Factory producing fresh replacers of this policy.
    pub fn factory<K: CacheKey>(self) -> impl ReplacerFactory<K> {
        move |min, max, capacity| create_replacer(self, min, max, capacity)
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CachePolicy::Fifo => "fifo",
            CachePolicy::Lifo => "lifo",
            CachePolicy::Lru => "lru",
            CachePolicy::Mru => "mru",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CachePolicy {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CachePolicy::ALL
            .into_iter()
            .find(|p| p.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StorageError::UnknownCachePolicy(s.to_string()))
    }
}

/// Builds a replacer from `(key range min, key range max, capacity)`.
pub trait ReplacerFactory<K>: Fn(K, K, usize) -> Box<dyn Replacer<K>> {}

impl<K, F> ReplacerFactory<K> for F where F: Fn(K, K, usize) -> Box<dyn Replacer<K>> {}

pub fn create_replacer<K: CacheKey>(
    policy: CachePolicy,
    min: K,
    max: K,
    capacity: usize,
) -> Box<dyn Replacer<K>> {
    let range = KeyRange::new(min, max);
    match policy {
        CachePolicy::Fifo => Box::new(FifoReplacer::new(range, capacity)),
        CachePolicy::Lifo => Box::new(LifoReplacer::new(range, capacity)),
        CachePolicy::Lru => Box::new(LruReplacer::new(range, capacity)),
        CachePolicy::Mru => Box::new(MruReplacer::new(range, capacity)),
    }
}
