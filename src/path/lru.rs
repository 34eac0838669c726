//! Bounded memoization on top of an LRU cache.

use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// A thread-safe memoizer that keeps the `capacity` most recently used
/// results.
#[derive(Debug)]
pub struct Memoizer<K: Hash + Eq, V> {
    cache: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> Memoizer<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs outside the lock, so two racing misses may both
    /// compute; the last writer wins and both see an equal value.
    pub fn get_or_compute<Q, F>(&self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.lock().get(key) {
            return hit.clone();
        }
        let value = compute();
        self.lock().put(key.to_owned(), value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, V>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_memoizes_by_key() {
        let memo: Memoizer<String, usize> = Memoizer::new(4);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            7
        };
        assert_eq!(memo.get_or_compute("a", compute), 7);
        assert_eq!(memo.get_or_compute("a", || unreachable!()), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let memo: Memoizer<String, usize> = Memoizer::new(2);
        memo.get_or_compute("a", || 1);
        memo.get_or_compute("b", || 2);
        // touch "a" so "b" is the eviction candidate
        memo.get_or_compute("a", || 0);
        memo.get_or_compute("c", || 3);
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get_or_compute("b", || 20), 20);
        assert_eq!(memo.get_or_compute("c", || 30), 3);
    }
}
