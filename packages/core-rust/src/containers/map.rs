//! Keyed mapping shared between connection tasks.
//!
//! Every operation takes a single container-wide lock. This is coarser than a
//! sharded map, but it is what makes [`ConcurrentMap::transaction`] possible:
//! a read-then-append sequence over one key must not interleave with any
//! other write to the container.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// Thread-safe map with zero-value reads and whole-container transactions.
///
/// Reads of a missing key return `V::default()` rather than an error, so
/// callers can treat "absent" and "empty" alike (e.g. an unknown channel has
/// an empty message history).
#[derive(Debug)]
pub struct ConcurrentMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the value for `key`, returning the previous value.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn exists(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs `f` with exclusive access to the whole container.
    ///
    /// No other operation on this map, from any thread, can observe or
    /// modify it until `f` returns. Keep `f` CPU-only: blocking or awaiting
    /// I/O inside it stalls every other user of the map for the duration.
    ///
    /// # Deadlocks
    ///
    /// The lock is not reentrant. Calling any method of the same map from
    /// inside `f` (including a nested `transaction`) deadlocks the calling
    /// thread. Use the methods on [`MapTransaction`] instead.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut MapTransaction<'_, K, V>) -> R) -> R {
        let mut guard = self.inner.lock();
        let mut tx = MapTransaction { map: &mut *guard };
        f(&mut tx)
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Returns a clone of the value for `key`, or `V::default()` when absent.
    #[must_use]
    pub fn get(&self, key: &K) -> V
    where
        V: Default,
    {
        self.inner.lock().get(key).cloned().unwrap_or_default()
    }

    /// Removes `key` and returns its value, or `V::default()` when absent.
    pub fn pop(&self, key: &K) -> V
    where
        V: Default,
    {
        self.inner.lock().remove(key).unwrap_or_default()
    }

    /// Returns the value for `key`, inserting the result of `make` first if
    /// the key is absent. `make` runs under the lock and at most once.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        self.inner.lock().entry(key).or_insert_with(make).clone()
    }

    /// Snapshot of all keys. Later writes do not affect the returned `Vec`.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Snapshot of all values. Later writes do not affect the returned `Vec`.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.inner.lock().values().cloned().collect()
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Unlocked view of a [`ConcurrentMap`], only reachable inside
/// [`ConcurrentMap::transaction`] while the container lock is held.
#[derive(Debug)]
pub struct MapTransaction<'a, K, V> {
    map: &'a mut HashMap<K, V>,
}

impl<K, V> MapTransaction<'_, K, V>
where
    K: Eq + Hash,
{
    /// Borrows the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Inserts or replaces the value for `key`.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Removes `key`.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    /// Mutable access to the value for `key`, inserting `V::default()` first
    /// when absent.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.map.entry(key).or_default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
