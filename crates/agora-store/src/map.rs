//! Generic thread-safe keyed container.
//!
//! [`ConcurrentMap`] is the table primitive behind every entity kind and the
//! subscriber registries. It is a `HashMap` behind a `RwLock`, so each table
//! synchronizes independently of the others. Compound operations
//! ([`load_or_store`](ConcurrentMap::load_or_store),
//! [`load_and_delete`](ConcurrentMap::load_and_delete),
//! [`insert_with`](ConcurrentMap::insert_with)) run under a single
//! write guard and are atomic with respect to every other operation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A `HashMap` guarded by a `RwLock`, safe for any number of callers.
///
/// Values are cloned out on read. Store `Arc`s for anything larger than a
/// handful of bytes.
pub struct ConcurrentMap<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // A panic while holding the guard cannot leave the map half-updated:
    // every mutation is a single `HashMap` call. Poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the value for `key`.
    pub fn store(&self, key: K, value: V) {
        self.write().insert(key, value);
    }

    /// The value for `key`, if present.
    pub fn load(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    /// Remove `key`. No-op if absent.
    pub fn delete(&self, key: &K) {
        self.write().remove(key);
    }

    /// Atomically remove `key` and return the value it held.
    pub fn load_and_delete(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    /// Atomically insert `value` only if `key` is absent.
    ///
    /// Returns the value now associated with `key` and `true` if that value
    /// was already present (the supplied `value` was discarded).
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool) {
        let mut entries = self.write();
        if let Some(existing) = entries.get(&key) {
            return (existing.clone(), true);
        }
        entries.insert(key, value.clone());
        (value, false)
    }

    /// Insert an entry whose key is produced while the write lock is held.
    ///
    /// Keys drawn from a counter inside `make` therefore become visible in
    /// the order they were drawn. Returns the key, the value now associated
    /// with it, and `true` if an entry was already present (the produced
    /// value was discarded). Nothing is inserted if `make` fails. `make`
    /// must not call back into this map.
    pub fn insert_with<E, F>(&self, make: F) -> Result<(K, V, bool), E>
    where
        F: FnOnce() -> Result<(K, V), E>,
    {
        let mut entries = self.write();
        let (key, value) = make()?;
        if let Some(existing) = entries.get(&key) {
            return Ok((key, existing.clone(), true));
        }
        entries.insert(key.clone(), value.clone());
        Ok((key, value, false))
    }

    /// Visit every entry of a snapshot until `visit` returns `false`.
    ///
    /// The snapshot is taken under the read lock; `visit` runs with no lock
    /// held and may call back into this map. Order is unspecified. Writes
    /// made by other callers during the walk may or may not be seen.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let snapshot: Vec<(K, V)> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &snapshot {
            if !visit(key, value) {
                break;
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all keys, unordered.
    pub fn keys(&self) -> Vec<K> {
        self.read().keys().cloned().collect()
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ConcurrentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("len", &self.len())
            .finish()
    }
}
