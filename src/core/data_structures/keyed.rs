/*!
 * Keyed Registry
 *
 * Ordered key -> entry map shared by the finalizer and after-fork
 * registries. Every mutation takes one coarse mutex; `remove` is the
 * at-most-once primitive: among concurrent removers of the same key
 * exactly one observes the entry.
 */

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Ordered mapping from a composite key to a registered entry
#[derive(Debug)]
pub struct KeyedRegistry<K, V> {
    entries: Mutex<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V> KeyedRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert an entry, returning any entry previously under the key
    pub fn insert(&self, key: K, entry: V) -> Option<V> {
        self.entries.lock().insert(key, entry)
    }

    /// Atomically remove an entry if present
    #[inline]
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Run `f` against the entry while the map is locked
    ///
    /// `f` must not call back into this registry.
    pub fn inspect<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.entries.lock().get(key).map(f)
    }

    /// Point-in-time copy of the keys in ascending order
    pub fn snapshot_keys(&self) -> Vec<K> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Point-in-time copy of the keys matching `filter`, ascending
    pub fn snapshot_keys_where(&self, mut filter: impl FnMut(&K) -> bool) -> Vec<K> {
        self.entries
            .lock()
            .keys()
            .filter(|k| filter(k))
            .cloned()
            .collect()
    }

    /// Remove every entry and hand them back
    ///
    /// The entries are dropped by the caller, outside the lock.
    pub fn drain(&self) -> Vec<(K, V)> {
        std::mem::take(&mut *self.entries.lock()).into_iter().collect()
    }

    pub fn clear(&self) {
        drop(self.drain());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K: Ord + Clone, V: Clone> KeyedRegistry<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    /// Point-in-time copy of all entries in ascending key order
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Ord + Clone, V> Default for KeyedRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
