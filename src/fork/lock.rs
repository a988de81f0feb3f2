/*!
 * Fork-Aware Types
 *
 * A lock and a per-thread store that reset themselves in a forked child.
 */

use super::registry::{AfterForkHandle, AfterForkRegistry};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::ThreadId;

/// Mutex that is forcibly released in a forked child
///
/// A fork copies the lock in whatever state it had, but only the forking
/// thread survives; a lock held by any other thread would never be
/// released in the child.
pub struct ForkAwareLock<T> {
    inner: Arc<Mutex<T>>,
    _registration: AfterForkHandle,
}

impl<T: Send + 'static> ForkAwareLock<T> {
    pub fn new(registry: &AfterForkRegistry, value: T) -> Self {
        let inner = Arc::new(Mutex::new(value));
        let registration = registry.register(&inner, |lock: &Mutex<T>| {
            if lock.is_locked() {
                // SAFETY: runs in the child right after fork, where the
                // thread that held the lock does not exist.
                unsafe { lock.force_unlock() };
            }
            Ok(())
        });

        Self {
            inner,
            _registration: registration,
        }
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Per-thread values, cleared in a forked child
pub struct ForkAwareLocal<T> {
    values: Arc<DashMap<ThreadId, T>>,
    _registration: AfterForkHandle,
}

impl<T: Send + Sync + 'static> ForkAwareLocal<T> {
    pub fn new(registry: &AfterForkRegistry) -> Self {
        let values = Arc::new(DashMap::new());
        let registration = registry.register(&values, |values: &DashMap<ThreadId, T>| {
            values.clear();
            Ok(())
        });

        Self {
            values,
            _registration: registration,
        }
    }

    /// Replace the calling thread's value
    pub fn set(&self, value: T) -> Option<T> {
        self.values.insert(std::thread::current().id(), value)
    }

    /// Run `f` on the calling thread's value, creating it with `init` first
    pub fn with<R>(&self, init: impl FnOnce() -> T, f: impl FnOnce(&mut T) -> R) -> R {
        let mut entry = self
            .values
            .entry(std::thread::current().id())
            .or_insert_with(init);
        f(entry.value_mut())
    }

    pub fn take(&self) -> Option<T> {
        self.values
            .remove(&std::thread::current().id())
            .map(|(_, v)| v)
    }

    /// Number of threads holding a value
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> ForkAwareLocal<T> {
    pub fn get(&self) -> Option<T> {
        self.values
            .get(&std::thread::current().id())
            .map(|v| v.value().clone())
    }
}
