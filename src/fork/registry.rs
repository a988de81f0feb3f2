/*!
 * After-Fork Registry
 *
 * Reinitialization callbacks run once in a freshly forked child, oldest
 * registration first. Each entry holds its owner weakly; an entry whose
 * owner is gone is skipped and pruned, and `AfterForkHandle` removes an
 * entry explicitly.
 */

use crate::core::data_structures::KeyedRegistry;
use crate::core::errors::FinalizeError;
use crate::core::types::{AfterForkKey, Sequence};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Upgrades the owner and runs the callback; `None` once the owner is gone
type AfterForkThunk = Arc<dyn Fn() -> Option<anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
struct AfterForkEntry {
    owner_type: &'static str,
    run: AfterForkThunk,
}

/// Outcome counters of one after-fork run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForkReport {
    pub invoked: usize,
    pub failed: usize,
    /// Entries whose owner no longer exists
    pub pruned: usize,
}

struct ForkInner {
    entries: KeyedRegistry<AfterForkKey, AfterForkEntry>,
    counter: AtomicU64,
}

/// Process-scoped registry of after-fork callbacks
///
/// Cloning shares the registry.
#[derive(Clone)]
pub struct AfterForkRegistry {
    inner: Arc<ForkInner>,
}

impl AfterForkRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ForkInner {
                entries: KeyedRegistry::new(),
                counter: AtomicU64::new(0),
            }),
        }
    }

    /// Register `callback(owner)` to run in every forked child
    ///
    /// The registry keeps only a weak reference to `owner`. Dropping the
    /// returned handle unregisters the callback; use
    /// [`AfterForkHandle::detach`] to tie it to the owner's lifetime only.
    pub fn register<T, F>(&self, owner: &Arc<T>, callback: F) -> AfterForkHandle
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let key = AfterForkKey {
            sequence: self.next_sequence(),
            owner: Arc::as_ptr(owner) as *const () as usize,
            callback: Arc::as_ptr(&callback) as *const () as usize,
        };

        let weak: Weak<T> = Arc::downgrade(owner);
        let run: AfterForkThunk = Arc::new(move || weak.upgrade().map(|owner| callback(&owner)));

        self.inner.entries.insert(
            key,
            AfterForkEntry {
                owner_type: std::any::type_name::<T>(),
                run,
            },
        );

        AfterForkHandle {
            key,
            registry: Arc::downgrade(&self.inner),
            armed: true,
        }
    }

    #[inline]
    fn next_sequence(&self) -> Sequence {
        self.inner.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Run every live callback in registration order
    ///
    /// Called once, early, in the child after a fork. A failing callback
    /// is logged and the rest still run.
    pub fn run_after_fork(&self) -> ForkReport {
        let mut report = ForkReport::default();

        for (key, entry) in self.inner.entries.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| (entry.run)())) {
                Ok(Some(Ok(()))) => report.invoked += 1,
                Ok(Some(Err(e))) => {
                    let e = FinalizeError::callback(entry.owner_type, e);
                    info!(sequence = key.sequence, "after forker raised exception {}", e);
                    report.failed += 1;
                }
                Ok(None) => {
                    self.inner.entries.remove(&key);
                    report.pruned += 1;
                }
                Err(panic) => {
                    let e = FinalizeError::from_panic(entry.owner_type, panic);
                    info!(sequence = key.sequence, "after forker raised exception {}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            invoked = report.invoked,
            failed = report.failed,
            pruned = report.pruned,
            "after-fork callbacks complete"
        );
        report
    }

    /// Registered keys in ascending order
    pub fn keys(&self) -> Vec<AfterForkKey> {
        self.inner.entries.snapshot_keys()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl Default for AfterForkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration token returned by [`AfterForkRegistry::register`]
#[must_use = "dropping the handle unregisters the callback"]
pub struct AfterForkHandle {
    key: AfterForkKey,
    registry: Weak<ForkInner>,
    armed: bool,
}

impl AfterForkHandle {
    #[inline]
    pub fn key(&self) -> AfterForkKey {
        self.key
    }

    /// Remove the callback; returns whether it was still registered
    pub fn unregister(mut self) -> bool {
        self.armed = false;
        self.remove()
    }

    /// Keep the callback registered until its owner is gone
    pub fn detach(mut self) {
        self.armed = false;
    }

    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .map(|inner| inner.entries.contains(&self.key))
            .unwrap_or(false)
    }

    fn remove(&self) -> bool {
        self.registry
            .upgrade()
            .map(|inner| inner.entries.remove(&self.key).is_some())
            .unwrap_or(false)
    }
}

impl Drop for AfterForkHandle {
    fn drop(&mut self) {
        if self.armed {
            self.remove();
        }
    }
}

impl std::fmt::Debug for AfterForkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AfterForkHandle")
            .field("key", &self.key)
            .field("armed", &self.armed)
            .finish()
    }
}
