/*!
 * Finalizer Registry
 *
 * Registration, single-entry invocation, cancellation and
 * priority-ordered batch execution.
 *
 * # Ordering
 *
 * A batch run visits keys in descending `(priority, sequence)` order:
 * highest priority first, and among equal priorities the most recently
 * registered entry first. Entries without a priority are never selected.
 */

use super::builder::FinalizerBuilder;
use super::entry::{Callback, FinalizationEntry, OwnerRef, Payload};
use super::handle::Finalizer;
use crate::core::data_structures::KeyedRegistry;
use crate::core::errors::{FinalizeError, FinalizeResult};
use crate::core::types::{Args, FinalizerKey, Kwargs, Priority, Sequence};
use crate::process::traits::ProcessIdentity;
use serde::Serialize;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{error, trace};

/// Outcome counters of one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Keys selected at the start of the run
    pub selected: usize,
    /// Callbacks that ran and returned successfully
    pub invoked: usize,
    /// Selected entries already gone, or registered by another process
    pub discarded: usize,
    /// Callbacks that returned an error or panicked
    pub failed: usize,
    /// Entries dropped uninvoked by the final clear of a full run
    pub dropped: usize,
}

impl BatchReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub(crate) struct RegistryInner {
    entries: KeyedRegistry<FinalizerKey, Arc<FinalizationEntry>>,
    counter: AtomicU64,
    identity: Arc<dyn ProcessIdentity>,
}

/// Process-scoped registry of finalization entries
///
/// Cloning shares the registry.
#[derive(Clone)]
pub struct FinalizerRegistry {
    inner: Arc<RegistryInner>,
}

impl FinalizerRegistry {
    pub fn new(identity: Arc<dyn ProcessIdentity>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: KeyedRegistry::new(),
                counter: AtomicU64::new(0),
                identity,
            }),
        }
    }

    /// Register a cleanup action
    ///
    /// An entry with neither an owner nor a priority could never run and
    /// is rejected with `InvalidConfiguration`.
    pub fn register<F>(
        &self,
        owner: Option<OwnerRef>,
        callback: F,
        args: Args,
        kwargs: Kwargs,
        priority: Option<Priority>,
    ) -> FinalizeResult<Finalizer>
    where
        F: FnOnce(Args, Kwargs) -> anyhow::Result<Value> + Send + 'static,
    {
        let name = short_type_name(std::any::type_name::<F>());
        self.register_named(owner, name, Box::new(callback), args, kwargs, priority)
    }

    pub(crate) fn register_named(
        &self,
        owner: Option<OwnerRef>,
        name: String,
        callback: Callback,
        args: Args,
        kwargs: Kwargs,
        priority: Option<Priority>,
    ) -> FinalizeResult<Finalizer> {
        if owner.is_none() && priority.is_none() {
            return Err(FinalizeError::InvalidConfiguration(format!(
                "finalizer {} has no owner and no exit priority",
                name
            )));
        }

        let key = FinalizerKey::new(priority, self.next_sequence());
        let entry = FinalizationEntry::new(
            key,
            name,
            owner,
            self.inner.identity.current_pid(),
            Payload {
                callback,
                args,
                kwargs,
            },
        );

        trace!(key = %key, callback = entry.callback_name(), "finalizer registered");
        self.inner.entries.insert(key, Arc::new(entry));

        Ok(Finalizer::new(key, Arc::downgrade(&self.inner)))
    }

    /// Start building a finalizer around `callback`
    pub fn finalizer<F>(&self, callback: F) -> FinalizerBuilder<'_>
    where
        F: FnOnce(Args, Kwargs) -> anyhow::Result<Value> + Send + 'static,
    {
        let name = short_type_name(std::any::type_name::<F>());
        FinalizerBuilder::new(self, name, Box::new(callback))
    }

    #[inline]
    fn next_sequence(&self) -> Sequence {
        self.inner.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Run all finalizers whose priority is present and at least `min_priority`
    ///
    /// Failing callbacks are logged and the run continues. A run without
    /// a minimum is terminal: the registry is emptied afterwards, dropping
    /// object-bound entries that were never selected.
    pub fn run_finalizers(&self, min_priority: Option<Priority>) -> BatchReport {
        let mut keys = self
            .inner
            .entries
            .snapshot_keys_where(|key| key.selected_by(min_priority));
        keys.reverse();

        let mut report = BatchReport {
            selected: keys.len(),
            ..BatchReport::default()
        };

        for key in keys {
            // May have been removed since the snapshot
            let Some((name, description)) = self
                .inner
                .entries
                .inspect(&key, |e| (e.callback_name().to_string(), e.describe()))
            else {
                report.discarded += 1;
                continue;
            };

            trace!(key = %key, "calling {}", description);
            match catch_unwind(AssertUnwindSafe(|| self.inner.invoke(key))) {
                Ok(Ok(Some(_))) => report.invoked += 1,
                Ok(Ok(None)) => report.discarded += 1,
                Ok(Err(e)) => {
                    error!(key = %key, error = %e, "finalizer failed during batch run");
                    report.failed += 1;
                }
                Err(panic) => {
                    let e = FinalizeError::from_panic(name, panic);
                    error!(key = %key, error = %e, "finalizer panicked during batch run");
                    report.failed += 1;
                }
            }
        }

        if min_priority.is_none() {
            let remaining = self.inner.entries.drain();
            report.dropped = remaining.len();
            // Captured resources are released here, outside the registry lock
            drop(remaining);
        }

        report
    }

    /// Whether an entry is still registered under `key`
    #[inline]
    pub fn is_registered(&self, key: &FinalizerKey) -> bool {
        self.inner.entries.contains(key)
    }

    /// Registered keys in ascending order
    pub fn keys(&self) -> Vec<FinalizerKey> {
        self.inner.entries.snapshot_keys()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl RegistryInner {
    /// Remove the entry and run its callback at most once
    ///
    /// Returns `Ok(None)` when the entry was already removed or belongs
    /// to another process. Callback errors propagate unmodified.
    pub(crate) fn invoke(&self, key: FinalizerKey) -> FinalizeResult<Option<Value>> {
        let Some(entry) = self.entries.remove(&key) else {
            trace!(key = %key, "finalizer no longer registered");
            return Ok(None);
        };

        let payload = entry.take_payload();

        if entry.owning_pid() != self.identity.current_pid() {
            trace!(key = %key, "finalizer ignored because different process");
            return Ok(None);
        }

        let Some(Payload {
            callback,
            args,
            kwargs,
        }) = payload
        else {
            return Ok(None);
        };

        trace!(
            key = %key,
            callback = entry.callback_name(),
            args = %serde_json::Value::Array(args.clone()),
            kwargs = %serde_json::Value::Object(kwargs.clone()),
            "finalizer calling callback"
        );

        callback(args, kwargs)
            .map(Some)
            .map_err(|e| FinalizeError::callback(entry.callback_name(), e))
    }

    #[inline]
    pub(crate) fn cancel(&self, key: &FinalizerKey) -> bool {
        // Dropping the entry drops the payload
        self.entries.remove(key).is_some()
    }

    #[inline]
    pub(crate) fn contains(&self, key: &FinalizerKey) -> bool {
        self.entries.contains(key)
    }

    pub(crate) fn describe(&self, key: &FinalizerKey) -> Option<String> {
        self.entries.inspect(key, |e| e.describe())
    }
}

/// Weak link from handles back to their registry
pub(crate) type RegistryLink = Weak<RegistryInner>;

/// `a::b::{{closure}}` -> `b::{{closure}}`, keeping names readable in diagnostics
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    let mut parts: Vec<&str> = base.rsplit("::").take(2).collect();
    parts.reverse();
    parts.join("::")
}
