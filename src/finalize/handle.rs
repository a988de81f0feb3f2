/*!
 * Finalizer Handles
 */

use super::registry::RegistryLink;
use crate::core::errors::FinalizeResult;
use crate::core::types::{FinalizerKey, Priority};
use serde_json::Value;
use std::fmt;
use tracing::trace;

/// Handle to a registered finalization entry
///
/// Cheap to clone; every clone refers to the same entry. Whichever of
/// `invoke`, `cancel`, a guard drop or a batch run removes the entry
/// first is the only one to act on it.
#[derive(Clone)]
pub struct Finalizer {
    key: FinalizerKey,
    registry: RegistryLink,
}

impl Finalizer {
    pub(crate) fn new(key: FinalizerKey, registry: RegistryLink) -> Self {
        Self { key, registry }
    }

    #[inline]
    pub fn key(&self) -> FinalizerKey {
        self.key
    }

    #[inline]
    pub fn priority(&self) -> Option<Priority> {
        self.key.priority
    }

    /// Run the callback unless it already ran or was cancelled
    ///
    /// Returns `Ok(None)` if the entry is gone or was registered by a
    /// different process; callback errors propagate to the caller.
    pub fn invoke(&self) -> FinalizeResult<Option<Value>> {
        match self.registry.upgrade() {
            Some(registry) => registry.invoke(self.key),
            None => {
                trace!(key = %self.key, "finalizer registry already dropped");
                Ok(None)
            }
        }
    }

    /// Cancel without running the callback
    ///
    /// Returns whether this call removed the entry; cancelling twice, or
    /// after invocation, is a no-op.
    pub fn cancel(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.cancel(&self.key))
            .unwrap_or(false)
    }

    /// Whether the entry is still waiting to run
    ///
    /// Diagnostic only: the answer may be stale by the time it is used.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(&self.key))
            .unwrap_or(false)
    }
}

impl fmt::Display for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry.upgrade().and_then(|r| r.describe(&self.key)) {
            Some(description) => f.write_str(&description),
            None => f.write_str("<Finalize object, dead>"),
        }
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}
