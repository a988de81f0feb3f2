/*!
 * Finalize Guards
 *
 * RAII owner for object-bound entries: dropping the guard is the
 * "owner became unreachable" trigger.
 */

use super::handle::Finalizer;
use crate::core::errors::{FinalizeError, FinalizeResult};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Resource whose finalizer runs when the guard is dropped
///
/// The resource is dropped first, then the entry is invoked through the
/// same at-most-once path as `Finalizer::invoke`.
/// On drop a failing or panicking callback is logged, never propagated.
pub struct FinalizeGuard<T> {
    resource: Option<T>,
    finalizer: Finalizer,
    armed: bool,
}

impl<T> FinalizeGuard<T> {
    pub(crate) fn new(resource: T, finalizer: Finalizer) -> Self {
        Self {
            resource: Some(resource),
            finalizer,
            armed: true,
        }
    }

    /// Handle to the underlying entry
    #[inline]
    pub fn finalizer(&self) -> &Finalizer {
        &self.finalizer
    }

    /// Drop the resource and run the finalizer now, propagating its error
    pub fn finalize(mut self) -> FinalizeResult<Option<Value>> {
        self.armed = false;
        drop(self.resource.take());
        self.finalizer.invoke()
    }

    /// Cancel the finalizer and take the resource back
    pub fn cancel(mut self) -> T {
        self.armed = false;
        self.finalizer.cancel();
        match self.resource.take() {
            Some(resource) => resource,
            None => unreachable!("resource is only taken by consuming methods"),
        }
    }

    fn resource(&self) -> &T {
        match self.resource.as_ref() {
            Some(resource) => resource,
            None => unreachable!("resource is only taken by consuming methods"),
        }
    }

    fn resource_mut(&mut self) -> &mut T {
        match self.resource.as_mut() {
            Some(resource) => resource,
            None => unreachable!("resource is only taken by consuming methods"),
        }
    }
}

impl<T> Deref for FinalizeGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource()
    }
}

impl<T> DerefMut for FinalizeGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource_mut()
    }
}

impl<T> Drop for FinalizeGuard<T> {
    fn drop(&mut self) {
        drop(self.resource.take());
        if !self.armed {
            return;
        }

        // A panic escaping here aborts the process if we are already unwinding
        let key = self.finalizer.key();
        match catch_unwind(AssertUnwindSafe(|| self.finalizer.invoke())) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(key = %key, error = %e, "finalizer failed on guard drop"),
            Err(panic) => {
                let e = FinalizeError::from_panic(format!("finalizer {}", key), panic);
                error!(key = %key, error = %e, "finalizer panicked on guard drop");
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FinalizeGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizeGuard")
            .field("resource", &self.resource)
            .field("finalizer", &self.finalizer)
            .finish()
    }
}
