/*!
 * Finalizer Builder
 * Builder pattern for finalizer registration
 */

use super::entry::{Callback, OwnerRef};
use super::guard::FinalizeGuard;
use super::handle::Finalizer;
use super::registry::FinalizerRegistry;
use crate::core::errors::FinalizeResult;
use crate::core::types::{Args, Kwargs, Priority};
use serde_json::Value;

/// Builder for a finalization entry
///
/// # Example
///
/// ```ignore
/// let lock_file = registry
///     .finalizer(move |_, _| { std::fs::remove_file(&path)?; Ok(Value::Null) })
///     .name("remove_lock_file")
///     .priority(10)
///     .register()?;
/// ```
#[must_use = "a finalizer is only registered by `register` or `guard`"]
pub struct FinalizerBuilder<'a> {
    registry: &'a FinalizerRegistry,
    name: String,
    callback: Callback,
    args: Args,
    kwargs: Kwargs,
    priority: Option<Priority>,
}

impl<'a> FinalizerBuilder<'a> {
    pub(crate) fn new(registry: &'a FinalizerRegistry, name: String, callback: Callback) -> Self {
        Self {
            registry,
            name,
            callback,
            args: Args::new(),
            kwargs: Kwargs::new(),
            priority: None,
        }
    }

    /// Callback name shown in diagnostics
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Exit priority; higher runs earlier at shutdown
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn maybe_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    /// Register a priority-bound entry, run only at shutdown or explicitly
    pub fn register(self) -> FinalizeResult<Finalizer> {
        self.registry.register_named(
            None,
            self.name,
            self.callback,
            self.args,
            self.kwargs,
            self.priority,
        )
    }

    /// Register an entry bound to `resource`, run when the guard drops
    pub fn guard<T>(self, resource: T) -> FinalizeResult<FinalizeGuard<T>> {
        let finalizer = self.registry.register_named(
            Some(OwnerRef::of::<T>()),
            self.name,
            self.callback,
            self.args,
            self.kwargs,
            self.priority,
        )?;
        Ok(FinalizeGuard::new(resource, finalizer))
    }
}
