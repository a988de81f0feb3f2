/*!
 * Process Context
 *
 * Process-scoped owner of the finalizer and after-fork registries, the
 * shutdown sequencer, the config store and the temp-directory lifecycle.
 *
 * # Lifecycle
 *
 * - Construct one context per process with [`ProcessContext::builder`]
 *   and pass it to the components that register cleanup.
 * - In a forked child, call [`ProcessContext::reinit_after_fork`] before
 *   anything else touches shared state.
 * - At exit, call [`ProcessContext::begin_shutdown`] or hold the guard
 *   returned by [`ProcessContext::exit_guard`].
 *
 * Dropping a context that never shut down marks it `Indeterminate`;
 * handles still pointing at it report "exiting".
 */

mod builder;

pub use builder::ProcessContextBuilder;

use crate::core::config::{ContextConfig, ProcessConfig};
use crate::core::errors::FinalizeResult;
use crate::core::types::{Args, Kwargs, Pid, Priority};
use crate::finalize::{BatchReport, Finalizer, FinalizerBuilder, FinalizerRegistry, OwnerRef};
use crate::fork::{AfterForkHandle, AfterForkRegistry, ForkReport};
use crate::process::{ExitGuard, ProcessIdentity, ShutdownOutcome, ShutdownSequencer, ShutdownState};
use crate::tempdir::TempDirectoryLifecycle;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Process-scoped finalization context
pub struct ProcessContext {
    config: ContextConfig,
    process_config: ProcessConfig,
    identity: Arc<dyn ProcessIdentity>,
    finalizers: FinalizerRegistry,
    after_fork: AfterForkRegistry,
    sequencer: Arc<ShutdownSequencer>,
    temp_dir: TempDirectoryLifecycle,
}

impl ProcessContext {
    pub fn builder() -> ProcessContextBuilder {
        ProcessContextBuilder::new()
    }

    /// Context with default collaborators and no child registry
    pub fn new() -> Self {
        ProcessContextBuilder::new().build()
    }

    #[inline]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Process-scoped key/value store
    #[inline]
    pub fn process_config(&self) -> &ProcessConfig {
        &self.process_config
    }

    #[inline]
    pub fn finalizers(&self) -> &FinalizerRegistry {
        &self.finalizers
    }

    #[inline]
    pub fn after_fork(&self) -> &AfterForkRegistry {
        &self.after_fork
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.identity.current_pid()
    }

    /// Register a cleanup action; see [`FinalizerRegistry::register`]
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
        self.finalizers.register(owner, callback, args, kwargs, priority)
    }

    /// Start building a finalizer around `callback`
    pub fn finalizer<F>(&self, callback: F) -> FinalizerBuilder<'_>
    where
        F: FnOnce(Args, Kwargs) -> anyhow::Result<Value> + Send + 'static,
    {
        self.finalizers.finalizer(callback)
    }

    /// Register `callback(owner)` to run in forked children
    pub fn register_after_fork<T, F>(&self, owner: &Arc<T>, callback: F) -> AfterForkHandle
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after_fork.register(owner, callback)
    }

    pub fn run_finalizers(&self, min_priority: Option<Priority>) -> BatchReport {
        self.finalizers.run_finalizers(min_priority)
    }

    pub fn run_after_fork(&self) -> ForkReport {
        self.after_fork.run_after_fork()
    }

    /// Child-side entry point after a fork
    pub fn reinit_after_fork(&self) -> ForkReport {
        info!(pid = self.pid(), "reinitializing after fork");
        self.after_fork.run_after_fork()
    }

    pub fn begin_shutdown(&self) -> ShutdownOutcome {
        self.sequencer.begin_shutdown()
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.sequencer.is_exiting()
    }

    #[inline]
    pub fn shutdown_state(&self) -> ShutdownState {
        self.sequencer.state()
    }

    /// Shared handle to the sequencer, for observers outliving the context
    pub fn sequencer(&self) -> Arc<ShutdownSequencer> {
        Arc::clone(&self.sequencer)
    }

    /// Guard that runs the shutdown sequence when dropped
    pub fn exit_guard(&self) -> ExitGuard {
        ExitGuard::new(Arc::clone(&self.sequencer))
    }

    /// This process's temp directory, removed at the end of shutdown
    pub fn get_temp_dir(&self) -> FinalizeResult<PathBuf> {
        self.temp_dir.get_temp_dir()
    }

    #[inline]
    pub fn temp_dir(&self) -> &TempDirectoryLifecycle {
        &self.temp_dir
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessContext {
    fn drop(&mut self) {
        self.sequencer.mark_indeterminate();
    }
}
