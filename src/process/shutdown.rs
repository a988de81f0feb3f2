/*!
 * Shutdown Sequencer
 *
 * Process-exit protocol:
 *
 * 1. Run finalizers with priority >= the first-pass minimum (0 by default)
 * 2. Terminate daemon children, then join every remaining child
 * 3. Run all remaining finalizers and empty the registry
 *
 * Ordinary resources go first, children exit next (possibly releasing
 * what those resources pinned), and durable negative-priority resources
 * such as the shared temp directory are removed last.
 */

use super::traits::ProcessRegistry;
use crate::core::errors::{FinalizeError, FinalizeResult};
use crate::core::types::Priority;
use crate::finalize::{BatchReport, FinalizerRegistry};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shutdown state machine: `Running -> ShuttingDown -> Done`
///
/// `Indeterminate` is entered when the owning context is torn down
/// without an orderly shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    ShuttingDown = 1,
    Done = 2,
    Indeterminate = 3,
}

impl ShutdownState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ShutdownState::Running,
            1 => ShutdownState::ShuttingDown,
            2 => ShutdownState::Done,
            _ => ShutdownState::Indeterminate,
        }
    }

    /// Everything but `Running` counts as exiting
    #[inline]
    pub fn is_exiting(self) -> bool {
        self != ShutdownState::Running
    }
}

/// What one shutdown sequence did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub first_pass: BatchReport,
    pub terminated: usize,
    pub joined: usize,
    /// Child teardown skipped because process state was unavailable
    pub children_skipped: bool,
    pub final_pass: BatchReport,
}

/// Result of a shutdown request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This caller ran the full sequence
    Completed(ShutdownReport),
    /// Another caller got there first; no work was done
    AlreadyStarted(ShutdownState),
}

impl ShutdownOutcome {
    #[inline]
    pub fn report(&self) -> Option<&ShutdownReport> {
        match self {
            ShutdownOutcome::Completed(report) => Some(report),
            ShutdownOutcome::AlreadyStarted(_) => None,
        }
    }
}

/// Runs the exit protocol at most once
pub struct ShutdownSequencer {
    state: AtomicU8,
    finalizers: FinalizerRegistry,
    processes: Option<Arc<dyn ProcessRegistry>>,
    min_priority: Priority,
}

impl ShutdownSequencer {
    pub fn new(
        finalizers: FinalizerRegistry,
        processes: Option<Arc<dyn ProcessRegistry>>,
        min_priority: Priority,
    ) -> Self {
        Self {
            state: AtomicU8::new(ShutdownState::Running as u8),
            finalizers,
            processes,
            min_priority,
        }
    }

    #[inline]
    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.state().is_exiting()
    }

    /// Run the shutdown sequence if nobody has started it yet
    ///
    /// Never fails: callback failures are logged by the batch runner and
    /// an unavailable process registry skips child teardown.
    pub fn begin_shutdown(&self) -> ShutdownOutcome {
        if let Err(current) = self.state.compare_exchange(
            ShutdownState::Running as u8,
            ShutdownState::ShuttingDown as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return ShutdownOutcome::AlreadyStarted(ShutdownState::from_u8(current));
        }

        info!("process shutting down");
        let mut report = ShutdownReport::default();

        debug!(min_priority = self.min_priority, "running all exit finalizers with priority >= minimum");
        report.first_pass = self.finalizers.run_finalizers(Some(self.min_priority));

        self.teardown_children(&mut report);

        debug!("running the remaining exit finalizers");
        report.final_pass = self.finalizers.run_finalizers(None);

        self.state.store(ShutdownState::Done as u8, Ordering::Release);
        ShutdownOutcome::Completed(report)
    }

    /// Registry of live children, if process state is still obtainable
    fn process_registry(&self) -> FinalizeResult<&Arc<dyn ProcessRegistry>> {
        let processes = self
            .processes
            .as_ref()
            .ok_or(FinalizeError::ProcessUnavailable)?;
        processes
            .current_process()
            .ok_or(FinalizeError::ProcessUnavailable)?;
        Ok(processes)
    }

    fn teardown_children(&self, report: &mut ShutdownReport) {
        let processes = match self.process_registry() {
            Ok(processes) => processes,
            Err(e) => {
                debug!(error = %e, "skipping child teardown");
                report.children_skipped = true;
                return;
            }
        };

        for child in processes.active_children() {
            if child.is_daemon() {
                info!("calling terminate() for daemon {}", child.name());
                match child.terminate() {
                    Ok(()) => report.terminated += 1,
                    Err(e) => warn!(name = child.name(), error = %e, "terminate failed"),
                }
            }
        }

        for child in processes.active_children() {
            info!("calling join() for process {}", child.name());
            match child.join() {
                Ok(()) => report.joined += 1,
                Err(e) => warn!(name = child.name(), error = %e, "join failed"),
            }
        }
    }

    /// Record that process-wide state is being torn down
    ///
    /// Only moves out of `Running`; an orderly shutdown in progress or
    /// finished is left alone.
    pub fn mark_indeterminate(&self) {
        let _ = self.state.compare_exchange(
            ShutdownState::Running as u8,
            ShutdownState::Indeterminate as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Runs the shutdown sequence when dropped
///
/// Hold one in `main` to get exit-time cleanup on normal return.
#[must_use = "shutdown runs when the guard is dropped"]
pub struct ExitGuard {
    sequencer: Arc<ShutdownSequencer>,
}

impl ExitGuard {
    pub fn new(sequencer: Arc<ShutdownSequencer>) -> Self {
        Self { sequencer }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.sequencer.begin_shutdown();
    }
}
