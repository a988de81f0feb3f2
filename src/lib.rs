/*!
 * Process Finalization Library
 *
 * Guarantees cleanup actions run exactly once, in a well-defined order:
 * when an owning guard is dropped, when invoked explicitly, or when the
 * process shuts down.
 *
 * - **Finalizer registry**: `(priority, sequence)`-keyed cleanup entries
 *   with at-most-once invocation and LIFO-within-priority batch runs
 * - **After-fork registry**: reinitialization callbacks for forked children
 * - **Shutdown sequencer**: finalizers, child teardown, remaining finalizers
 * - **Temp directory**: per-process directory removed last at shutdown
 */

pub mod context;
pub mod core;
pub mod finalize;
pub mod fork;
pub mod monitoring;
pub mod process;
pub mod tempdir;

// Re-exports
pub use context::{ProcessContext, ProcessContextBuilder};
pub use crate::core::errors::{FinalizeError, FinalizeResult};
pub use crate::core::types::{AfterForkKey, Args, FinalizerKey, Kwargs, Pid, Priority, Sequence};
pub use crate::core::{ContextConfig, ProcessConfig};
pub use finalize::{BatchReport, FinalizeGuard, Finalizer, FinalizerBuilder, FinalizerRegistry, OwnerRef};
pub use fork::{AfterForkHandle, AfterForkRegistry, ForkAwareLocal, ForkAwareLock, ForkReport};
pub use monitoring::{init_tracing, log, log_to_stderr, LogLevel};
#[cfg(unix)]
pub use process::{ChildProcess, ChildTable};
pub use process::{
    ExitGuard, ProcessHandle, ProcessIdentity, ProcessRegistry, ShutdownOutcome, ShutdownReport,
    ShutdownSequencer, ShutdownState,
};
pub use tempdir::{OsFileSystem, TempDirectoryLifecycle, TempFileSystem};
