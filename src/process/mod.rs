/*!
 * Process Management
 * Process collaborators, the child table and the shutdown protocol
 */

#[cfg(unix)]
pub mod children;
pub mod shutdown;
pub mod traits;

#[cfg(unix)]
pub use children::{ChildProcess, ChildTable};
pub use shutdown::{ExitGuard, ShutdownOutcome, ShutdownReport, ShutdownSequencer, ShutdownState};
pub use traits::{
    OsProcessIdentity, ProcessHandle, ProcessIdentity, ProcessInfo, ProcessRegistry,
    SimulatedIdentity,
};
