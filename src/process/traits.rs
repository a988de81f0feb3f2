/*!
 * Process Traits
 * Collaborator abstractions for process identity and the child registry
 */

use crate::core::types::Pid;
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Source of the current process id
///
/// Entries record the pid at registration and compare it at invocation,
/// so entries inherited across a fork never fire in the child.
pub trait ProcessIdentity: Send + Sync {
    fn current_pid(&self) -> Pid;
}

/// Operating-system process id
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessIdentity;

impl ProcessIdentity for OsProcessIdentity {
    #[inline]
    fn current_pid(&self) -> Pid {
        std::process::id()
    }
}

/// Settable process id, for simulating a fork without forking
#[derive(Debug, Default)]
pub struct SimulatedIdentity {
    pid: AtomicU32,
}

impl SimulatedIdentity {
    pub fn new(pid: Pid) -> Arc<Self> {
        Arc::new(Self {
            pid: AtomicU32::new(pid),
        })
    }

    /// Pretend to be a different process from now on
    pub fn set_pid(&self, pid: Pid) {
        self.pid.store(pid, Ordering::SeqCst);
    }
}

impl ProcessIdentity for SimulatedIdentity {
    fn current_pid(&self) -> Pid {
        self.pid.load(Ordering::SeqCst)
    }
}

/// Snapshot of the current process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub daemon: bool,
}

/// Handle to a child process
pub trait ProcessHandle: Send + Sync {
    fn name(&self) -> &str;

    fn is_daemon(&self) -> bool;

    /// Request forced termination
    fn terminate(&self) -> io::Result<()>;

    /// Block until the process has exited
    fn join(&self) -> io::Result<()>;
}

/// Registry of live child processes
pub trait ProcessRegistry: Send + Sync {
    /// Children that have not exited yet
    fn active_children(&self) -> Vec<Arc<dyn ProcessHandle>>;

    /// The current process, or `None` once process state is torn down
    fn current_process(&self) -> Option<ProcessInfo>;
}
