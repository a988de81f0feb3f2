/*!
 * Child Process Table
 * Tracks spawned children for shutdown-time termination and joining (unix)
 */

use super::traits::{ProcessHandle, ProcessInfo, ProcessRegistry};
use crate::core::types::Pid;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use parking_lot::Mutex;
use std::io;
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A spawned child process
pub struct ChildProcess {
    name: String,
    daemon: bool,
    pid: Pid,
    child: Mutex<Child>,
    status: Mutex<Option<ExitStatus>>,
}

impl ChildProcess {
    pub fn new(name: impl Into<String>, daemon: bool, child: Child) -> Self {
        Self {
            name: name.into(),
            daemon,
            pid: child.id(),
            child: Mutex::new(child),
            status: Mutex::new(None),
        }
    }

    pub fn spawn(name: impl Into<String>, daemon: bool, command: &mut Command) -> io::Result<Self> {
        let child = command.spawn()?;
        Ok(Self::new(name, daemon, child))
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Exit status if the child has exited, without blocking
    pub fn try_exit_status(&self) -> io::Result<Option<ExitStatus>> {
        let mut status = self.status.lock();
        if status.is_none() {
            *status = self.child.lock().try_wait()?;
        }
        Ok(*status)
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.status.lock()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self.try_exit_status(), Ok(None))
    }
}

impl ProcessHandle for ChildProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_daemon(&self) -> bool {
        self.daemon
    }

    /// Sends SIGTERM; a child that already exited is left alone
    fn terminate(&self) -> io::Result<()> {
        if self.exit_status().is_some() {
            return Ok(());
        }

        match kill(NixPid::from_raw(self.pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    fn join(&self) -> io::Result<()> {
        if self.exit_status().is_some() {
            return Ok(());
        }
        let status = self.child.lock().wait()?;
        debug!(name = %self.name, pid = self.pid, %status, "child joined");
        *self.status.lock() = Some(status);
        Ok(())
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("name", &self.name)
            .field("daemon", &self.daemon)
            .field("pid", &self.pid)
            .field("status", &self.exit_status())
            .finish()
    }
}

/// Registry of the children spawned by this process
pub struct ChildTable {
    current: ProcessInfo,
    children: Mutex<Vec<Arc<ChildProcess>>>,
    available: AtomicBool,
}

impl ChildTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            current: ProcessInfo {
                pid: std::process::id(),
                name: name.into(),
                daemon: false,
            },
            children: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Track an already spawned child
    pub fn add(&self, child: ChildProcess) -> Arc<ChildProcess> {
        let child = Arc::new(child);
        self.children.lock().push(Arc::clone(&child));
        child
    }

    pub fn spawn(
        &self,
        name: impl Into<String>,
        daemon: bool,
        command: &mut Command,
    ) -> io::Result<Arc<ChildProcess>> {
        let child = ChildProcess::spawn(name, daemon, command)?;
        debug!(name = %child.name, pid = child.pid, daemon, "child spawned");
        Ok(self.add(child))
    }

    /// Model process-wide state being torn down: `current_process` turns `None`
    pub fn mark_unavailable(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.children.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.lock().is_empty()
    }
}

impl ProcessRegistry for ChildTable {
    /// Prunes children that have exited
    fn active_children(&self) -> Vec<Arc<dyn ProcessHandle>> {
        let mut children = self.children.lock();
        children.retain(|child| match child.try_exit_status() {
            Ok(status) => status.is_none(),
            Err(e) => {
                warn!(name = %child.name, error = %e, "could not poll child");
                true
            }
        });
        children
            .iter()
            .map(|child| Arc::clone(child) as Arc<dyn ProcessHandle>)
            .collect()
    }

    fn current_process(&self) -> Option<ProcessInfo> {
        if self.available.load(Ordering::SeqCst) {
            Some(self.current.clone())
        } else {
            None
        }
    }
}
