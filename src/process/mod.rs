//! Traced workloads: launching a child held at its first instruction and
//! following it until it exits.

use std::ffi::OsString;
use std::fmt;
use std::io::{ErrorKind, Result};
use std::path::{Path, PathBuf};

use libc::pid_t;
use tracing::{debug, trace, warn};

use crate::ffi::syscall::{kill, ptrace_cont, waitpid};

mod launch;

pub use launch::*;

/// Exit code of a child that could not `exec` the workload.
pub const EXEC_FAILURE: i32 = 127;

/// How a workload ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exit {
    Code(i32),
    Signal(i32),
}

impl Exit {
    pub fn success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Signal(sig) => write!(f, "signal {}", sig),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Stopped by the tracer right after `exec`, nothing of the workload ran.
    Stopped,
    Running,
    Exited(Exit),
}

enum Status {
    Exited(Exit),
    Stopped(i32),
    Other,
}

impl Status {
    fn decode(status: i32) -> Self {
        if libc::WIFEXITED(status) {
            Self::Exited(Exit::Code(libc::WEXITSTATUS(status)))
        } else if libc::WIFSIGNALED(status) {
            Self::Exited(Exit::Signal(libc::WTERMSIG(status)))
        } else if libc::WIFSTOPPED(status) {
            Self::Stopped(libc::WSTOPSIG(status))
        } else {
            Self::Other
        }
    }
}

/// A child process under our trace control.
///
/// Dropping a workload that has not exited kills and reaps it.
pub struct TracedWorkload {
    pid: pid_t,
    program: PathBuf,
    args: Vec<OsString>,
    state: Lifecycle,
}

impl TracedWorkload {
    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn exit(&self) -> Option<Exit> {
        match self.state {
            Lifecycle::Exited(exit) => Some(exit),
            _ => None,
        }
    }

    /// Releases a stopped workload. Does nothing once it has exited.
    pub fn resume(&mut self) -> Result<()> {
        if self.state == Lifecycle::Stopped {
            ptrace_cont(self.pid, 0)?;
            self.state = Lifecycle::Running;
            debug!(pid = self.pid, "resumed workload");
        }
        Ok(())
    }

    /// Blocks until the workload exits.
    pub fn wait(&mut self) -> Result<Exit> {
        loop {
            if let Some(exit) = self.exit() {
                return Ok(exit);
            }
            match waitpid(self.pid, 0) {
                Ok(Some(status)) => {
                    self.on_status(status)?;
                }
                Ok(None) => (),
                Err(e) if e.kind() == ErrorKind::Interrupted => (),
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns the exit if the workload has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<Exit>> {
        if let Some(exit) = self.exit() {
            return Ok(Some(exit));
        }
        match waitpid(self.pid, libc::WNOHANG) {
            Ok(Some(status)) => self.on_status(status),
            Ok(None) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn on_status(&mut self, status: i32) -> Result<Option<Exit>> {
        match Status::decode(status) {
            Status::Exited(exit) => {
                debug!(pid = self.pid, %exit, "workload exited");
                self.state = Lifecycle::Exited(exit);
                Ok(Some(exit))
            }
            // A traced child stops on every signal delivered to it, pass the
            // signal on. Traps are ours.
            Status::Stopped(sig) => {
                let forward = if sig == libc::SIGTRAP { 0 } else { sig };
                trace!(pid = self.pid, sig, "forwarding signal-delivery stop");
                match ptrace_cont(self.pid, forward) {
                    // Died in between, the next wait reports it.
                    Err(e) if e.raw_os_error() == Some(libc::ESRCH) => Ok(None),
                    Err(e) => Err(e),
                    Ok(()) => Ok(None),
                }
            }
            Status::Other => Ok(None),
        }
    }
}

impl Drop for TracedWorkload {
    fn drop(&mut self) {
        if self.exit().is_some() {
            return;
        }
        warn!(pid = self.pid, "killing unfinished workload");
        if let Err(e) = kill(self.pid, libc::SIGKILL) {
            warn!(pid = self.pid, "failed to kill workload: {}", e);
        }
        loop {
            match waitpid(self.pid, 0) {
                Ok(Some(status)) => {
                    if let Status::Exited(exit) = Status::decode(status) {
                        self.state = Lifecycle::Exited(exit);
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => (),
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod test;
