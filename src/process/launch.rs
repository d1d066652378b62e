use std::ffi::{CString, NulError, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::ptr::null_mut;

use tracing::{debug, warn};

use super::{Lifecycle, Status, TracedWorkload, EXEC_FAILURE};
use crate::error::{Error, Result};
use crate::ffi::syscall::{fork, getpid, ptrace_setoptions, waitpid};

const EXEC_FAILURE_MSG: &[u8] = b"instr-sampler: failed to execute workload\n";

/// Starts workloads stopped under trace control, their stdout redirected
/// to a file.
#[derive(Clone, Debug)]
pub struct Launcher {
    output: PathBuf,
}

impl Launcher {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Forks a child that `exec`s `program` and stops at its first
    /// instruction.
    ///
    /// If the `exec` fails, the child exits with [`EXEC_FAILURE`] and the
    /// returned workload is already [`Lifecycle::Exited`].
    ///
    /// Must not be called while another thread of this process could hold
    /// a lock the child needs: the child only makes async-signal-safe calls
    /// between `fork` and `exec`.
    pub fn spawn(&self, program: &Path, args: &[OsString]) -> Result<TracedWorkload> {
        let spawn_err = |source: io::Error| Error::Spawn {
            program: program.to_path_buf(),
            source,
        };
        let nul_err = |_: NulError| spawn_err(ErrorKind::InvalidInput.into());

        // Everything the child touches is allocated before fork.
        let resolved = resolve(program);
        let path = CString::new(resolved.as_os_str().as_bytes()).map_err(nul_err)?;
        let argv_owned = std::iter::once(program.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|it| CString::new(it.as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(nul_err)?;
        let mut argv: Vec<*const libc::c_char> = argv_owned.iter().map(|it| it.as_ptr()).collect();
        argv.push(std::ptr::null());

        let output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.output)
            .map_err(spawn_err)?;
        let output_fd = output.as_raw_fd();

        let parent = getpid();
        let pid = fork().map_err(spawn_err)?;
        if pid == 0 {
            // Child: async-signal-safe calls only, never returns.
            unsafe {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
                if libc::getppid() != parent {
                    libc::_exit(EXEC_FAILURE);
                }
                if libc::dup2(output_fd, libc::STDOUT_FILENO) == -1
                    || libc::ptrace(
                        libc::PTRACE_TRACEME,
                        0,
                        null_mut::<libc::c_void>(),
                        null_mut::<libc::c_void>(),
                    ) == -1
                {
                    libc::_exit(EXEC_FAILURE);
                }
                libc::execv(path.as_ptr(), argv.as_ptr());
                libc::write(
                    libc::STDERR_FILENO,
                    EXEC_FAILURE_MSG.as_ptr() as _,
                    EXEC_FAILURE_MSG.len(),
                );
                libc::_exit(EXEC_FAILURE);
            }
        }
        drop(output);

        let mut workload = TracedWorkload {
            pid,
            program: program.to_path_buf(),
            args: args.to_vec(),
            state: Lifecycle::Running,
        };

        // The first stop is the trap raised by a successful exec.
        let status = loop {
            match waitpid(pid, 0) {
                Ok(Some(status)) => break status,
                Ok(None) => (),
                Err(e) if e.kind() == ErrorKind::Interrupted => (),
                Err(e) => return Err(spawn_err(e)),
            }
        };
        match Status::decode(status) {
            Status::Stopped(_) => {
                workload.state = Lifecycle::Stopped;
                // Take the workload down with us if we die first.
                ptrace_setoptions(pid, libc::PTRACE_O_EXITKILL).map_err(spawn_err)?;
                debug!(pid, program = %resolved.display(), "workload stopped after exec");
            }
            Status::Exited(exit) => {
                workload.state = Lifecycle::Exited(exit);
                warn!(pid, program = %resolved.display(), %exit, "workload exited before running");
            }
            Status::Other => {
                return Err(spawn_err(io::Error::other(format!(
                    "unexpected wait status {:#x}",
                    status
                ))));
            }
        }

        Ok(workload)
    }
}

/// Searches `PATH` for a bare command name, like a shell would.
///
/// Falls back to the name itself, `exec` then reports the failure.
pub(super) fn resolve(program: &Path) -> PathBuf {
    if program.as_os_str().as_bytes().contains(&b'/') {
        return program.to_path_buf();
    }
    let Some(path_var) = std::env::var_os("PATH") else {
        return program.to_path_buf();
    };
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .unwrap_or_else(|| program.to_path_buf())
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|it| it.is_file() && it.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
