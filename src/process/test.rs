use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use super::launch::resolve;
use super::{Exit, Launcher, Lifecycle, EXEC_FAILURE};

fn sh(script: &str) -> Vec<OsString> {
    vec!["-c".into(), script.into()]
}

#[test]
fn test_resolve_from_path() {
    let sh = resolve(Path::new("sh"));
    assert!(sh.is_absolute());
    assert!(sh.ends_with("sh"));

    let given = Path::new("./not/searched");
    assert_eq!(resolve(given), given);
}

#[test]
fn test_spawn_stops_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    let launcher = Launcher::new(&output);

    let mut workload = launcher
        .spawn(Path::new("/bin/sh"), &sh("echo measured"))
        .unwrap();
    assert_eq!(workload.state(), Lifecycle::Stopped);
    assert_eq!(workload.args().len(), 2);
    // Held at the first instruction, nothing written yet.
    assert_eq!(fs::read_to_string(&output).unwrap(), "");

    workload.resume().unwrap();
    assert_eq!(workload.state(), Lifecycle::Running);
    assert_eq!(workload.wait().unwrap(), Exit::Code(0));
    assert_eq!(fs::read_to_string(&output).unwrap(), "measured\n");

    // Waiting again reports the same exit.
    assert_eq!(workload.wait().unwrap(), Exit::Code(0));
}

#[test]
fn test_exec_failure_exits() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Launcher::new(dir.path().join("output"));

    let mut workload = launcher
        .spawn(Path::new("/nonexistent/workload"), &[])
        .unwrap();
    assert_eq!(
        workload.state(),
        Lifecycle::Exited(Exit::Code(EXEC_FAILURE))
    );
    // Resuming an exited workload is a no-op.
    workload.resume().unwrap();
    assert_eq!(workload.try_wait().unwrap(), Some(Exit::Code(EXEC_FAILURE)));
}

#[test]
fn test_try_wait_polls() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Launcher::new(dir.path().join("output"));

    let mut workload = launcher
        .spawn(Path::new("/bin/sh"), &sh("sleep 0.2; exit 3"))
        .unwrap();
    workload.resume().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut polls = 0;
    let exit = loop {
        if let Some(exit) = workload.try_wait().unwrap() {
            break exit;
        }
        assert!(Instant::now() < deadline);
        polls += 1;
        std::thread::sleep(Duration::from_millis(10));
    };
    assert_eq!(exit, Exit::Code(3));
    assert!(polls > 0);
    assert!(!exit.success());
}

#[test]
fn test_signals_are_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Launcher::new(dir.path().join("output"));

    let mut workload = launcher
        .spawn(Path::new("/bin/sh"), &sh("kill -TERM $$; sleep 5"))
        .unwrap();
    workload.resume().unwrap();
    assert_eq!(workload.wait().unwrap(), Exit::Signal(libc::SIGTERM));
}

#[test]
fn test_drop_kills_running_workload() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Launcher::new(dir.path().join("output"));

    let start = Instant::now();
    let mut workload = launcher
        .spawn(Path::new("/bin/sh"), &sh("sleep 30"))
        .unwrap();
    workload.resume().unwrap();
    let pid = workload.pid();
    drop(workload);

    assert!(start.elapsed() < Duration::from_secs(10));
    // Reaped: the pid is no longer our child.
    let errno = crate::ffi::syscall::waitpid(pid, libc::WNOHANG)
        .unwrap_err()
        .raw_os_error();
    assert_eq!(errno, Some(libc::ECHILD));
}

#[test]
fn test_exit_display() {
    assert_eq!(Exit::Code(127).to_string(), "exit code 127");
    assert_eq!(Exit::Signal(9).to_string(), "signal 9");
    assert!(Exit::Code(0).success());
    assert!(!Exit::Signal(0).success());
}
