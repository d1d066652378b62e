use std::fs::File;
use std::io::{Error, Result};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd};
use std::ptr::null_mut;

use libc::{epoll_event, pid_t, sigset_t};

use super::bindings::{f_owner_ex, F_OWNER_TID, F_SETOWN_EX};
use super::Attr;

macro_rules! check {
    ($result:expr, $ok:expr) => {
        if $result != -1 {
            Ok($ok)
        } else {
            Err(Error::last_os_error())
        }
    };
}

pub fn perf_event_open(attr: &Attr, pid: i32, cpu: i32, group_fd: i32, flags: u64) -> Result<File> {
    let num = libc::SYS_perf_event_open;
    let fd = unsafe { libc::syscall(num, attr as *const Attr, pid, cpu, group_fd, flags) };
    check!(fd, unsafe { File::from_raw_fd(fd as _) })
}

pub fn ioctl(file: &File, op: u64) -> Result<i32> {
    let fd = file.as_raw_fd();
    let result = unsafe { libc::ioctl(fd, op as _) };
    check!(result, result)
}

pub fn ioctl_arg(file: &File, op: u64, arg: u64) -> Result<i32> {
    let fd = file.as_raw_fd();
    let result = unsafe { libc::ioctl(fd, op as _, arg) };
    check!(result, result)
}

pub fn read(file: &File, buf: &mut [u8]) -> Result<usize> {
    let fd = file.as_raw_fd();
    let count = buf.len();
    let buf = buf.as_mut_ptr() as _;
    let bytes = unsafe { libc::read(fd, buf, count) };
    check!(bytes, bytes as _)
}

pub fn write(file: &File, buf: &[u8]) -> Result<usize> {
    let fd = file.as_raw_fd();
    let bytes = unsafe { libc::write(fd, buf.as_ptr() as _, buf.len()) };
    check!(bytes, bytes as _)
}

pub unsafe fn mmap<T>(
    ptr: *mut (),
    len: usize,
    prot: i32,
    flags: i32,
    file: &File,
    offset: i64,
) -> Result<*mut T> {
    let ptr = libc::mmap(ptr as _, len, prot, flags, file.as_raw_fd(), offset);
    if ptr != libc::MAP_FAILED {
        Ok(ptr as _)
    } else {
        Err(Error::last_os_error())
    }
}

pub unsafe fn munmap<T>(ptr: *mut T, len: usize) -> Result<()> {
    let result = libc::munmap(ptr as _, len);
    check!(result, ())
}

pub fn epoll_create1(flags: i32) -> Result<File> {
    let fd = unsafe { libc::epoll_create1(flags) };
    check!(fd, unsafe { File::from_raw_fd(fd as _) })
}

pub fn epoll_ctl(epoll: &File, op: i32, file: &File, event: &mut epoll_event) -> Result<()> {
    let result = unsafe { libc::epoll_ctl(epoll.as_raw_fd(), op, file.as_raw_fd(), event as _) };
    check!(result, ())
}

pub fn epoll_wait<'a>(
    epoll: &File,
    events: &'a mut [epoll_event],
    timeout: i32,
) -> Result<&'a [epoll_event]> {
    let len = unsafe {
        libc::epoll_wait(
            epoll.as_raw_fd(),
            events.as_mut_ptr(),
            events.len() as _,
            timeout,
        )
    };
    check!(len, &events[..len as _])
}

/// Waits for `events` on a single file, returns `None` on timeout.
pub fn poll(file: &File, events: i16, timeout: i32) -> Result<Option<i16>> {
    let mut fds = [libc::pollfd {
        fd: file.as_raw_fd(),
        events,
        revents: 0,
    }];
    let ready = unsafe { libc::poll(fds.as_mut_ptr(), 1, timeout) };
    check!(ready, (ready > 0).then_some(fds[0].revents))
}

pub fn fcntl_getfl(file: &File) -> Result<i32> {
    let result = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETFL) };
    check!(result, result)
}

pub fn fcntl_arg(file: &File, cmd: i32, arg: i32) -> Result<()> {
    let result = unsafe { libc::fcntl(file.as_raw_fd(), cmd, arg) };
    check!(result, ())
}

pub fn fcntl_owner_thread(file: &File, tid: pid_t) -> Result<()> {
    let owner = f_owner_ex {
        type_: F_OWNER_TID,
        pid: tid,
    };
    let result = unsafe { libc::fcntl(file.as_raw_fd(), F_SETOWN_EX, &owner as *const f_owner_ex) };
    check!(result, ())
}

pub fn sigset_of(sig: i32) -> sigset_t {
    let mut set = MaybeUninit::<sigset_t>::uninit();
    unsafe {
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), sig);
        set.assume_init()
    }
}

/// Blocks the signals in `set` for the calling thread only.
pub fn block_signals(set: &sigset_t) -> Result<()> {
    match unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, set, null_mut()) } {
        0 => Ok(()),
        errno => Err(Error::from_raw_os_error(errno)),
    }
}

pub fn signalfd(set: &sigset_t, flags: i32) -> Result<File> {
    let fd = unsafe { libc::signalfd(-1, set, flags) };
    check!(fd, unsafe { File::from_raw_fd(fd) })
}

pub fn eventfd(flags: i32) -> Result<File> {
    let fd = unsafe { libc::eventfd(0, flags) };
    check!(fd, unsafe { File::from_raw_fd(fd) })
}

pub fn gettid() -> pid_t {
    unsafe { libc::syscall(libc::SYS_gettid) as _ }
}

pub fn getpid() -> pid_t {
    unsafe { libc::getpid() }
}

pub fn kill(pid: pid_t, sig: i32) -> Result<()> {
    let result = unsafe { libc::kill(pid, sig) };
    check!(result, ())
}

/// Returns `None` if `WNOHANG` is set and the child has not changed state.
pub fn waitpid(pid: pid_t, options: i32) -> Result<Option<i32>> {
    let mut status = 0;
    let result = unsafe { libc::waitpid(pid, &mut status, options) };
    check!(result, (result != 0).then_some(status))
}

pub fn ptrace_cont(pid: pid_t, sig: i32) -> Result<()> {
    let result = unsafe {
        libc::ptrace(
            libc::PTRACE_CONT,
            pid,
            null_mut::<libc::c_void>(),
            sig as libc::c_long,
        )
    };
    check!(result, ())
}

pub fn ptrace_setoptions(pid: pid_t, options: i32) -> Result<()> {
    let result = unsafe {
        libc::ptrace(
            libc::PTRACE_SETOPTIONS,
            pid,
            null_mut::<libc::c_void>(),
            options as libc::c_long,
        )
    };
    check!(result, ())
}

pub fn fork() -> Result<pid_t> {
    let pid = unsafe { libc::fork() };
    check!(pid, pid)
}
