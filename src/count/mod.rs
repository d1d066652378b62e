use std::fs::File;
use std::io::{self, Result};

use tracing::trace;

use crate::config::attr::from;
use crate::config::{Opts, Target};
use crate::event::Event;
use crate::ffi::bindings::{self as b, F_SETSIG};
use crate::ffi::syscall::{
    fcntl_arg, fcntl_getfl, fcntl_owner_thread, ioctl, ioctl_arg, perf_event_open, read,
};
use crate::ffi::Attr;
use crate::sample::Sampler;

mod stat;

pub use stat::*;

/// One hardware counter bound to a target.
///
/// The counter file is closed when the `Counter` is dropped, so every
/// control operation below is only reachable while the counter is open.
pub struct Counter {
    pub(crate) target: Target,
    pub(crate) attr: Attr,
    pub(crate) perf: File,
}

impl Counter {
    pub fn new(event: impl Into<Event>, target: impl Into<Target>, opts: &Opts) -> Result<Self> {
        let target = target.into();
        let Event(event_cfg) = event.into();
        let attr = from(event_cfg, opts)?;
        let perf = perf_event_open(&attr, target.pid, target.cpu, -1, target.flags)?;

        Ok(Self { target, attr, perf })
    }

    /// Maps a ring buffer of 1 + 2^`exp` pages for this counter.
    pub fn sampler(&self, exp: u8) -> Result<Sampler> {
        Sampler::new(&self.perf, exp)
    }

    pub fn file(&self) -> &File {
        &self.perf
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn enable(&self) -> Result<()> {
        ioctl(&self.perf, b::PERF_IOC_OP_ENABLE)?;
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        ioctl(&self.perf, b::PERF_IOC_OP_DISABLE)?;
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        ioctl(&self.perf, b::PERF_IOC_OP_RESET)?;
        Ok(())
    }

    /// Enables the counter for `overflows` more overflows.
    ///
    /// The counter disables itself once they are used up, and the
    /// notification for the last one carries `POLL_HUP`.
    pub fn refresh(&self, overflows: u32) -> Result<()> {
        ioctl_arg(&self.perf, b::PERF_IOC_OP_REFRESH, overflows as _)?;
        Ok(())
    }

    pub fn stat(&self) -> Result<Stat> {
        let mut buf = [0; Stat::MAX_LEN];
        let len = Stat::read_len(self.attr.read_format);
        let n = read(&self.perf, &mut buf[..len])?;
        if n != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short counter read: {} of {} bytes", n, len),
            ));
        }
        Ok(Stat::from_bytes(&buf[..len], self.attr.read_format))
    }

    /// Current cumulative value.
    pub fn read(&self) -> Result<u64> {
        Ok(self.stat()?.count)
    }

    /// Reads the current value and resets the counter to zero.
    ///
    /// Events retired between the two system calls are dropped, never
    /// counted twice.
    pub fn drain(&self) -> Result<u64> {
        let delta = self.read()?;
        self.reset()?;
        trace!(delta, "drained counter");
        Ok(delta)
    }

    /// Delivers overflow notifications as `sig` to the thread `tid`.
    pub fn route_signal(&self, sig: i32, tid: libc::pid_t) -> Result<()> {
        fcntl_owner_thread(&self.perf, tid)?;
        fcntl_arg(&self.perf, F_SETSIG, sig)?;
        let flags = fcntl_getfl(&self.perf)?;
        fcntl_arg(
            &self.perf,
            libc::F_SETFL,
            flags | libc::O_NONBLOCK | libc::O_ASYNC,
        )?;
        Ok(())
    }

    /// Stops overflow notifications, the counter keeps counting.
    pub fn mute_signal(&self) -> Result<()> {
        let flags = fcntl_getfl(&self.perf)?;
        fcntl_arg(&self.perf, libc::F_SETFL, flags & !libc::O_ASYNC)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test;
