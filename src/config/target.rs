use crate::ffi::bindings as b;

/// A process, counted on whichever CPU it runs.
#[derive(Clone, Copy, Debug)]
pub struct Proc(pub u32);

impl Proc {
    pub const CURRENT: Proc = Proc(0);
}

/// Where a counter counts.
#[derive(Clone, Debug)]
pub struct Target {
    pub(crate) pid: i32,
    pub(crate) cpu: i32,
    pub(crate) flags: u64,
}

impl Target {
    pub fn pid(&self) -> i32 {
        self.pid
    }
}

impl From<Proc> for Target {
    fn from(Proc(pid): Proc) -> Self {
        Target {
            pid: pid as _,
            cpu: -1,
            flags: b::PERF_FLAG_FD_CLOEXEC,
        }
    }
}
