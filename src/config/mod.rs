pub(super) mod attr;
mod run;
mod target;

pub use run::*;
pub use target::*;

/// Counter options.
///
/// Counters always start disabled. The defaults describe a non-sampling
/// counter that counts in every privilege level. Use [`Opts::user_only`]
/// for the counters the samplers open.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Opts {
    pub exclude: Priv,

    pub stat_format: StatFormat,

    /// Overflow on every N event counts, 0 never overflows.
    ///
    /// The kernel keeps a period counter that overflows every N events. On
    /// overflow a sample record is written to the ring buffer (if one is
    /// mapped) and, if the counter file is set up for I/O signaling, the
    /// owner is notified. With
    /// [`Counter::refresh`][crate::count::Counter::refresh] the counter
    /// disables itself after the given number of overflows and the
    /// notification carries `POLL_HUP` instead of `POLL_IN`.
    pub sample_period: u64,
    pub sample_format: SampleFormat,

    /// Wake up ring buffer readers on every N samples available, 0 means
    /// never.
    ///
    /// Batching N samples per wakeup trades sampling granularity for fewer
    /// context switches.
    pub wake_up_samples: u64,

    /// Generate `PERF_RECORD_MMAP` records for executable mappings.
    pub record_mmap: bool,
}

impl Opts {
    /// Ignores kernel and hypervisor events.
    pub fn user_only() -> Self {
        Self {
            exclude: Priv {
                kernel: true,
                hv: true,
            },
            ..Default::default()
        }
    }
}

/// Privilege levels.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Priv {
    /// Kernel space.
    pub kernel: bool,

    /// Hypervisor.
    pub hv: bool,
}

/// Controls the format of [`Stat`][crate::count::Stat].
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatFormat {
    /// Contains the [enabled time][crate::count::Stat::time_enabled] of the counter.
    pub time_enabled: bool,

    /// Contains the [running time][crate::count::Stat::time_running] of the counter.
    pub time_running: bool,
}

impl StatFormat {
    pub(crate) fn as_read_format(&self) -> u64 {
        let mut val = 0;
        if self.time_enabled {
            val |= crate::ffi::bindings::PERF_FORMAT_TOTAL_TIME_ENABLED;
        }
        if self.time_running {
            val |= crate::ffi::bindings::PERF_FORMAT_TOTAL_TIME_RUNNING;
        }
        val
    }
}

/// Controls the content of sample records.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleFormat {
    // PERF_SAMPLE_IP
    /// Record the code address the overflow happened at.
    pub code_addr: bool,
}
