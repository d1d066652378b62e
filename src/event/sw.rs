use super::{Event, EventConfig};
use crate::ffi::bindings as b;

/// Kernel clock events, available without a PMU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Software {
    /// Per-CPU high-resolution timer, in nanoseconds.
    CpuClock,
    /// CPU time of the counted task, in nanoseconds.
    TaskClock,
}

impl From<Software> for Event {
    fn from(value: Software) -> Self {
        let config = match value {
            Software::CpuClock => b::PERF_COUNT_SW_CPU_CLOCK,
            Software::TaskClock => b::PERF_COUNT_SW_TASK_CLOCK,
        };

        Self(EventConfig {
            ty: b::PERF_TYPE_SOFTWARE,
            config,
        })
    }
}
