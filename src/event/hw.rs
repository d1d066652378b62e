use super::{Event, EventConfig};
use crate::ffi::bindings as b;

/// Generalized hardware events.
///
/// Not every CPU implements all of them; opening a counter for an
/// unsupported event fails with `ENOENT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Hardware {
    CpuCycle,
    BusCycle,
    RefCpuCycle,

    CacheMiss,
    CacheAccess,

    BranchMiss,
    BranchInstr,

    /// Retired instructions.
    Instr,
}

impl From<Hardware> for Event {
    fn from(value: Hardware) -> Self {
        let config = match value {
            Hardware::CpuCycle => b::PERF_COUNT_HW_CPU_CYCLES,
            Hardware::BusCycle => b::PERF_COUNT_HW_BUS_CYCLES,
            Hardware::RefCpuCycle => b::PERF_COUNT_HW_REF_CPU_CYCLES,

            Hardware::CacheMiss => b::PERF_COUNT_HW_CACHE_MISSES,
            Hardware::CacheAccess => b::PERF_COUNT_HW_CACHE_REFERENCES,

            Hardware::BranchMiss => b::PERF_COUNT_HW_BRANCH_MISSES,
            Hardware::BranchInstr => b::PERF_COUNT_HW_BRANCH_INSTRUCTIONS,

            Hardware::Instr => b::PERF_COUNT_HW_INSTRUCTIONS,
        };

        Self(EventConfig {
            ty: b::PERF_TYPE_HARDWARE,
            config,
        })
    }
}
