use crate::ffi::bindings as b;

/// A counter reading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    pub count: u64,
    pub time_enabled: Option<u64>,
    pub time_running: Option<u64>,
}

impl Stat {
    pub(crate) const MAX_LEN: usize = 3 * size_of::<u64>();

    // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L344
    // struct read_format {
    //     u64 value;
    //     { u64 time_enabled; } && PERF_FORMAT_TOTAL_TIME_ENABLED
    //     { u64 time_running; } && PERF_FORMAT_TOTAL_TIME_RUNNING
    //     ...
    // };
    pub(crate) fn read_len(read_format: u64) -> usize {
        let mut size = size_of::<u64>();
        if read_format & b::PERF_FORMAT_TOTAL_TIME_ENABLED > 0 {
            size += size_of::<u64>();
        }
        if read_format & b::PERF_FORMAT_TOTAL_TIME_RUNNING > 0 {
            size += size_of::<u64>();
        }
        size
    }

    /// `buf` must hold at least `read_len(read_format)` bytes.
    pub(crate) fn from_bytes(buf: &[u8], read_format: u64) -> Self {
        let mut words = buf
            .chunks_exact(size_of::<u64>())
            .map(|it| u64::from_ne_bytes(it.try_into().unwrap_or_default()));
        let mut next = || words.next().unwrap_or_default();

        let count = next();
        let time_enabled =
            (read_format & b::PERF_FORMAT_TOTAL_TIME_ENABLED > 0).then(&mut next);
        let time_running =
            (read_format & b::PERF_FORMAT_TOTAL_TIME_RUNNING > 0).then(&mut next);

        Self {
            count,
            time_enabled,
            time_running,
        }
    }

    /// Whether the counter shared the PMU with other events and ran for
    /// only part of the time it was enabled.
    pub fn multiplexed(&self) -> bool {
        match (self.time_enabled, self.time_running) {
            (Some(enabled), Some(running)) => running < enabled,
            _ => false,
        }
    }
}
