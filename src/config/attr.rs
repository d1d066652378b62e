use std::io::{ErrorKind, Result};

use super::Opts;
use crate::event::EventConfig;
use crate::ffi::{bindings as b, Attr};

pub(crate) fn from(event_cfg: EventConfig, opts: &Opts) -> Result<Attr> {
    let mut attr = Attr {
        size: size_of::<Attr>() as _,
        ..Default::default()
    };

    // event config:

    attr.type_ = event_cfg.ty;
    attr.config = event_cfg.config;

    // count config:

    macro_rules! when {
        ($bool:ident, $then:tt) => {
            if opts.exclude.$bool {
                attr.$then(1);
            }
        };
    }
    when!(kernel, set_exclude_kernel);
    when!(hv, set_exclude_hv);

    attr.read_format = opts.stat_format.as_read_format();
    attr.set_disabled(1);

    // sample config:

    attr.sample_period = opts.sample_period;
    if opts.sample_format.code_addr {
        attr.sample_type |= b::PERF_SAMPLE_IP;
    }

    attr.set_mmap(opts.record_mmap as _);

    attr.wakeup_events = opts
        .wake_up_samples
        .try_into()
        .map_err(|_| ErrorKind::InvalidInput)?;

    Ok(attr)
}

#[cfg(test)]
mod test {
    use super::from;
    use crate::config::Opts;
    use crate::event::hw::Hardware;
    use crate::event::sw::Software;
    use crate::event::Event;
    use crate::ffi::bindings as b;

    fn attr_of(event: impl Into<Event>, opts: &Opts) -> crate::ffi::Attr {
        let Event(cfg) = event.into();
        from(cfg, opts).unwrap()
    }

    #[test]
    fn test_user_only_instr() {
        let attr = attr_of(Hardware::Instr, &Opts::user_only());
        assert_eq!(attr.type_, b::PERF_TYPE_HARDWARE);
        assert_eq!(attr.config, b::PERF_COUNT_HW_INSTRUCTIONS);
        assert_eq!(attr.size, 136);
        // disabled, exclude_kernel, exclude_hv
        assert_eq!(attr.flags, 1 | 1 << 5 | 1 << 6);
        assert_eq!(attr.sample_period, 0);
        assert_eq!(attr.sample_type, 0);
        assert_eq!(attr.read_format, 0);
    }

    #[test]
    fn test_ring_config() {
        let mut opts = Opts::user_only();
        opts.sample_period = 1000;
        opts.sample_format.code_addr = true;
        opts.wake_up_samples = 1000;
        opts.record_mmap = true;
        opts.stat_format.time_enabled = true;
        opts.stat_format.time_running = true;

        let attr = attr_of(Software::TaskClock, &opts);
        assert_eq!(attr.type_, b::PERF_TYPE_SOFTWARE);
        assert_eq!(attr.config, b::PERF_COUNT_SW_TASK_CLOCK);
        assert_eq!(attr.sample_period, 1000);
        assert_eq!(attr.sample_type, b::PERF_SAMPLE_IP);
        assert_eq!(attr.wakeup_events, 1000);
        assert_eq!(attr.read_format, 0b11);
        assert_eq!(attr.flags, 1 | 1 << 5 | 1 << 6 | 1 << 8);
    }

    #[test]
    fn test_wakeup_overflow() {
        let mut opts = Opts::default();
        opts.wake_up_samples = u64::MAX;
        let Event(cfg) = Hardware::Instr.into();
        assert!(from(cfg, &opts).is_err());
    }
}
