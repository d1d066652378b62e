use std::hint::black_box;

use super::{Counter, Stat};
use crate::config::{Opts, Proc};
use crate::event::hw::Hardware;
use crate::event::sw::Software;
use crate::event::EventKind;
use crate::ffi::bindings as b;

fn counter_of(event: EventKind) -> Option<Counter> {
    match Counter::new(event, Proc::CURRENT, &Opts::user_only()) {
        Ok(counter) => Some(counter),
        Err(e) => {
            eprintln!("skipping: cannot open {} counter: {}", event, e);
            None
        }
    }
}

/// Hosts without a PMU (or with a strict `perf_event_paranoid`) can't run
/// counter tests, those tests return early instead of failing.
pub(crate) fn instr_counter() -> Option<Counter> {
    counter_of(Hardware::Instr.into())
}

/// Software counters need no PMU, only `perf_event_paranoid` can stop them.
pub(crate) fn task_clock_counter() -> Option<Counter> {
    counter_of(Software::TaskClock.into())
}

fn spin(n: u64) -> u64 {
    (0..n).fold(0, |acc, it| black_box(acc ^ it))
}

#[test]
fn test_stat_from_bytes() {
    let words = [42_u64, 1000, 750];
    let buf: Vec<u8> = words.iter().flat_map(|it| it.to_ne_bytes()).collect();

    let stat = Stat::from_bytes(&buf, 0);
    assert_eq!(stat.count, 42);
    assert_eq!(stat.time_enabled, None);
    assert!(!stat.multiplexed());

    let fmt = b::PERF_FORMAT_TOTAL_TIME_ENABLED | b::PERF_FORMAT_TOTAL_TIME_RUNNING;
    assert_eq!(Stat::read_len(fmt), 24);
    let stat = Stat::from_bytes(&buf, fmt);
    assert_eq!(stat.time_enabled, Some(1000));
    assert_eq!(stat.time_running, Some(750));
    assert!(stat.multiplexed());

    let stat = Stat::from_bytes(&buf[..16], b::PERF_FORMAT_TOTAL_TIME_RUNNING);
    assert_eq!(stat.time_enabled, None);
    assert_eq!(stat.time_running, Some(1000));
}

#[test]
fn test_read_is_monotonic_without_reset() {
    let Some(counter) = instr_counter() else {
        return;
    };
    counter.reset().unwrap();
    counter.enable().unwrap();
    black_box(spin(100_000));
    let first = counter.read().unwrap();
    black_box(spin(100_000));
    let second = counter.read().unwrap();
    counter.disable().unwrap();

    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_drain_resets() {
    let Some(counter) = instr_counter() else {
        return;
    };
    counter.enable().unwrap();
    black_box(spin(100_000));
    counter.disable().unwrap();

    let delta = counter.drain().unwrap();
    assert!(delta > 0);
    // Disabled and reset: nothing left to double-count.
    assert_eq!(counter.read().unwrap(), 0);
    assert_eq!(counter.drain().unwrap(), 0);
}

#[test]
fn test_task_clock_counts_cpu_time() {
    let Some(counter) = task_clock_counter() else {
        return;
    };
    counter.reset().unwrap();
    counter.enable().unwrap();
    black_box(spin(1_000_000));
    counter.disable().unwrap();

    let delta = counter.drain().unwrap();
    assert!(delta > 0);
    assert_eq!(counter.read().unwrap(), 0);
}
