//! The three sampling disciplines and what they share: opening the counter
//! for a workload, accumulating drained deltas, and the final drain.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use tracing::{info, info_span, warn};

use crate::config::{Opts, Proc, RunConfig};
use crate::count::Counter;
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::process::{Exit, Launcher, TracedWorkload, EXEC_FAILURE};
use crate::sample::Tally;

mod interval;
mod ring;
mod signal;

/// How counter values are collected while the workload runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Discipline {
    /// One overflow notification per sampling period.
    Signal,
    /// Readiness on a mapped ring buffer, batched by the wakeup threshold.
    Ring,
    /// Unconditional drain after a fixed sleep.
    Interval,
}

impl Discipline {
    /// Reporting order.
    pub const ALL: [Discipline; 3] = [Self::Signal, Self::Ring, Self::Interval];
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Signal => "signal",
            Self::Ring => "ring",
            Self::Interval => "interval",
        };
        f.write_str(name)
    }
}

/// Running total of one sampler run.
///
/// Every delta added here must come from a [`Counter::drain`], so a value
/// is never added twice. [`Aggregate::finish`] takes the aggregate by value:
/// the final drain can only happen once.
#[derive(Debug, Default)]
pub struct Aggregate {
    total: u64,
    drains: u64,
}

impl Aggregate {
    pub fn add(&mut self, delta: u64) {
        self.total = self.total.saturating_add(delta);
        self.drains += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn drains(&self) -> u64 {
        self.drains
    }

    /// Adds the value read after the counter was disabled and returns the
    /// final total with the number of drains that built it.
    pub fn finish(mut self, last: u64) -> (u64, u64) {
        self.add(last);
        (self.total, self.drains)
    }
}

/// Outcome of one sampler run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub discipline: Discipline,
    pub pid: i32,
    pub total: u64,
    /// Drains that contributed to `total`, the final one included.
    pub drains: u64,
    pub exit: Exit,
    /// Whether a counter was attached at all. A workload that exits before
    /// running is reported without one.
    pub measured: bool,
    /// The counter was not on the PMU for all of its enabled time.
    pub multiplexed: bool,
    /// Records that went through the ring buffer, for ring-buffer runs.
    pub records: Option<Tally>,
}

impl Report {
    fn unmeasured(discipline: Discipline, workload: &TracedWorkload, exit: Exit) -> Self {
        Self {
            discipline,
            pid: workload.pid(),
            total: 0,
            drains: 0,
            exit,
            measured: false,
            multiplexed: false,
            records: None,
        }
    }

    /// The workload could not be executed at all.
    pub fn launch_failed(&self) -> bool {
        !self.measured && self.exit == Exit::Code(EXEC_FAILURE)
    }

    /// A total that does not describe a real run of the workload: it never
    /// ran, or it failed without retiring anything we saw.
    pub fn suspect(&self) -> bool {
        !self.measured || (!self.exit.success() && self.total == 0)
    }
}

/// Launches a fresh workload and measures it with `discipline`.
pub fn run(
    discipline: Discipline,
    config: &RunConfig,
    program: &Path,
    args: &[OsString],
) -> Result<Report> {
    let _span = info_span!("run", %discipline).entered();

    match discipline {
        Discipline::Signal => config.signal.validate()?,
        Discipline::Ring => config.ring.validate()?,
        Discipline::Interval => config.interval.validate()?,
    }

    let mut workload = Launcher::new(&config.output).spawn(program, args)?;
    if let Some(exit) = workload.exit() {
        warn!(pid = workload.pid(), %exit, "workload never ran, nothing to measure");
        return Ok(Report::unmeasured(discipline, &workload, exit));
    }

    let report = match discipline {
        Discipline::Signal => signal::run(&mut workload, config.event, &config.signal),
        Discipline::Ring => ring::run(&mut workload, config.event, &config.ring),
        Discipline::Interval => interval::run(&mut workload, config.event, &config.interval),
    }?;

    info!(
        total = report.total,
        drains = report.drains,
        exit = %report.exit,
        "run finished"
    );
    Ok(report)
}

fn open(event: EventKind, workload: &TracedWorkload, mut opts: Opts) -> Result<Counter> {
    opts.stat_format.time_enabled = true;
    opts.stat_format.time_running = true;
    let pid = workload.pid();
    Counter::new(event, Proc(pid as _), &opts).map_err(|source| Error::Open { event, pid, source })
}

/// Disables the counter and adds what it counted since the last drain.
///
/// Callers make sure the workload has exited and nothing else drains the
/// counter any more.
fn finish(
    discipline: Discipline,
    counter: &Counter,
    aggregate: Aggregate,
    workload: &TracedWorkload,
    exit: Exit,
    records: Option<Tally>,
) -> Result<Report> {
    counter.disable()?;
    let stat = counter.stat()?;
    if stat.multiplexed() {
        warn!(
            time_enabled = stat.time_enabled,
            time_running = stat.time_running,
            "counter was multiplexed, total is an underestimate"
        );
    }
    let (total, drains) = aggregate.finish(stat.count);

    Ok(Report {
        discipline,
        pid: workload.pid(),
        total,
        drains,
        exit,
        measured: true,
        multiplexed: stat.multiplexed(),
        records,
    })
}
