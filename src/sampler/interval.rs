use std::thread;

use super::{finish, open, Aggregate, Discipline, Report};
use crate::config::{IntervalConfig, Opts};
use crate::error::Result;
use crate::event::EventKind;
use crate::process::TracedWorkload;

/// Counts by draining the counter `rate` times per second, whatever the
/// workload does in between.
pub(super) fn run(
    workload: &mut TracedWorkload,
    event: EventKind,
    config: &IntervalConfig,
) -> Result<Report> {
    let interval = config.interval()?;
    let counter = open(event, workload, Opts::user_only())?;

    counter.reset()?;
    counter.enable()?;
    workload.resume()?;

    let mut aggregate = Aggregate::default();
    let exit = loop {
        if let Some(exit) = workload.try_wait()? {
            break exit;
        }
        thread::sleep(interval);
        aggregate.add(counter.drain()?);
    };

    finish(Discipline::Interval, &counter, aggregate, workload, exit, None)
}
