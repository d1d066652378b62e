use std::io::ErrorKind;

use tracing::{trace, warn};

use super::{finish, open, Aggregate, Discipline, Report};
use crate::config::{Opts, RingConfig};
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::ffi::syscall::poll;
use crate::process::TracedWorkload;
use crate::sample::Tally;

/// Counts with a sample every `period` events and a wakeup every `wakeup`
/// samples, drained when the ring buffer becomes readable.
pub(super) fn run(
    workload: &mut TracedWorkload,
    event: EventKind,
    config: &RingConfig,
) -> Result<Report> {
    let mut opts = Opts::user_only();
    opts.sample_period = config.period;
    opts.sample_format.code_addr = true;
    opts.wake_up_samples = config.wakeup;
    opts.record_mmap = true;
    let counter = open(event, workload, opts)?;
    let sampler = counter.sampler(config.pages_exp).map_err(Error::Map)?;

    counter.reset()?;
    counter.enable()?;
    workload.resume()?;

    let timeout = config.timeout_ms();
    let mut aggregate = Aggregate::default();
    let mut tally = Tally::default();
    let exit = loop {
        if let Some(exit) = workload.try_wait()? {
            break exit;
        }
        let revents = match poll(counter.file(), libc::POLLIN, timeout) {
            Ok(Some(revents)) => revents,
            Ok(None) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if revents & libc::POLLIN != 0 {
            aggregate.add(counter.drain()?);
            // Release the space, a full buffer stops the kernel from writing.
            let batch = sampler.consume();
            trace!(samples = batch.samples, lost = batch.lost, "ring readable");
            tally += batch;
        }
        // POLLHUP: the workload is exiting, the next check reaps it.
    };

    tally += sampler.consume();
    if tally.lost > 0 {
        warn!(
            samples = tally.samples,
            lost = tally.lost,
            "ring buffer overflowed, samples were lost"
        );
    }
    finish(Discipline::Ring, &counter, aggregate, workload, exit, Some(tally))
}
