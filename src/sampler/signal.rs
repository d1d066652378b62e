use std::fs::File;
use std::io::ErrorKind;
use std::mem::size_of;
use std::thread;

use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::channel::oneshot;
use futures::executor::block_on;
use libc::pid_t;
use tracing::{debug, error, trace, warn};

use super::{finish, open, Aggregate, Discipline, Report};
use crate::config::{Opts, SignalConfig};
use crate::count::Counter;
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::ffi::bindings::{POLL_HUP, POLL_IN};
use crate::ffi::syscall::{
    block_signals, epoll_create1, epoll_ctl, epoll_wait, eventfd, gettid, kill, read, signalfd,
    sigset_of, write,
};
use crate::process::{Exit, TracedWorkload};

/// Overflow notifications arrive as this signal.
const NOTIFY: i32 = libc::SIGIO;

const TOKEN_SIGNALS: u64 = 0;
const TOKEN_STOP: u64 = 1;

/// Counts with one notification per `period` events.
///
/// The counter is armed for a single overflow at a time. A listener thread
/// owns the notifications: it blocks the signal, reads it from a signalfd,
/// drains the counter and arms it again. Drained deltas go to this thread
/// over a channel while it waits for the workload, so neither the handling
/// of a notification nor the aggregate depends on what an async signal
/// handler may do.
pub(super) fn run(
    workload: &mut TracedWorkload,
    event: EventKind,
    config: &SignalConfig,
) -> Result<Report> {
    let mut opts = Opts::user_only();
    opts.sample_period = config.period;
    opts.sample_format.code_addr = true;
    let counter = open(event, workload, opts)?;
    let stop = eventfd(libc::EFD_CLOEXEC)?;
    let (tx, mut rx) = unbounded();

    let exit = thread::scope(|s| -> Result<Exit> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let pid = workload.pid();
        let (counter, stop) = (&counter, &stop);
        let listener = thread::Builder::new()
            .name("overflow-listener".to_string())
            .spawn_scoped(s, move || listen(counter, stop, pid, tx, ready_tx))?;

        // The listener drops the sender without a word if its setup fails.
        let sampled = match block_on(ready_rx) {
            Ok(()) => measure(counter, workload),
            Err(_) => Err(Error::Listener),
        };

        if let Err(e) = write(stop, &1_u64.to_ne_bytes()) {
            // Never fails for an eventfd below its maximum.
            error!("failed to stop listener: {}", e);
        }
        let notifications = listener.join().map_err(|_| Error::Listener)??;
        debug!(notifications, "listener stopped");

        sampled
    })?;

    // The listener is gone, its deltas are all queued.
    let mut aggregate = Aggregate::default();
    while let Ok(Some(delta)) = rx.try_next() {
        aggregate.add(delta);
    }
    finish(Discipline::Signal, &counter, aggregate, workload, exit, None)
}

fn measure(counter: &Counter, workload: &mut TracedWorkload) -> Result<Exit> {
    counter.reset()?;
    counter.refresh(1)?;
    workload.resume()?;
    Ok(workload.wait()?)
}

/// Returns the number of notifications handled.
///
/// Once ready, any failure kills the workload: the counter is no longer
/// re-armed and the run must not wait for the workload to end on its own.
fn listen(
    counter: &Counter,
    stop: &File,
    pid: pid_t,
    tx: UnboundedSender<u64>,
    ready: oneshot::Sender<()>,
) -> Result<u64> {
    let mask = sigset_of(NOTIFY);
    block_signals(&mask)?;
    let signals = signalfd(&mask, libc::SFD_CLOEXEC | libc::SFD_NONBLOCK)?;

    counter.route_signal(NOTIFY, gettid())?;
    let _mute = Mute(counter);

    let epoll = epoll_create1(libc::EPOLL_CLOEXEC)?;
    for (file, token) in [(&signals, TOKEN_SIGNALS), (stop, TOKEN_STOP)] {
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as _,
            u64: token,
        };
        epoll_ctl(&epoll, libc::EPOLL_CTL_ADD, file, &mut event)?;
    }

    let _ = ready.send(());

    let served = serve(counter, &epoll, &signals, &tx);
    if let Err(e) = &served {
        error!(pid, "overflow listener failed, killing workload: {}", e);
        if let Err(e) = kill(pid, libc::SIGKILL) {
            warn!(pid, "failed to kill workload: {}", e);
        }
    }
    served
}

fn serve(
    counter: &Counter,
    epoll: &File,
    signals: &File,
    tx: &UnboundedSender<u64>,
) -> Result<u64> {
    let mut events = [libc::epoll_event { events: 0, u64: 0 }; 2];
    let mut notifications = 0;
    loop {
        let ready = match epoll_wait(epoll, &mut events, -1) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        let mut stopping = false;
        for event in ready {
            match event.u64 {
                TOKEN_STOP => stopping = true,
                _ => notifications += on_signals(counter, signals, tx)?,
            }
        }
        // Notifications that raced with the stop were handled above.
        if stopping {
            return Ok(notifications);
        }
    }
}

fn on_signals(counter: &Counter, signals: &File, tx: &UnboundedSender<u64>) -> Result<u64> {
    let mut handled = 0;
    loop {
        let mut buf = [0_u8; size_of::<libc::signalfd_siginfo>()];
        match read(signals, &mut buf) {
            Ok(n) if n == buf.len() => (),
            Ok(n) => {
                warn!(n, "short signalfd read");
                return Ok(handled);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(handled),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
        let info =
            unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const libc::signalfd_siginfo) };

        // Armed for one overflow, the counter must have disabled itself.
        if info.ssi_code != POLL_HUP {
            error!(
                code = info.ssi_code,
                still_enabled = info.ssi_code == POLL_IN,
                "unexpected overflow notification"
            );
            return Err(Error::NotificationProtocol {
                code: info.ssi_code,
            });
        }

        let delta = counter.drain()?;
        counter.refresh(1)?;
        trace!(delta, "overflow");
        tx.unbounded_send(delta).map_err(|_| Error::Listener)?;
        handled += 1;
    }
}

/// Turns notifications off when the listener exits, however it exits.
struct Mute<'a>(&'a Counter);

impl Drop for Mute<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.mute_signal() {
            warn!("failed to mute counter notifications: {}", e);
        }
    }
}
