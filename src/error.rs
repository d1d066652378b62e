use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::event::EventKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The workload could not be set up on the parent side. A workload that
    /// forks fine but fails to `exec` is not reported here: it exits with
    /// [`EXEC_FAILURE`][crate::process::EXEC_FAILURE] instead.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {event} counter for pid {pid}: {source}")]
    Open {
        event: EventKind,
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("failed to map ring buffer: {0}")]
    Map(#[source] io::Error),

    #[error("overflow notification with si_code {code}, expected POLL_HUP")]
    NotificationProtocol { code: i32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("overflow listener stopped unexpectedly")]
    Listener,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Errors after which no counter value in this process can be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotificationProtocol { .. } | Self::Listener)
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use super::Error;
    use crate::event::hw::Hardware;

    #[test]
    fn test_fatal() {
        assert!(Error::NotificationProtocol { code: 1 }.is_fatal());
        assert!(Error::Listener.is_fatal());
        assert!(!Error::Map(io::ErrorKind::OutOfMemory.into()).is_fatal());
        assert!(!Error::InvalidConfig("zero period").is_fatal());
    }

    #[test]
    fn test_open_message_carries_event() {
        let e = Error::Open {
            event: Hardware::Instr.into(),
            pid: 42,
            source: io::Error::from_raw_os_error(libc::EACCES),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("failed to open Instr counter for pid 42: "));
    }
}
