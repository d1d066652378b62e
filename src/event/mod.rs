use std::fmt;

pub mod hw;
pub mod sw;

use hw::Hardware;
use sw::Software;

/// A fully resolved event, ready to be put into `perf_event_attr`.
#[derive(Clone, Debug)]
pub struct Event(pub(crate) EventConfig);

#[derive(Clone, Debug)]
pub(crate) struct EventConfig {
    pub ty: u32,
    pub config: u64,
}

/// The events a sampler run can count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Hardware(Hardware),
    Software(Software),
}

impl From<Hardware> for EventKind {
    fn from(value: Hardware) -> Self {
        Self::Hardware(value)
    }
}

impl From<Software> for EventKind {
    fn from(value: Software) -> Self {
        Self::Software(value)
    }
}

impl From<EventKind> for Event {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Hardware(it) => it.into(),
            EventKind::Software(it) => it.into(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(it) => write!(f, "{:?}", it),
            Self::Software(it) => write!(f, "{:?}", it),
        }
    }
}
