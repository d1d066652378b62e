use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::event::hw::Hardware;
use crate::event::EventKind;

/// Everything one invocation of the samplers needs.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Where the workload's stdout goes.
    pub output: PathBuf,
    pub event: EventKind,
    pub signal: SignalConfig,
    pub ring: RingConfig,
    pub interval: IntervalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
            event: EventKind::Hardware(Hardware::Instr),
            signal: SignalConfig::default(),
            ring: RingConfig::default(),
            interval: IntervalConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        self.signal.validate()?;
        self.ring.validate()?;
        self.interval.validate()?;
        Ok(())
    }
}

/// Overflow notification on every `period` events.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalConfig {
    pub period: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { period: 10_000 }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(Error::InvalidConfig("signal period must be positive"));
        }
        Ok(())
    }
}

/// One sample every `period` events, a wakeup every `wakeup` samples.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingConfig {
    pub period: u64,
    pub wakeup: u64,
    /// The data area spans 2^`pages_exp` pages.
    pub pages_exp: u8,
    /// Upper bound on one readiness wait, only bounds how late an exit is
    /// noticed.
    pub timeout: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            period: 1_000,
            wakeup: 1_000,
            pages_exp: 0,
            timeout: Duration::from_millis(500),
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(Error::InvalidConfig("ring-buffer period must be positive"));
        }
        if self.wakeup == 0 {
            return Err(Error::InvalidConfig("ring-buffer wakeup must be positive"));
        }
        if self.wakeup > u32::MAX as u64 {
            return Err(Error::InvalidConfig("ring-buffer wakeup must fit in 32 bits"));
        }
        if self.pages_exp > 16 {
            return Err(Error::InvalidConfig("ring-buffer pages exponent too large"));
        }
        Ok(())
    }

    /// The timeout in milliseconds, as `poll` takes it.
    pub fn timeout_ms(&self) -> i32 {
        self.timeout.as_millis().min(i32::MAX as u128) as i32
    }
}

/// Drain `rate` times per second.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalConfig {
    pub rate: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self { rate: 100 }
    }
}

impl IntervalConfig {
    pub fn validate(&self) -> Result<()> {
        self.interval().map(|_| ())
    }

    /// Sleep between two drains: `1 / rate` seconds.
    pub fn interval(&self) -> Result<Duration> {
        if self.rate == 0 {
            return Err(Error::InvalidConfig("polling rate must be positive"));
        }
        Ok(Duration::from_secs_f64(1.0 / self.rate as f64))
    }
}
