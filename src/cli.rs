//! CLI definitions and argument types.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use instr_sampler::config::RunConfig;
use instr_sampler::event::hw::Hardware;
use instr_sampler::event::sw::Software;
use instr_sampler::event::EventKind;
use instr_sampler::sampler::Discipline;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "instr-sampler")]
#[command(about = "Count the instructions a program retires under three sampling disciplines")]
#[command(version)]
pub struct Cli {
    /// Program to measure, looked up in PATH
    #[arg(value_name = "PROGRAM")]
    pub program: PathBuf,

    /// Arguments passed to the program
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,

    /// File the program's stdout is written to
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Event to count
    #[arg(long, value_enum, default_value = "instr")]
    pub event: EventArg,

    /// Events between two overflow notifications
    #[arg(long, default_value = "10000")]
    pub signal_period: u64,

    /// Events between two ring-buffer samples
    #[arg(long, default_value = "1000")]
    pub ring_period: u64,

    /// Samples between two ring-buffer wakeups
    #[arg(long, default_value = "1000")]
    pub ring_wakeup: u64,

    /// The ring-buffer data area spans 2^N pages
    #[arg(long, value_name = "N", default_value = "0")]
    pub ring_pages: u8,

    /// Longest single wait for ring-buffer readiness
    #[arg(long, default_value = "500")]
    pub ring_timeout_ms: u64,

    /// Drains per second of the interval discipline
    #[arg(long, default_value = "100")]
    pub poll_rate: u64,

    /// Only run these disciplines (repeatable, default all)
    #[arg(long, value_enum)]
    pub only: Vec<DisciplineArg>,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        let mut config = RunConfig {
            output: self.output.clone(),
            event: self.event.into(),
            ..Default::default()
        };
        config.signal.period = self.signal_period;
        config.ring.period = self.ring_period;
        config.ring.wakeup = self.ring_wakeup;
        config.ring.pages_exp = self.ring_pages;
        config.ring.timeout = Duration::from_millis(self.ring_timeout_ms);
        config.interval.rate = self.poll_rate;
        config
    }

    /// Selected disciplines in reporting order, each once.
    pub fn disciplines(&self) -> Vec<Discipline> {
        if self.only.is_empty() {
            return Discipline::ALL.to_vec();
        }
        let mut selected: Vec<Discipline> = self.only.iter().map(|&it| it.into()).collect();
        selected.sort();
        selected.dedup();
        selected
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EventArg {
    CpuCycle,
    BusCycle,
    RefCpuCycle,
    CacheMiss,
    CacheAccess,
    BranchMiss,
    BranchInstr,
    Instr,
    /// CPU time of the program in nanoseconds, needs no PMU
    TaskClock,
    /// Per-CPU clock in nanoseconds, needs no PMU
    CpuClock,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::CpuCycle => Hardware::CpuCycle.into(),
            EventArg::BusCycle => Hardware::BusCycle.into(),
            EventArg::RefCpuCycle => Hardware::RefCpuCycle.into(),
            EventArg::CacheMiss => Hardware::CacheMiss.into(),
            EventArg::CacheAccess => Hardware::CacheAccess.into(),
            EventArg::BranchMiss => Hardware::BranchMiss.into(),
            EventArg::BranchInstr => Hardware::BranchInstr.into(),
            EventArg::Instr => Hardware::Instr.into(),
            EventArg::TaskClock => Software::TaskClock.into(),
            EventArg::CpuClock => Software::CpuClock.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DisciplineArg {
    Signal,
    Ring,
    Interval,
}

impl From<DisciplineArg> for Discipline {
    fn from(arg: DisciplineArg) -> Self {
        match arg {
            DisciplineArg::Signal => Discipline::Signal,
            DisciplineArg::Ring => Discipline::Ring,
            DisciplineArg::Interval => Discipline::Interval,
        }
    }
}

#[cfg(test)]
mod test {
    use std::ffi::OsString;

    use clap::Parser;
    use instr_sampler::event::hw::Hardware;
    use instr_sampler::event::sw::Software;
    use instr_sampler::event::EventKind;
    use instr_sampler::sampler::Discipline;

    use super::Cli;

    #[test]
    fn test_defaults_match_run_config() {
        let cli = Cli::try_parse_from(["instr-sampler", "/bin/true"]).unwrap();
        let config = cli.run_config();
        let default = instr_sampler::config::RunConfig::default();
        assert_eq!(config.output, default.output);
        assert_eq!(config.event, default.event);
        assert_eq!(config.signal.period, default.signal.period);
        assert_eq!(config.ring.period, default.ring.period);
        assert_eq!(config.ring.wakeup, default.ring.wakeup);
        assert_eq!(config.ring.pages_exp, default.ring.pages_exp);
        assert_eq!(config.ring.timeout, default.ring.timeout);
        assert_eq!(config.interval.rate, default.interval.rate);
        assert_eq!(cli.disciplines(), Discipline::ALL.to_vec());
    }

    #[test]
    fn test_workload_args_are_passed_through() {
        let cli = Cli::try_parse_from([
            "instr-sampler",
            "--event",
            "branch-instr",
            "sh",
            "-c",
            "exit 0",
        ])
        .unwrap();
        assert_eq!(cli.program.to_str(), Some("sh"));
        assert_eq!(cli.args, vec![OsString::from("-c"), OsString::from("exit 0")]);
        assert_eq!(
            cli.run_config().event,
            EventKind::Hardware(Hardware::BranchInstr)
        );
    }

    #[test]
    fn test_software_event() {
        let cli = Cli::try_parse_from(["instr-sampler", "--event", "task-clock", "/bin/true"])
            .unwrap();
        assert_eq!(
            cli.run_config().event,
            EventKind::Software(Software::TaskClock)
        );
    }

    #[test]
    fn test_only_keeps_reporting_order() {
        let cli = Cli::try_parse_from([
            "instr-sampler",
            "--only",
            "interval",
            "--only",
            "signal",
            "--only",
            "interval",
            "/bin/true",
        ])
        .unwrap();
        assert_eq!(
            cli.disciplines(),
            [Discipline::Signal, Discipline::Interval]
        );
    }
}
