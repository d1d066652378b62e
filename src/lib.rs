//! Count the instructions a child process retires, using a hardware counter
//! opened with `perf_event_open`, under three sampling disciplines.
//!
//! - [`Discipline::Signal`][sampler::Discipline::Signal]: the counter is armed
//!   for one overflow at a time, each overflow notification drains it.
//! - [`Discipline::Ring`][sampler::Discipline::Ring]: the counter samples into
//!   a mapped ring buffer, readiness of the buffer drains it.
//! - [`Discipline::Interval`][sampler::Discipline::Interval]: the counter is
//!   drained at a fixed rate.
//!
//! Every run launches the workload fresh, stopped at its first instruction,
//! attaches the counter, lets it run to completion and adds up the drained
//! deltas with a final read after the counter is disabled.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use instr_sampler::config::RunConfig;
//! use instr_sampler::sampler::{run, Discipline};
//!
//! let config = RunConfig::default();
//! for discipline in Discipline::ALL {
//!     let report = run(discipline, &config, Path::new("/bin/true"), &[]).unwrap();
//!     println!("{}: {} instructions", discipline, report.total);
//! }
//! ```
//!
//! ## Kernel compatibility
//!
//! Linux 4.0 or newer, on a host whose PMU exposes the requested event to
//! unprivileged users (`perf_event_paranoid` of 2 or lower).

pub mod config;
pub mod count;
pub mod error;
pub mod event;
mod ffi;
pub mod process;
pub mod sample;
pub mod sampler;

pub use error::{Error, Result};
