//! Top-level control loop.
//!
//! One job at a time: poll, process, report, acknowledge. See [`Runner`].

mod config;
#[allow(clippy::module_inception)]
mod runner;


pub use config::{DEFAULT_ERROR_BACKOFF, DEFAULT_IDLE_BACKOFF, RunnerConfig};
pub use runner::{JobReport, RunStats, Runner, RunnerError, Tick};
