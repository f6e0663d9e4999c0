//! Sequential micro-benchmark suites for data-access code.
//!
//! A [`Runner`] owns a [`Fixture`] and a queue of suite factories. It runs
//! one [`Suite`] at a time, each suite runs its [`Trial`]s one at a time,
//! and every trial is sampled until its rate is stable or its time budget
//! runs out. The bundled programs in [`scenarios`] compare file appends,
//! SQLite journal modes, and direct database access against the `sea-query`
//! builder.

pub mod config;
pub mod dataset;
pub mod error;
pub mod file;
pub mod fixture;
pub mod mysql;
pub mod query;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod scenarios;
pub mod sqlite;
pub mod stats;
pub mod suite;
pub mod trial;

pub use config::Settings;
pub use error::{Error, Result};
pub use fixture::{Fixture, FixtureGuard};
pub use runner::{RunSummary, Runner, SuiteOutcome};
pub use sampler::Sampler;
pub use stats::Stats;
pub use suite::{Suite, SuiteReport, TrialReport, TrialResult};
pub use trial::Trial;

/// Logs to stderr at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
