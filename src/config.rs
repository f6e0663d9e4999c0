//! Environment driven settings for the benchmark programs.
//!
//! Values are read from the process environment after loading an optional
//! `.env` file. Nothing here is passed on the command line.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sampler::Sampler;

pub const DEFAULT_SEED_ROWS: usize = 1000;
pub const DEFAULT_MAX_TIME_MS: u64 = 5000;
pub const DEFAULT_SAMPLE_TIME_MS: u64 = 10;

/// Settings shared by every benchmark program.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory that holds fixture files (log files, SQLite databases).
    pub work_dir: PathBuf,
    /// Rows seeded before suites that read, update or delete.
    pub seed_rows: usize,
    /// Sampling budget applied to every trial.
    pub sampler: Sampler,
    /// Connection URL for the remote database, if one is configured.
    pub mysql_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_dir: env::temp_dir().join("databench"),
            seed_rows: DEFAULT_SEED_ROWS,
            sampler: Sampler::default(),
            mysql_url: None,
        }
    }
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let work_dir = lookup("BENCH_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);
        let seed_rows = parse_var(&lookup, "BENCH_SEED_ROWS", DEFAULT_SEED_ROWS)?;
        let max_time_ms = parse_var(&lookup, "BENCH_MAX_TIME_MS", DEFAULT_MAX_TIME_MS)?;
        let sample_time_ms = parse_var(&lookup, "BENCH_SAMPLE_TIME_MS", DEFAULT_SAMPLE_TIME_MS)?;
        let mysql_url = lookup("MYSQL_URL").filter(|v| !v.is_empty());
        if sample_time_ms == 0 {
            return Err(Error::Config("BENCH_SAMPLE_TIME_MS must be at least 1".into()));
        }

        let settings = Self {
            work_dir,
            seed_rows,
            sampler: Sampler::new(
                Duration::from_millis(sample_time_ms),
                Duration::from_millis(max_time_ms),
            ),
            mysql_url,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.seed_rows == 0 {
            return Err(Error::Config("BENCH_SEED_ROWS must be at least 1".into()));
        }
        if self.sampler.max_time() < self.sampler.sample_time() {
            return Err(Error::Config(
                "BENCH_MAX_TIME_MS must not be shorter than BENCH_SAMPLE_TIME_MS".into(),
            ));
        }
        Ok(())
    }

    /// The remote database URL, required by the MySQL program.
    pub fn mysql_url(&self) -> Result<&str> {
        self.mysql_url
            .as_deref()
            .ok_or_else(|| Error::Config("MYSQL_URL is not set".into()))
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_seed_rows(mut self, rows: usize) -> Self {
        self.seed_rows = rows;
        self
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.seed_rows, DEFAULT_SEED_ROWS);
        assert_eq!(settings.sampler.max_time(), Duration::from_millis(DEFAULT_MAX_TIME_MS));
        assert!(settings.mysql_url.is_none());
        assert!(settings.mysql_url().is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("BENCH_DIR", "/var/tmp/bench"),
            ("BENCH_SEED_ROWS", "250"),
            ("BENCH_MAX_TIME_MS", "800"),
            ("BENCH_SAMPLE_TIME_MS", "2"),
            ("MYSQL_URL", "mysql://bench@localhost/bench"),
        ]))
        .unwrap();
        assert_eq!(settings.work_dir, PathBuf::from("/var/tmp/bench"));
        assert_eq!(settings.seed_rows, 250);
        assert_eq!(settings.sampler.sample_time(), Duration::from_millis(2));
        assert_eq!(settings.mysql_url().unwrap(), "mysql://bench@localhost/bench");
    }

    #[test]
    fn test_invalid_number() {
        let err = Settings::from_lookup(lookup(&[("BENCH_SEED_ROWS", "many")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_budget_shorter_than_sample() {
        let err = Settings::from_lookup(lookup(&[
            ("BENCH_MAX_TIME_MS", "5"),
            ("BENCH_SAMPLE_TIME_MS", "10"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Settings::from_lookup(lookup(&[("BENCH_SAMPLE_TIME_MS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
