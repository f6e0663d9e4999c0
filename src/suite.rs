//! Suites: ordered groups of trials measured and reported together.

use log::{debug, error};

use crate::error::{Error, Result};
use crate::sampler::Sampler;
use crate::stats::Stats;
use crate::trial::Trial;

/// An ordered collection of uniquely named trials.
#[derive(Debug)]
pub struct Suite {
    name: String,
    trials: Vec<Trial>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trials: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Appends a trial. Trial names must be unique within the suite.
    pub fn push(&mut self, trial: Trial) -> Result<()> {
        if self.trials.iter().any(|t| t.name() == trial.name()) {
            return Err(Error::DuplicateTrial {
                suite: self.name.clone(),
                trial: trial.name().to_string(),
            });
        }
        self.trials.push(trial);
        Ok(())
    }

    /// Builder form of [`Suite::push`].
    pub fn add(mut self, trial: Trial) -> Result<Self> {
        self.push(trial)?;
        Ok(self)
    }

    /// Runs every trial in registration order, one at a time.
    ///
    /// A failing trial is recorded and the remaining trials still run.
    /// Consuming the suite means its report is produced exactly once.
    pub async fn run(self, sampler: &Sampler) -> SuiteReport {
        let mut report = SuiteReport {
            name: self.name,
            trials: Vec::with_capacity(self.trials.len()),
        };

        for trial in self.trials {
            let (name, mut work, min_samples) = trial.into_parts();
            debug!("{}: running `{}` ({} work)", report.name, name, work.kind());

            let result = match sampler.measure(&mut work, min_samples).await {
                Ok(stats) => TrialResult::Measured(stats),
                Err(error) => {
                    error!("{}: `{}` failed: {}", report.name, name, error);
                    TrialResult::Failed { error }
                }
            };
            // Drop captured fixture handles before the next trial starts.
            drop(work);

            report.trials.push(TrialReport {
                name,
                min_samples,
                result,
            });
        }
        report
    }
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialResult {
    Measured(Stats),
    Failed { error: String },
}

/// Result of one trial inside a [`SuiteReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    pub name: String,
    pub min_samples: usize,
    pub result: TrialResult,
}

impl TrialReport {
    pub fn stats(&self) -> Option<&Stats> {
        match &self.result {
            TrialResult::Measured(stats) => Some(stats),
            TrialResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.result {
            TrialResult::Measured(_) => None,
            TrialResult::Failed { error } => Some(error),
        }
    }

    /// Successful samples taken; zero for a failed trial.
    pub fn samples(&self) -> usize {
        self.stats().map_or(0, |s| s.samples)
    }
}

/// Completed suite, carrying every trial's result.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub name: String,
    pub trials: Vec<TrialReport>,
}

impl SuiteReport {
    pub fn get(&self, trial: &str) -> Option<&TrialReport> {
        self.trials.iter().find(|t| t.name == trial)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrialReport> {
        self.trials.iter().filter(|t| t.error().is_some())
    }

    /// Names of the trial(s) with the highest measured rate.
    pub fn fastest(&self) -> Vec<&str> {
        let best = self
            .trials
            .iter()
            .filter_map(|t| t.stats())
            .map(|s| s.ops_per_sec)
            .fold(f64::NEG_INFINITY, f64::max);
        self.trials
            .iter()
            .filter(|t| t.stats().is_some_and(|s| s.ops_per_sec == best))
            .map(|t| t.name.as_str())
            .collect()
    }
}
