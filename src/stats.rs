//! Rate statistics computed from timing samples.
//!
//! Each sample is the mean time of one operation (in seconds) over a batch.
//! The margin of error uses a two-tailed 95% Student-t critical value.

use std::time::Duration;

/// Relative margin of error (percent) at which sampling is considered stable.
pub const STABLE_RME: f64 = 1.0;

// Two-tailed 95% critical values, indexed by degrees of freedom - 1.
const T_TABLE: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.16,
    2.145, 2.131, 2.12, 2.11, 2.101, 2.093, 2.086, 2.08, 2.074, 2.069, 2.064, 2.06, 2.056, 2.052,
    2.048, 2.045, 2.042,
];
const T_INFINITY: f64 = 1.96;

/// Summary of a finished trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Operations per second (reciprocal of the mean).
    pub ops_per_sec: f64,
    /// Relative margin of error, in percent of the mean.
    pub rme: f64,
    /// Number of samples taken.
    pub samples: usize,
    /// Mean seconds per operation.
    pub mean: f64,
    /// Sample standard deviation of seconds per operation.
    pub std_dev: f64,
    /// Margin of error in seconds.
    pub moe: f64,
}

impl Stats {
    /// Compute statistics from per-operation sample times in seconds.
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                ops_per_sec: 0.0,
                rme: 0.0,
                samples: 0,
                mean: 0.0,
                std_dev: 0.0,
                moe: 0.0,
            };
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let std_dev = if n < 2 {
            0.0
        } else {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        };
        let sem = std_dev / (n as f64).sqrt();
        let moe = sem * critical_value(n.saturating_sub(1));
        let rme = if mean > 0.0 { moe / mean * 100.0 } else { 0.0 };
        let ops_per_sec = if mean > 0.0 { 1.0 / mean } else { 0.0 };

        Self {
            ops_per_sec,
            rme,
            samples: n,
            mean,
            std_dev,
            moe,
        }
    }

    /// Mean time per operation.
    pub fn mean_duration(&self) -> Duration {
        Duration::from_secs_f64(self.mean.max(0.0))
    }

    /// Whether the margin of error is within the stability threshold.
    pub fn is_stable(&self) -> bool {
        self.rme <= STABLE_RME
    }
}

fn critical_value(degrees_of_freedom: usize) -> f64 {
    match degrees_of_freedom {
        0 => T_INFINITY,
        df if df <= T_TABLE.len() => T_TABLE[df - 1],
        _ => T_INFINITY,
    }
}
