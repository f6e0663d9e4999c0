//! Sampler: repeated timed execution of a trial's work.
//!
//! A warm-up call estimates the cost of one operation. Operations are then
//! batched so that one sample lasts roughly `sample_time`, and samples are
//! collected until the minimum count is reached and the margin of error is
//! stable, or the time budget is spent.

use std::time::{Duration, Instant};

use log::debug;
use tokio::task::JoinHandle;

use crate::stats::Stats;
use crate::trial::{catch_panic, panic_message, CatchPanic, Work, WorkResult};

/// Upper bound on operations grouped into one sample.
pub const MAX_BATCH: u64 = 1_000_000;

/// Timing budget used to sample every trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    sample_time: Duration,
    max_time: Duration,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            sample_time: Duration::from_millis(10),
            max_time: Duration::from_secs(5),
        }
    }
}

impl Sampler {
    pub fn new(sample_time: Duration, max_time: Duration) -> Self {
        Self {
            sample_time: sample_time.max(Duration::from_micros(1)),
            max_time,
        }
    }

    /// A short budget, suitable for smoke runs and tests.
    pub fn quick() -> Self {
        Self::new(Duration::from_millis(1), Duration::from_millis(100))
    }

    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    pub fn max_time(&self) -> Duration {
        self.max_time
    }

    /// Sample `work` until at least `min_samples` samples were taken.
    ///
    /// Returns an error message if the work failed or panicked; any output
    /// gathered up to that point is discarded.
    pub async fn measure(&self, work: &mut Work, min_samples: usize) -> Result<Stats, String> {
        let mut in_flight = Vec::new();
        let sampled = self.sample(work, min_samples.max(1), &mut in_flight).await;
        let drained = drain(&mut in_flight).await;
        let stats = sampled?;
        drained?;
        Ok(stats)
    }

    async fn sample(
        &self,
        work: &mut Work,
        min_samples: usize,
        in_flight: &mut Vec<JoinHandle<WorkResult>>,
    ) -> Result<Stats, String> {
        let estimate = run_batch(work, 1, in_flight).await?;
        drain(in_flight).await?;
        let batch = self.batch_size(estimate);
        debug!(
            "{} work: warm-up took {:?}, {} operation(s) per sample",
            work.kind(),
            estimate,
            batch
        );

        let started = Instant::now();
        let mut samples = Vec::with_capacity(min_samples);
        loop {
            let elapsed = run_batch(work, batch, in_flight).await?;
            samples.push(elapsed.as_secs_f64() / batch as f64);
            // Dispatched tasks are completed outside the timed section.
            drain(in_flight).await?;

            if samples.len() >= min_samples {
                let stats = Stats::from_samples(&samples);
                if stats.is_stable() || started.elapsed() >= self.max_time {
                    return Ok(stats);
                }
            }
        }
    }

    fn batch_size(&self, estimate: Duration) -> u64 {
        let estimate = estimate.as_nanos().max(1);
        let batch = self.sample_time.as_nanos() / estimate;
        u64::try_from(batch).unwrap_or(MAX_BATCH).clamp(1, MAX_BATCH)
    }
}

async fn run_batch(
    work: &mut Work,
    batch: u64,
    in_flight: &mut Vec<JoinHandle<WorkResult>>,
) -> Result<Duration, String> {
    match work {
        Work::Sync(f) => {
            let start = Instant::now();
            let outcome = catch_panic(|| {
                for _ in 0..batch {
                    f()?;
                }
                Ok::<(), anyhow::Error>(())
            });
            let elapsed = start.elapsed();
            outcome?.map_err(|e| format!("{e:#}"))?;
            Ok(elapsed)
        }
        Work::Awaited(f) => {
            let start = Instant::now();
            for _ in 0..batch {
                let fut = catch_panic(|| f())?;
                CatchPanic(fut).await.map_err(|e| format!("{e:#}"))?;
            }
            Ok(start.elapsed())
        }
        Work::Dispatched(f) => {
            let start = Instant::now();
            for _ in 0..batch {
                let fut = catch_panic(|| f())?;
                in_flight.push(tokio::spawn(fut));
            }
            Ok(start.elapsed())
        }
    }
}

/// Wait for every dispatched task, reporting the first failure.
async fn drain(in_flight: &mut Vec<JoinHandle<WorkResult>>) -> Result<(), String> {
    let mut first_error = None;
    for handle in in_flight.drain(..) {
        let outcome = match handle.await {
            Ok(result) => result.map_err(|e| format!("{e:#}")),
            Err(e) if e.is_panic() => Err(panic_message(&*e.into_panic())),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
