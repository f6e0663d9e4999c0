//! Runner: drives suites to completion strictly one after another.
//!
//! Suites are queued as factories. A single driver loop takes the next
//! factory, builds the suite against the fixture context, runs it, hands the
//! outcome to the completion handler, optionally resets the fixture, and
//! only then moves on. Nothing a suite does can stop the loop early, and the
//! fixture is torn down even when the loop itself unwinds.

use std::collections::VecDeque;
use std::future::{self, Future};
use std::panic;
use std::pin::Pin;

use log::{error, info, warn};

use crate::fixture::{Fixture, FixtureGuard};
use crate::report;
use crate::sampler::Sampler;
use crate::suite::{Suite, SuiteReport};
use crate::trial::{catch_panic, panic_message, CatchPanic, CatchUnwind};

type SuiteFuture = Pin<Box<dyn Future<Output = anyhow::Result<Suite>>>>;
type SuiteFactory<C> = Box<dyn FnOnce(C) -> SuiteFuture>;
type CompletionHandler = Box<dyn FnMut(&SuiteOutcome)>;

/// What became of one queued suite.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteOutcome {
    /// The suite ran; individual trials may still have failed.
    Completed(SuiteReport),
    /// The suite could not be started.
    Failed { name: String, error: String },
}

impl SuiteOutcome {
    pub fn name(&self) -> &str {
        match self {
            SuiteOutcome::Completed(report) => &report.name,
            SuiteOutcome::Failed { name, .. } => name,
        }
    }

    pub fn report(&self) -> Option<&SuiteReport> {
        match self {
            SuiteOutcome::Completed(report) => Some(report),
            SuiteOutcome::Failed { .. } => None,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<SuiteOutcome>,
    /// Whether the fixture teardown completed without error.
    pub teardown_ok: bool,
}

impl RunSummary {
    pub fn failed_suites(&self) -> impl Iterator<Item = &SuiteOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SuiteOutcome::Failed { .. }))
    }

    /// `(suite, trial, error)` for every failed trial.
    pub fn trial_failures(&self) -> Vec<(&str, &str, &str)> {
        self.outcomes
            .iter()
            .filter_map(SuiteOutcome::report)
            .flat_map(|r| {
                r.failures()
                    .filter_map(move |t| t.error().map(|e| (r.name.as_str(), t.name.as_str(), e)))
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.teardown_ok && self.failed_suites().next().is_none() && self.trial_failures().is_empty()
    }
}

/// Ordered queue of suites sharing one fixture.
pub struct Runner<F: Fixture> {
    fixture: FixtureGuard<F>,
    queue: VecDeque<(String, SuiteFactory<F::Context>)>,
    sampler: Sampler,
    reset_between: bool,
    on_complete: CompletionHandler,
}

impl<F: Fixture> Runner<F> {
    pub fn new(fixture: F) -> Self {
        Self {
            fixture: FixtureGuard::new(fixture),
            queue: VecDeque::new(),
            sampler: Sampler::default(),
            reset_between: true,
            on_complete: Box::new(report::print_outcome),
        }
    }

    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Whether to reset the fixture after each suite but the last (default on).
    pub fn reset_between_suites(mut self, reset: bool) -> Self {
        self.reset_between = reset;
        self
    }

    /// Replaces the default handler, which prints each suite's results.
    pub fn on_complete<H>(mut self, handler: H) -> Self
    where
        H: FnMut(&SuiteOutcome) + 'static,
    {
        self.on_complete = Box::new(handler);
        self
    }

    /// Queues a suite. The factory runs only when the suite's turn comes.
    pub fn suite<B>(self, name: impl Into<String>, build: B) -> Self
    where
        B: FnOnce(&F::Context) -> anyhow::Result<Suite> + 'static,
    {
        self.suite_async(name, move |context: F::Context| future::ready(build(&context)))
    }

    /// Queues a suite whose factory has to await something first, such as
    /// seeding a remote table.
    pub fn suite_async<B, Fut>(mut self, name: impl Into<String>, build: B) -> Self
    where
        B: FnOnce(F::Context) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Suite>> + 'static,
    {
        let factory: SuiteFactory<F::Context> = Box::new(move |context| Box::pin(build(context)));
        self.queue.push_back((name.into(), factory));
        self
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Runs every queued suite in order, then tears the fixture down.
    ///
    /// A panic escaping the loop (from a fixture hook, say) is rethrown only
    /// after teardown has run.
    pub async fn run(mut self) -> RunSummary {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        let driven = CatchUnwind(Box::pin(self.drive(&mut outcomes))).await;

        let teardown_ok = match self.fixture.teardown().await {
            Ok(_) => true,
            Err(e) => {
                error!("fixture teardown failed: {e}");
                false
            }
        };
        if let Err(payload) = driven {
            error!(
                "run aborted after {} suite(s), {}",
                outcomes.len(),
                panic_message(&*payload)
            );
            panic::resume_unwind(payload);
        }

        let summary = RunSummary {
            outcomes,
            teardown_ok,
        };
        report::log_failures(&summary);
        summary
    }

    async fn drive(&mut self, outcomes: &mut Vec<SuiteOutcome>) {
        if let Err(e) = self.fixture.prepare().await {
            error!("fixture setup failed, continuing with existing state: {e}");
        }

        let total = self.queue.len();
        let mut index = 0;
        while let Some((name, build)) = self.queue.pop_front() {
            index += 1;
            info!("suite {index}/{total}: {name}");

            let outcome = match self.start(&name, build).await {
                Ok(suite) => SuiteOutcome::Completed(suite.run(&self.sampler).await),
                Err(error) => {
                    error!("suite `{name}` could not start: {error}");
                    SuiteOutcome::Failed { name, error }
                }
            };
            self.complete(&outcome);
            outcomes.push(outcome);

            if self.reset_between && !self.queue.is_empty() {
                if let Err(e) = self.fixture.reset().await {
                    warn!("fixture reset failed: {e}");
                }
            }
        }
    }

    fn complete(&mut self, outcome: &SuiteOutcome) {
        let handler = &mut self.on_complete;
        if let Err(message) = catch_panic(|| handler(outcome)) {
            error!("completion handler for `{}` {message}", outcome.name());
        }
    }

    async fn start(&self, name: &str, build: SuiteFactory<F::Context>) -> Result<Suite, String> {
        let context = self.fixture.context().map_err(|e| e.to_string())?;
        let pending = catch_panic(move || build(context))?;
        let suite = CatchPanic(pending).await.map_err(|e| format!("{e:#}"))?;
        if suite.name() != name {
            info!("suite `{name}` runs as `{}`", suite.name());
        }
        Ok(suite)
    }
}
