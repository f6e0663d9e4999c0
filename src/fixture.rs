//! Fixture hooks: external state prepared before a run and released after it.

use log::{debug, warn};

use crate::error::Result;

/// External state shared by the suites of one run.
///
/// `context` hands out a cheap handle that suite factories capture; the
/// fixture itself stays owned by the runner.
#[allow(async_fn_in_trait)]
pub trait Fixture {
    type Context: Clone;

    /// Creates files, opens connections and applies schema.
    async fn prepare(&mut self) -> Result<()>;

    /// Returns shared state to its baseline between suites.
    async fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases every held resource. Must tolerate resources that are
    /// already closed.
    async fn teardown(&mut self) -> Result<()>;

    /// Handle injected into suite factories.
    fn context(&self) -> Result<Self::Context>;
}

/// No external state.
impl Fixture for () {
    type Context = ();

    async fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        Ok(())
    }

    fn context(&self) -> Result<()> {
        Ok(())
    }
}

/// Two fixtures managed together, e.g. two databases being compared.
impl<A: Fixture, B: Fixture> Fixture for (A, B) {
    type Context = (A::Context, B::Context);

    async fn prepare(&mut self) -> Result<()> {
        let first = self.0.prepare().await;
        let second = self.1.prepare().await;
        first.and(second)
    }

    async fn reset(&mut self) -> Result<()> {
        let first = self.0.reset().await;
        let second = self.1.reset().await;
        first.and(second)
    }

    async fn teardown(&mut self) -> Result<()> {
        let first = self.0.teardown().await;
        let second = self.1.teardown().await;
        first.and(second)
    }

    fn context(&self) -> Result<Self::Context> {
        Ok((self.0.context()?, self.1.context()?))
    }
}

/// Owns a fixture and guarantees its teardown runs at most once.
pub struct FixtureGuard<F> {
    fixture: F,
    closed: bool,
}

impl<F: Fixture> FixtureGuard<F> {
    pub fn new(fixture: F) -> Self {
        Self {
            fixture,
            closed: false,
        }
    }

    pub async fn prepare(&mut self) -> Result<()> {
        self.fixture.prepare().await
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.fixture.reset().await
    }

    pub fn context(&self) -> Result<F::Context> {
        self.fixture.context()
    }

    /// Tears the fixture down. Returns `Ok(false)` if it already was.
    pub async fn teardown(&mut self) -> Result<bool> {
        if self.closed {
            debug!("fixture already torn down");
            return Ok(false);
        }
        self.closed = true;
        self.fixture.teardown().await?;
        Ok(true)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn fixture(&self) -> &F {
        &self.fixture
    }
}

impl<F> Drop for FixtureGuard<F> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("fixture dropped without teardown");
        }
    }
}
