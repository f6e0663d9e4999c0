//! Trials: named units of work that the sampler times.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Default minimum number of samples per trial.
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Outcome of one execution of a trial's work.
pub type WorkResult = anyhow::Result<()>;

/// Future produced by awaited work. It may borrow nothing but need not be `Send`.
pub type LocalWork = Pin<Box<dyn Future<Output = WorkResult>>>;

/// Future produced by dispatched work; it is spawned onto the runtime.
pub type SendWork = Pin<Box<dyn Future<Output = WorkResult> + Send>>;

/// The three ways a trial can execute its work.
pub enum Work {
    /// Blocking call; timed until it returns.
    Sync(Box<dyn FnMut() -> WorkResult>),
    /// Future awaited to completion; timed until it resolves.
    Awaited(Box<dyn FnMut() -> LocalWork>),
    /// Future spawned without awaiting; only the dispatch is timed.
    Dispatched(Box<dyn FnMut() -> SendWork>),
}

impl Work {
    pub fn kind(&self) -> &'static str {
        match self {
            Work::Sync(_) => "sync",
            Work::Awaited(_) => "awaited",
            Work::Dispatched(_) => "dispatched",
        }
    }
}

/// A named, timeable unit of work.
pub struct Trial {
    name: String,
    work: Work,
    min_samples: usize,
}

impl Trial {
    /// A trial whose work blocks until done.
    pub fn sync<F>(name: impl Into<String>, work: F) -> Self
    where
        F: FnMut() -> WorkResult + 'static,
    {
        Self::with_work(name, Work::Sync(Box::new(work)))
    }

    /// A trial whose work returns a future that is awaited before the next call.
    pub fn awaited<F, Fut>(name: impl Into<String>, mut work: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = WorkResult> + 'static,
    {
        Self::with_work(name, Work::Awaited(Box::new(move || Box::pin(work()))))
    }

    /// A trial whose work is spawned and left running. The reported rate is
    /// the dispatch rate, not the completion rate.
    pub fn dispatched<F, Fut>(name: impl Into<String>, mut work: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        Self::with_work(name, Work::Dispatched(Box::new(move || Box::pin(work()))))
    }

    fn with_work(name: impl Into<String>, work: Work) -> Self {
        Self {
            name: name.into(),
            work,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }

    /// Set the minimum number of samples (at least 1).
    pub fn min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn minimum_samples(&self) -> usize {
        self.min_samples
    }

    pub(crate) fn into_parts(self) -> (String, Work, usize) {
        (self.name, self.work, self.min_samples)
    }
}

impl std::fmt::Debug for Trial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trial")
            .field("name", &self.name)
            .field("work", &self.work.kind())
            .field("min_samples", &self.min_samples)
            .finish()
    }
}

/// Runs `f`, turning a panic into an error message.
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Wraps a future so that a panic while polling resolves to an error.
pub(crate) struct CatchPanic<T>(pub(crate) Pin<Box<dyn Future<Output = anyhow::Result<T>>>>);

impl<T> Future for CatchPanic<T> {
    type Output = anyhow::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let fut = self.get_mut().0.as_mut();
        match catch_panic(|| fut.poll(cx)) {
            Ok(poll) => poll,
            Err(message) => Poll::Ready(Err(anyhow::anyhow!(message))),
        }
    }
}

/// Wraps a future so that a panic while polling resolves to its payload,
/// which the caller can rethrow once it has cleaned up.
pub(crate) struct CatchUnwind<F>(pub(crate) F);

impl<F: Future + Unpin> Future for CatchUnwind<F> {
    type Output = std::thread::Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let fut = &mut self.get_mut().0;
        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(fut).poll(cx))) {
            Ok(poll) => poll.map(Ok),
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_samples_floor() {
        let trial = Trial::sync("noop", || Ok(())).min_samples(0);
        assert_eq!(trial.minimum_samples(), 1);
        assert_eq!(trial.name(), "noop");
    }

    #[test]
    fn test_catch_panic_message() {
        let err = catch_panic::<()>(|| panic!("boom")).unwrap_err();
        assert_eq!(err, "panicked: boom");
        let err = catch_panic::<()>(|| panic!("{} rows", 3)).unwrap_err();
        assert_eq!(err, "panicked: 3 rows");
    }

    #[tokio::test]
    async fn test_catch_panic_future() {
        let fut: LocalWork = Box::pin(async {
            if true {
                panic!("inside future");
            }
            Ok::<(), anyhow::Error>(())
        });
        let err = CatchPanic(fut).await.unwrap_err();
        assert!(err.to_string().contains("inside future"));
    }

    #[tokio::test]
    async fn test_catch_unwind_keeps_payload() {
        let mut polled = false;
        let payload = CatchUnwind(Box::pin(async {
            polled = true;
            panic!("mid run");
        }))
        .await
        .unwrap_err();
        assert!(polled);
        assert_eq!(panic_message(&*payload), "panicked: mid run");

        let value = CatchUnwind(Box::pin(async { 7 })).await.unwrap();
        assert_eq!(value, 7);
    }
}
