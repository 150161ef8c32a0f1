//! Cancellable delayed tasks for search-as-you-type.

use futures_util::future::{AbortHandle, Abortable};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Quiet period used by the stock search box.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Runs a task after a quiet period. Scheduling a new task cancels the
/// pending one, whose `run` resolves to `None`.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Wait out the quiet period, then run `task` unless a newer call
    /// superseded this one in the meantime.
    pub async fn run<F, T>(&self, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = self.swap(Some(handle)) {
            previous.abort();
        }

        let quiet = self.quiet;
        let delayed = async move {
            futures_timer::Delay::new(quiet).await;
            task.await
        };

        Abortable::new(delayed, registration).await.ok()
    }

    /// Cancel whatever is pending.
    pub fn cancel(&self) {
        if let Some(previous) = self.swap(None) {
            previous.abort();
        }
    }

    fn swap(&self, next: Option<AbortHandle>) -> Option<AbortHandle> {
        match self.pending.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_call_runs_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let started = std::time::Instant::now();
        let out = debouncer.run(async { 7 }).await;
        assert_eq!(out, Some(7));
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_newer_call_cancels_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let first = debouncer.run(async { "sam" });
        let second = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            debouncer.run(async { "samsung" }).await
        };
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, None);
        assert_eq!(b, Some("samsung"));
    }

    #[tokio::test]
    async fn test_cancel_drops_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let run = debouncer.run(async { 1 });
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            debouncer.cancel();
        };
        let (out, ()) = tokio::join!(run, cancel);
        assert_eq!(out, None);
    }
}
