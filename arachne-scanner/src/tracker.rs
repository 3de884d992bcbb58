use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// Counts expansion tasks that have been scheduled but not yet finished.
///
/// Every `add(n)` must be matched by exactly `n` calls to `done()`. `wait()`
/// resolves once the count is back at zero.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    pub fn done(&self) {
        let previous =
            self.outstanding
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                    count.checked_sub(1)
                });

        match previous {
            Ok(1) => self.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!("done() called with no outstanding tasks"),
        }
    }

    /// Register one task and get a token that marks it done when dropped.
    pub fn track(self: &Arc<Self>) -> TaskToken {
        self.add(1);
        TaskToken {
            tracker: Arc::clone(self),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a done() between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// One outstanding task. Dropping it (including during a panic unwind) calls
/// `done()` on the tracker exactly once.
#[derive(Debug)]
pub struct TaskToken {
    tracker: Arc<CompletionTracker>,
}

impl Drop for TaskToken {
    fn drop(&mut self) {
        self.tracker.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_idle() {
        let tracker = CompletionTracker::new();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("idle tracker should not block");
    }

    #[tokio::test]
    async fn test_add_and_done_balance() {
        let tracker = CompletionTracker::new();
        tracker.add(3);
        assert_eq!(tracker.outstanding(), 3);

        tracker.done();
        tracker.done();
        assert_eq!(tracker.outstanding(), 1);

        tracker.done();
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_extra_done_does_not_wrap() {
        let tracker = CompletionTracker::new();
        tracker.done();
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_token_releases_on_drop() {
        let tracker = Arc::new(CompletionTracker::new());
        let first = tracker.track();
        let second = tracker.track();
        assert_eq!(tracker.outstanding(), 2);

        drop(first);
        assert_eq!(tracker.outstanding(), 1);
        drop(second);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_blocks_until_all_tasks_finish() {
        let tracker = Arc::new(CompletionTracker::new());
        let finished = Arc::new(AtomicUsize::new(0));

        for i in 0..20u64 {
            let token = tracker.track();
            let finished = finished.clone();
            tokio::spawn(async move {
                let _token = token;
                tokio::time::sleep(Duration::from_millis(i % 5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("tracker should reach zero");
        assert_eq!(finished.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_task_still_counts_as_done() {
        let tracker = Arc::new(CompletionTracker::new());
        let token = tracker.track();

        let handle = tokio::spawn(async move {
            let _token = token;
            panic!("fetcher blew up");
        });
        assert!(handle.await.is_err());

        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("panicked task must not leave the tracker hanging");
    }
}
