//! Progress counters shared between the dispatcher, in-flight issue tasks
//! and the reporter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

/// A consistent view of a bulk run at one instant.
///
/// Every snapshot satisfies `success + error + skipped == total - remaining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub remaining: usize,
    /// Items never dispatched because the run was aborted.
    pub skipped: usize,
}

impl ProgressSnapshot {
    /// Number of dispatched commands that have completed.
    pub fn completed(&self) -> usize {
        self.success + self.error
    }

    /// Returns true once every item is accounted for.
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

/// Receives progress snapshots from the reporter task.
///
/// Called while work remains, then exactly once with `remaining == 0`.
/// Implementations run on the reporter task and should return quickly.
pub trait ProgressObserver: Send + Sync + 'static {
    fn on_progress(&self, snapshot: ProgressSnapshot);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressSnapshot) + Send + Sync + 'static,
{
    fn on_progress(&self, snapshot: ProgressSnapshot) {
        self(snapshot)
    }
}

/// Lock-free counters for one bulk run.
///
/// Writers bump an outcome counter before decrementing `remaining`, so a
/// reader that sees the four counters summing to `total` has a consistent
/// snapshot.
#[derive(Debug)]
pub struct BulkProgress {
    total: usize,
    success: AtomicUsize,
    error: AtomicUsize,
    skipped: AtomicUsize,
    remaining: AtomicUsize,
    closed: AtomicBool,
    finished: Notify,
}

impl BulkProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            success: AtomicUsize::new(0),
            error: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            remaining: AtomicUsize::new(total),
            closed: AtomicBool::new(false),
            finished: Notify::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::SeqCst);
        self.complete(1);
    }

    pub fn record_error(&self) {
        self.error.fetch_add(1, Ordering::SeqCst);
        self.complete(1);
    }

    /// Accounts for `n` items that will never be dispatched.
    pub fn record_skipped(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.skipped.fetch_add(n, Ordering::SeqCst);
        self.complete(n);
    }

    fn complete(&self, n: usize) {
        let before = self.remaining.fetch_sub(n, Ordering::SeqCst);
        debug_assert!(before >= n, "remaining counter underflow");
        if before == n {
            self.finished.notify_waiters();
        }
    }

    /// Marks that no further outcomes will be recorded and wakes waiters.
    ///
    /// Called when the dispatcher exits, including by panic, so waiters
    /// never outlive it even if `remaining` is left above zero.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.finished.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reads all counters as one consistent snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        loop {
            let remaining = self.remaining.load(Ordering::SeqCst);
            let success = self.success.load(Ordering::SeqCst);
            let error = self.error.load(Ordering::SeqCst);
            let skipped = self.skipped.load(Ordering::SeqCst);
            if success + error + skipped + remaining == self.total {
                return ProgressSnapshot {
                    total: self.total,
                    success,
                    error,
                    remaining,
                    skipped,
                };
            }
            // A completion is between its two updates.
            std::hint::spin_loop();
        }
    }

    /// Resolves once `remaining` has reached zero or the run is closed. Any
    /// number of tasks may wait at once.
    pub async fn finished(&self) {
        let notified = self.finished.notified();
        tokio::pin!(notified);
        // Register before checking so a completion in between is not missed.
        notified.as_mut().enable();
        if self.remaining.load(Ordering::SeqCst) == 0 || self.is_closed() {
            return;
        }
        notified.await;
    }
}
