//! Bulk issuance coordinator.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use common::AggregateId;
use domain::{CommandGateway, GiftCard, GiftCardCommand};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::progress::{BulkProgress, ProgressObserver, ProgressSnapshot};

/// Tuning for a bulk run.
#[derive(Debug, Clone)]
pub struct BulkIssueConfig {
    /// How often the observer is called while work remains.
    pub report_interval: Duration,
    /// Upper bound on issue commands awaiting the gateway at once.
    pub max_in_flight: usize,
}

impl Default for BulkIssueConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(1),
            max_in_flight: 256,
        }
    }
}

/// Final outcome of a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkIssueReport {
    pub amount: i64,
    pub progress: ProgressSnapshot,
    pub aborted: bool,
    pub elapsed: Duration,
}

impl BulkIssueReport {
    pub fn success(&self) -> usize {
        self.progress.success
    }

    pub fn error(&self) -> usize {
        self.progress.error
    }
}

/// Generates `count` distinct card identities.
pub fn unique_card_ids(count: usize) -> Vec<AggregateId> {
    let mut seen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let id = AggregateId::generate();
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    ids
}

/// Issues many gift cards concurrently through a [`CommandGateway`].
///
/// Each card is an independent issue command; failures are counted and never
/// stop the rest of the batch.
pub struct BulkIssuer<G> {
    gateway: Arc<G>,
    config: BulkIssueConfig,
}

impl<G> BulkIssuer<G>
where
    G: CommandGateway<GiftCard> + 'static,
{
    pub fn new(gateway: Arc<G>, config: BulkIssueConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &BulkIssueConfig {
        &self.config
    }

    /// Issues `count` cards of `amount` each and waits for the run to finish.
    pub async fn run<O: ProgressObserver>(
        &self,
        count: usize,
        amount: i64,
        observer: O,
    ) -> Result<BulkIssueReport> {
        self.start(count, amount, observer).wait().await
    }

    /// Starts a bulk run in the background and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    #[tracing::instrument(skip(self, observer))]
    pub fn start<O: ProgressObserver>(
        &self,
        count: usize,
        amount: i64,
        observer: O,
    ) -> BulkIssueHandle {
        let ids = unique_card_ids(count);
        let progress = Arc::new(BulkProgress::new(count));
        let aborted = Arc::new(AtomicBool::new(false));

        tracing::info!(
            count,
            amount,
            max_in_flight = self.config.max_in_flight,
            "Starting bulk issuance"
        );

        let dispatcher = tokio::spawn(dispatch(
            self.gateway.clone(),
            ids,
            amount,
            progress.clone(),
            aborted.clone(),
            self.config.max_in_flight,
        ));
        let reporter = tokio::spawn(report(
            progress.clone(),
            observer,
            self.config.report_interval,
        ));

        BulkIssueHandle {
            amount,
            progress,
            aborted,
            dispatcher,
            reporter,
            started: Instant::now(),
        }
    }
}

/// Handle to a running bulk issuance.
///
/// Dropping the handle detaches the run; it still completes in the background.
pub struct BulkIssueHandle {
    amount: i64,
    progress: Arc<BulkProgress>,
    aborted: Arc<AtomicBool>,
    dispatcher: JoinHandle<()>,
    reporter: JoinHandle<ProgressSnapshot>,
    started: Instant,
}

impl BulkIssueHandle {
    /// Current counters.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Stops dispatching new commands. Commands already sent run to
    /// completion; the rest are counted as skipped.
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            tracing::info!("Bulk issuance abort requested");
        }
    }

    /// Resolves once every item is accounted for, without consuming the handle.
    pub async fn finished(&self) {
        self.progress.finished().await
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Waits for every item to be accounted for and the final report.
    ///
    /// If the dispatcher failed, the reporter is still joined before the
    /// dispatcher's error is returned.
    pub async fn wait(self) -> Result<BulkIssueReport> {
        let dispatched = self.dispatcher.await;
        let progress = self.reporter.await?;
        dispatched?;
        let elapsed = self.started.elapsed();

        metrics::histogram!("bulk_issue_duration_seconds").record(elapsed.as_secs_f64());
        tracing::info!(
            success = progress.success,
            error = progress.error,
            skipped = progress.skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Bulk issuance finished"
        );

        Ok(BulkIssueReport {
            amount: self.amount,
            progress,
            aborted: self.aborted.load(Ordering::SeqCst),
            elapsed,
        })
    }
}

async fn dispatch<G>(
    gateway: Arc<G>,
    ids: Vec<AggregateId>,
    amount: i64,
    progress: Arc<BulkProgress>,
    aborted: Arc<AtomicBool>,
    max_in_flight: usize,
) where
    G: CommandGateway<GiftCard> + 'static,
{
    let _close = CloseOnExit(progress.clone());
    let permits = Arc::new(Semaphore::new(max_in_flight.clamp(1, Semaphore::MAX_PERMITS)));
    let mut in_flight = JoinSet::new();
    let total = ids.len();

    for (dispatched, card_id) in ids.into_iter().enumerate() {
        // The semaphore is never closed.
        let Ok(permit) = permits.clone().acquire_owned().await else {
            progress.record_skipped(total - dispatched);
            break;
        };
        if aborted.load(Ordering::SeqCst) {
            tracing::info!(dispatched, skipped = total - dispatched, "Bulk issuance aborted");
            progress.record_skipped(total - dispatched);
            break;
        }

        let gateway = gateway.clone();
        let recorder = progress.clone();
        in_flight.spawn(async move {
            let outcome = gateway.send(GiftCardCommand::issue(card_id.clone(), amount)).await;
            drop(permit);
            match outcome {
                Ok(_) => recorder.record_success(),
                Err(e) => {
                    tracing::debug!(
                        card_id = %card_id,
                        error = %e,
                        kind = %e.kind(),
                        "Issue failed"
                    );
                    recorder.record_error();
                }
            }
        });
        metrics::counter!("bulk_issue_dispatched_total").increment(1);

        while let Some(joined) = in_flight.try_join_next() {
            reap(joined, &progress);
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        reap(joined, &progress);
    }
}

/// Closes the run's progress when the dispatcher returns or unwinds.
struct CloseOnExit(Arc<BulkProgress>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// A task that panicked never recorded its outcome.
fn reap(joined: std::result::Result<(), JoinError>, progress: &BulkProgress) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Issue task failed");
        progress.record_error();
    }
}

async fn report<O: ProgressObserver>(
    progress: Arc<BulkProgress>,
    observer: O,
    interval: Duration,
) -> ProgressSnapshot {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = progress.finished() => {}
        }
        // Read before the snapshot: a normal close only follows the last completion.
        let closed = progress.is_closed();
        let snapshot = progress.snapshot();
        observer.on_progress(snapshot);
        if snapshot.is_finished() || closed {
            return snapshot;
        }
    }
}
