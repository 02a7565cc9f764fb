//! Bulk issuance against the in-memory store and instrumented gateways.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    CommandGateway, CommandResult, DomainError, GiftCard, GiftCardCommand, GiftCardService,
};
use event_store::{EventStoreError, InMemoryEventStore};
use issuance::{BulkIssueConfig, BulkIssuer, ProgressSnapshot};

fn config(report_ms: u64, max_in_flight: usize) -> BulkIssueConfig {
    BulkIssueConfig {
        report_interval: Duration::from_millis(report_ms),
        max_in_flight,
    }
}

/// Collects every snapshot handed to the observer.
fn recorder() -> (
    Arc<Mutex<Vec<ProgressSnapshot>>>,
    impl Fn(ProgressSnapshot) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |s: ProgressSnapshot| sink.lock().unwrap().push(s))
}

/// Fails every `every`-th command with a store outage, otherwise delegates.
struct FlakyGateway {
    inner: GiftCardService<InMemoryEventStore>,
    every: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl CommandGateway<GiftCard> for FlakyGateway {
    async fn send(&self, command: GiftCardCommand) -> Result<CommandResult<GiftCard>, DomainError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n % self.every == 0 {
            return Err(EventStoreError::Unavailable("injected outage".into()).into());
        }
        self.inner.send(command).await
    }
}

/// Delays every command before delegating.
struct SlowGateway {
    inner: GiftCardService<InMemoryEventStore>,
    delay: Duration,
}

#[async_trait]
impl CommandGateway<GiftCard> for SlowGateway {
    async fn send(&self, command: GiftCardCommand) -> Result<CommandResult<GiftCard>, DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.send(command).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn issues_every_card() {
    let store = InMemoryEventStore::new();
    let service = Arc::new(GiftCardService::new(store.clone()));
    let issuer = BulkIssuer::new(service, config(50, 64));
    let (seen, observer) = recorder();

    let report = issuer.run(1000, 25, observer).await.unwrap();

    assert_eq!(report.success(), 1000);
    assert_eq!(report.error(), 0);
    assert_eq!(report.progress.remaining, 0);
    assert!(!report.aborted);
    assert_eq!(store.aggregate_count().await, 1000);
    assert_eq!(store.event_count().await, 1000);

    let last = *seen.lock().unwrap().last().unwrap();
    assert_eq!(last, report.progress);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_are_monotonic_and_finish_once() {
    let service = GiftCardService::new(InMemoryEventStore::new());
    let gateway = Arc::new(SlowGateway {
        inner: service,
        delay: Duration::from_millis(2),
    });
    let issuer = BulkIssuer::new(gateway, config(5, 8));
    let (seen, observer) = recorder();

    issuer.run(200, 10, observer).await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 2, "expected periodic callbacks, got {}", seen.len());
    assert_eq!(seen.first().unwrap().total, 200);

    for pair in seen.windows(2) {
        assert!(pair[1].remaining <= pair[0].remaining);
        assert!(pair[1].success >= pair[0].success);
        assert!(pair[1].error >= pair[0].error);
    }
    for s in seen.iter() {
        assert_eq!(s.success + s.error + s.skipped, s.total - s.remaining);
    }

    let finished = seen.iter().filter(|s| s.remaining == 0).count();
    assert_eq!(finished, 1);
    assert!(seen.last().unwrap().is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_are_counted_without_stopping_the_batch() {
    let store = InMemoryEventStore::new();
    let gateway = Arc::new(FlakyGateway {
        inner: GiftCardService::new(store.clone()),
        every: 3,
        calls: AtomicUsize::new(0),
    });
    let issuer = BulkIssuer::new(gateway, config(20, 16));

    let report = issuer.run(300, 5, |_: ProgressSnapshot| {}).await.unwrap();

    assert_eq!(report.error(), 100);
    assert_eq!(report.success(), 200);
    assert_eq!(report.progress.remaining, 0);
    assert_eq!(store.aggregate_count().await, 200);
}

#[tokio::test]
async fn rejected_amounts_count_as_errors() {
    let store = InMemoryEventStore::new();
    let issuer = BulkIssuer::new(
        Arc::new(GiftCardService::new(store.clone())),
        config(10, 4),
    );

    let report = issuer.run(20, 0, |_: ProgressSnapshot| {}).await.unwrap();

    assert_eq!(report.success(), 0);
    assert_eq!(report.error(), 20);
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn empty_run_reports_once() {
    let issuer = BulkIssuer::new(
        Arc::new(GiftCardService::new(InMemoryEventStore::new())),
        config(10, 4),
    );
    let (seen, observer) = recorder();

    let report = issuer.run(0, 10, observer).await.unwrap();

    assert_eq!(report.progress, ProgressSnapshot::default());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_skips_undispatched_cards() {
    let store = InMemoryEventStore::new();
    let gateway = Arc::new(SlowGateway {
        inner: GiftCardService::new(store.clone()),
        delay: Duration::from_millis(20),
    });
    let issuer = BulkIssuer::new(gateway, config(10, 2));

    let handle = issuer.start(500, 10, |_: ProgressSnapshot| {});
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();
    assert!(handle.is_aborted());

    let report = handle.wait().await.unwrap();

    assert!(report.aborted);
    assert_eq!(report.progress.remaining, 0);
    assert!(report.progress.skipped > 0);
    assert_eq!(
        report.success() + report.error() + report.progress.skipped,
        500
    );
    assert_eq!(store.aggregate_count().await, report.success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handle_exposes_live_progress() {
    let gateway = Arc::new(SlowGateway {
        inner: GiftCardService::new(InMemoryEventStore::new()),
        delay: Duration::from_millis(5),
    });
    let issuer = BulkIssuer::new(gateway, config(10, 4));

    let handle = issuer.start(100, 10, |_: ProgressSnapshot| {});
    let early = handle.progress();
    assert_eq!(early.total, 100);
    assert!(early.remaining > 0);

    let report = handle.wait().await.unwrap();
    assert_eq!(report.success(), 100);
}

/// Panics on every command.
struct PanickingGateway;

#[async_trait]
impl CommandGateway<GiftCard> for PanickingGateway {
    async fn send(
        &self,
        _command: GiftCardCommand,
    ) -> Result<CommandResult<GiftCard>, DomainError> {
        panic!("gateway exploded");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_max_in_flight_is_clamped() {
    let store = InMemoryEventStore::new();
    let issuer = BulkIssuer::new(
        Arc::new(GiftCardService::new(store.clone())),
        config(10, usize::MAX),
    );
    let (seen, observer) = recorder();

    let handle = issuer.start(10, 5, observer);
    tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("run finishes");
    let report = handle.wait().await.unwrap();

    assert_eq!(report.success(), 10);
    assert_eq!(report.progress.remaining, 0);
    assert_eq!(store.aggregate_count().await, 10);
    assert!(seen.lock().unwrap().last().unwrap().is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bulk_run_keeps_the_slot_cache_bounded() {
    let store = InMemoryEventStore::new();
    let service = Arc::new(GiftCardService::with_cache_capacity(store.clone(), 100));
    let issuer = BulkIssuer::new(service.clone(), config(50, 32));

    let report = issuer.run(5000, 10, |_: ProgressSnapshot| {}).await.unwrap();

    assert_eq!(report.success(), 5000);
    assert_eq!(store.aggregate_count().await, 5000);
    assert!(service.handler().cached_count().await <= 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_commands_count_as_errors() {
    let issuer = BulkIssuer::new(Arc::new(PanickingGateway), config(10, 4));
    let (seen, observer) = recorder();

    let report = tokio::time::timeout(Duration::from_secs(5), issuer.run(20, 5, observer))
        .await
        .expect("run finishes")
        .unwrap();

    assert_eq!(report.error(), 20);
    assert_eq!(report.progress.remaining, 0);
    let finished = seen.lock().unwrap().iter().filter(|s| s.is_finished()).count();
    assert_eq!(finished, 1);
}
