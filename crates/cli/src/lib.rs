//! Bulk issuance runner for the gift card system.
//!
//! Wires the in-memory event store, the gift card service, the bulk issuer
//! and the card summary projection together, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;

use std::future::Future;
use std::sync::Arc;

use domain::GiftCardService;
use event_store::EventStore;
use issuance::{BulkIssueReport, BulkIssuer, ProgressSnapshot};
use projections::{
    CardSummaryFilter, CardSummaryView, CountCardSummariesResponse, Projection,
    ProjectionProcessor,
};

use config::Config;
use error::Result;

/// Shared application state.
pub struct App<S: EventStore> {
    pub service: Arc<GiftCardService<S>>,
    pub processor: ProjectionProcessor<S>,
    pub summaries: CardSummaryView,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: BulkIssueReport,
    pub cards: CountCardSummariesResponse,
}

/// Creates the application with the card summary projection registered.
pub fn create_app<S: EventStore + Clone + 'static>(event_store: S) -> App<S> {
    let service = Arc::new(GiftCardService::new(event_store.clone()));
    let summaries = CardSummaryView::new();

    let mut processor = ProjectionProcessor::new(event_store);
    processor.register(Box::new(summaries.clone()) as Box<dyn Projection>);

    App {
        service,
        processor,
        summaries,
    }
}

/// Logs each progress snapshot.
pub fn log_progress(snapshot: ProgressSnapshot) {
    tracing::info!(
        success = snapshot.success,
        error = snapshot.error,
        remaining = snapshot.remaining,
        skipped = snapshot.skipped,
        "bulk issuance progress"
    );
}

impl<S: EventStore + Clone + 'static> App<S> {
    /// Issues `config.bulk_count` cards, aborting if `shutdown` resolves first,
    /// then brings the card summaries up to date.
    #[tracing::instrument(skip_all, fields(count = config.bulk_count, amount = config.bulk_amount))]
    pub async fn run_bulk(
        &self,
        config: &Config,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary> {
        let issuer = BulkIssuer::new(self.service.clone(), config.bulk_issue_config());
        let handle = issuer.start(config.bulk_count, config.bulk_amount, log_progress);

        tokio::pin!(shutdown);
        tokio::select! {
            () = handle.finished() => {}
            () = &mut shutdown => {
                tracing::warn!("shutdown requested, aborting bulk issuance");
                handle.abort();
            }
        }
        let report = handle.wait().await?;

        self.processor.run_catch_up().await?;
        let cards = self.summaries.count(&CardSummaryFilter::default()).await;
        metrics::gauge!("giftcard_cards_issued").set(cards.count as f64);

        Ok(RunSummary { report, cards })
    }
}
