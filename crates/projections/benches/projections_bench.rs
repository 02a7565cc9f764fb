use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{DomainEvent, GiftCardEvent};
use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version, store::EventStore};
use projections::{CardSummaryFilter, CardSummaryView, Projection, ProjectionProcessor};

fn make_envelope(id: &AggregateId, version: i64, event: &GiftCardEvent) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(id.clone())
        .aggregate_type("GiftCard")
        .event_type(event.event_type())
        .version(Version::new(version))
        .payload(event)
        .unwrap()
        .build()
        .unwrap()
}

/// Populates a store with `n` cards, each issued and redeemed once.
async fn populate_store(store: &InMemoryEventStore, n: usize) {
    for _ in 0..n {
        let id = AggregateId::generate();
        let events = vec![
            make_envelope(&id, 1, &GiftCardEvent::issued(id.clone(), 100)),
            make_envelope(&id, 2, &GiftCardEvent::redeemed(id.clone(), 25)),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 1000));

    c.bench_function("projections/catch_up_2000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let view = CardSummaryView::new();
                let mut processor = ProjectionProcessor::new(store.clone());
                processor.register(Box::new(view.clone()) as Box<dyn Projection>);
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_prefix_queries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let view = CardSummaryView::new();
    rt.block_on(async {
        populate_store(&store, 1000).await;
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(view.clone()));
        processor.run_catch_up().await.unwrap();
    });
    let filter = CardSummaryFilter::id_starts_with("A");

    c.bench_function("projections/count_by_prefix", |b| {
        b.iter(|| rt.block_on(view.count(&filter)));
    });

    c.bench_function("projections/fetch_page_by_prefix", |b| {
        b.iter(|| rt.block_on(view.fetch(0, 20, &filter)));
    });
}

criterion_group!(benches, bench_catch_up, bench_prefix_queries);
criterion_main!(benches);
