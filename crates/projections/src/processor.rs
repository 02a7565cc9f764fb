//! Projection processor for feeding events to projections.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;

use crate::Result;
use crate::projection::Projection;

/// Feeds events from an event store to registered projections.
///
/// Catch-up skips events a projection has already counted in its position,
/// so it can be run repeatedly as the store grows.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Runs catch-up processing: streams all events from the store and delivers
    /// them to each projection that hasn't already seen them.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let mut stream = self.store.stream_all_events().await?;
        let mut event_index: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for projection in &self.projections {
                let pos = projection.position().await;
                if pos.events_processed < event_index {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        tracing::info!(events_processed = event_index, "catch-up complete");

        Ok(())
    }

    /// Delivers a single event to all registered projections.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(event).await?;
            metrics::counter!("projections_events_processed").increment(1);
        }
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, InMemoryEventStore, Version};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Counts every event it is handed.
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn test_event(aggregate_id: &AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id.clone())
            .aggregate_type("GiftCard")
            .event_type("TestEvent")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    async fn store_with_events(n: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("CARD-1");
        let events = (1..=n).map(|v| test_event(&id, v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn catch_up_processes_all_events() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store_with_events(3).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn process_single_event() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        let event = test_event(&AggregateId::new("CARD-1"), 1);
        processor.process_event(&event).await.unwrap();

        assert_eq!(*count_ref.read().await, 1);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let pos_ref = Arc::clone(&projection.position);

        let mut processor = ProjectionProcessor::new(store_with_events(2).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);

        processor.rebuild_all().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
        assert_eq!(pos_ref.read().await.events_processed, 2);
    }

    #[tokio::test]
    async fn catch_up_skips_already_processed() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store_with_events(3).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.run_catch_up().await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn empty_store_catch_up() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 0);
    }

    #[tokio::test]
    async fn multiple_projections() {
        let proj1 = CountingProjection::new();
        let proj2 = CountingProjection::new();
        let count1 = Arc::clone(&proj1.count);
        let count2 = Arc::clone(&proj2.count);

        let mut processor = ProjectionProcessor::new(store_with_events(2).await);
        processor.register(Box::new(proj1));
        processor.register(Box::new(proj2));
        assert_eq!(processor.projection_count(), 2);

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count1.read().await, 2);
        assert_eq!(*count2.read().await, 2);
    }
}
