use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Default)]
struct Inner {
    /// Every event in global append order.
    log: Vec<EventEnvelope>,
    /// Per-aggregate streams, each in version order.
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,
}

impl Inner {
    fn current_version(&self, aggregate_id: &AggregateId) -> Version {
        self.streams
            .get(aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version)
            .unwrap_or_else(Version::initial)
    }
}

/// In-memory event store.
///
/// Clones share the same underlying storage. A single write lock covers the
/// version check and the append, so an append is atomic per batch.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Returns the number of aggregates with at least one event.
    pub async fn aggregate_count(&self) -> usize {
        self.inner.read().await.streams.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.log.clear();
        inner.streams.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id.clone();
        let first_new_version = events[0].version;

        let mut inner = self.inner.write().await;
        let current_version = inner.current_version(&aggregate_id);

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Streams stay gap-free even without an expected version.
        if first_new_version != current_version.next() {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: Version::new(first_new_version.as_i64() - 1),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);

        metrics::counter!("event_store_events_appended_total").increment(events.len() as u64);
        inner.log.extend(events.iter().cloned());
        inner
            .streams
            .entry(aggregate_id.clone())
            .or_default()
            .extend(events);

        tracing::trace!(%aggregate_id, version = %last_version, "events appended");

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner.streams.get(aggregate_id).cloned().unwrap_or_default())
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        let events = inner
            .streams
            .get(aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.inner.read().await.log.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }
}
