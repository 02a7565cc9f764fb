//! Command handling infrastructure.
//!
//! [`CommandHandler`] is the only writer of an aggregate's stream and of its
//! cached state. Commands for one identity run one at a time, in the order
//! they acquire that identity's slot; commands for different identities run
//! in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventId, EventStore, Version};
use tokio::sync::Mutex;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::replay::replay_envelopes;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// Store identifiers of the persisted events, in order.
    pub event_ids: Vec<EventId>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They are never
/// persisted and may be rejected if the aggregate's current state doesn't
/// allow the action.
pub trait Command: Send + Sync + 'static {
    /// Returns the identity of the aggregate this command targets.
    fn aggregate_id(&self) -> &AggregateId;

    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;
}

/// Channel through which commands reach their aggregate.
///
/// Implementations must serialize commands per aggregate identity.
#[async_trait]
pub trait CommandGateway<A: Aggregate>: Send + Sync {
    /// Sends a command and waits for it to be applied or rejected.
    async fn send(&self, command: A::Command) -> Result<CommandResult<A>, DomainError>;
}

/// Per-identity slot holding the last materialized state.
///
/// `None` means the state must be replayed from the store before use.
type Slot<A> = Arc<Mutex<Option<A>>>;

/// Slots kept before idle ones are swept, unless overridden with
/// [`CommandHandler::with_cache_capacity`].
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Handler for executing commands against aggregates.
///
/// For each command the handler:
/// 1. Locks the slot of the target identity
/// 2. Replays the aggregate from the store if the slot is cold
/// 3. Decides, then appends with an expected-version check
/// 4. Applies the new events to the cached state before unlocking
///
/// A rejection leaves the store and the cached state untouched. A store
/// failure invalidates the slot so the next command replays from the store.
///
/// The slot map is bounded: when a new identity arrives at capacity, every
/// slot no command holds or awaits is dropped.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    slots: Mutex<HashMap<AggregateId, Slot<A>>>,
    capacity: usize,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self::with_cache_capacity(store, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a handler that keeps at most `capacity` idle slots.
    pub fn with_cache_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn cache_capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays an aggregate from the event store, bypassing the cache.
    ///
    /// If the aggregate doesn't exist, returns the uninitialized state.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;
        replay_envelopes(events)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Submits a command to the aggregate it targets.
    pub async fn submit(&self, command: A::Command) -> Result<CommandResult<A>, DomainError>
    where
        DomainError: From<A::Error>,
    {
        let aggregate_id = command.aggregate_id().clone();
        self.execute(&aggregate_id, |aggregate| aggregate.decide(&command))
            .await
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. It runs while the
    /// identity's slot is held.
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let slot = self.slot(aggregate_id).await;
        let mut cached = slot.lock().await;

        // Taken out of the slot so a dropped future leaves it cold, not stale.
        let mut aggregate = match cached.take() {
            Some(aggregate) => aggregate,
            None => self.load(aggregate_id).await?,
        };

        match self.decide_and_append(aggregate_id, &aggregate, command_fn).await {
            Ok((events, event_ids, new_version)) => {
                aggregate.apply_events(events.iter().cloned());
                aggregate.set_version(new_version);
                *cached = Some(aggregate.clone());

                Ok(CommandResult {
                    aggregate,
                    events,
                    event_ids,
                    new_version,
                })
            }
            Err(DomainError::EventStore(e)) => {
                tracing::warn!(%aggregate_id, error = %e, "append failed, dropping cached state");
                Err(DomainError::EventStore(e))
            }
            Err(e) => {
                *cached = Some(aggregate);
                Err(e)
            }
        }
    }

    /// Returns the number of identities with a slot.
    pub async fn cached_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Drops the cached state of an identity.
    ///
    /// Returns false and keeps the slot if a command currently holds or
    /// awaits it.
    pub async fn evict(&self, aggregate_id: &AggregateId) -> bool {
        let mut slots = self.slots.lock().await;
        match slots.get(aggregate_id) {
            // Slots are only cloned under this lock, so a count of one
            // means nobody else can be using it.
            Some(slot) if Arc::strong_count(slot) == 1 => {
                slots.remove(aggregate_id);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    async fn slot(&self, aggregate_id: &AggregateId) -> Slot<A> {
        let mut slots = self.slots.lock().await;
        if !slots.contains_key(aggregate_id) && slots.len() >= self.capacity {
            let before = slots.len();
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            tracing::debug!(swept = before - slots.len(), "swept idle aggregate slots");
        }
        slots.entry(aggregate_id.clone()).or_default().clone()
    }

    async fn decide_and_append<F>(
        &self,
        aggregate_id: &AggregateId,
        aggregate: &A,
        command_fn: F,
    ) -> Result<(Vec<A::Event>, Vec<EventId>, Version), DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();
        let events = command_fn(aggregate)?;

        if events.is_empty() {
            return Ok((events, Vec::new(), current_version));
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events)?;
        let event_ids = envelopes.iter().map(|e| e.event_id).collect();

        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await
            .inspect_err(|_| {
                metrics::counter!("event_store_append_failures_total").increment(1);
            })?;

        Ok((events, event_ids, new_version))
    }

    /// Builds event envelopes from domain events.
    fn build_envelopes(
        &self,
        aggregate_id: &AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id.clone())
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}

#[async_trait]
impl<S, A> CommandGateway<A> for CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
    DomainError: From<A::Error>,
{
    async fn send(&self, command: A::Command) -> Result<CommandResult<A>, DomainError> {
        self.submit(command).await
    }
}
