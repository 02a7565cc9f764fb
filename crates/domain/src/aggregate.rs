//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::command::Command;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// The aggregate is the consistency boundary and the unit of serialization.
/// Its behavior is split in two:
/// - [`decide`](Aggregate::decide) validates a command against the current
///   state and produces events, or rejects it
/// - [`apply`](Aggregate::apply) folds an already-accepted event into the
///   state and never fails
///
/// `Default` is the uninitialized state, before any event has been applied.
pub trait Aggregate: Default + Clone + Send + Sync + Sized + 'static {
    /// The commands this aggregate accepts.
    type Command: Command;

    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The rejections `decide` can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    ///
    /// Used for event store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identity.
    ///
    /// Returns None for an uninitialized aggregate.
    fn id(&self) -> Option<&AggregateId>;

    /// Returns the version of the last applied stored event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    fn set_version(&mut self, version: Version);

    /// Validates a command against the current state.
    ///
    /// Returns the events to append (possibly none) or a rejection.
    /// Must not mutate state; only [`apply`](Aggregate::apply) does that.
    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// By-value form of [`apply`](Aggregate::apply), convenient for folds.
    fn evolve(mut self, event: Self::Event) -> Self {
        self.apply(event);
        self
    }
}
