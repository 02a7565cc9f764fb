//! Append-only event store.
//!
//! Events are appended per aggregate in strict version order and read back
//! in that order for replay. [`InMemoryEventStore`] is the bundled backend.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
