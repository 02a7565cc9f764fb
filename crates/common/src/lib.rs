//! Shared types for the gift card event-sourcing system.

mod types;

pub use types::AggregateId;
