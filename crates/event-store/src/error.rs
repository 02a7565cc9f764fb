use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrency conflict occurred when appending events.
    /// The expected version did not match the actual version.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The store refused the operation (unreachable, closed, overloaded).
    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    /// The batch handed to `append` was malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true if resubmitting the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventStoreError::ConcurrencyConflict { .. } | EventStoreError::Unavailable(_)
        )
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_outages_are_transient() {
        let conflict = EventStoreError::ConcurrencyConflict {
            aggregate_id: AggregateId::new("A"),
            expected: Version::initial(),
            actual: Version::first(),
        };
        assert!(conflict.is_transient());
        assert!(EventStoreError::Unavailable("down".into()).is_transient());
        assert!(!EventStoreError::InvalidAppend("empty".into()).is_transient());
    }
}
