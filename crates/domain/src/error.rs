//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::giftcard::GiftCardError;

/// Classification of a failed command, independent of the aggregate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The command carried invalid input (e.g. a non-positive amount).
    InvalidArgument,
    /// The command targets an aggregate that was never created.
    NotFound,
    /// The requested amount exceeds the available balance.
    InsufficientBalance,
    /// The aggregate already exists.
    AlreadyExists,
    /// The aggregate is in a terminal state.
    Terminated,
    /// Storage refused the write; resubmitting may succeed.
    TransientFailure,
    /// Anything else (corrupt payloads, malformed appends).
    Internal,
}

impl ErrorKind {
    /// Returns the kind as a stable label, suitable for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Terminated => "terminated",
            ErrorKind::TransientFailure => "transient_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The gift card aggregate rejected the command.
    #[error("Gift card error: {0}")]
    GiftCard(#[from] GiftCardError),

    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::GiftCard(e) => e.kind(),
            DomainError::EventStore(e) if e.is_transient() => ErrorKind::TransientFailure,
            DomainError::EventStore(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the command was refused by a business rule or validation.
    ///
    /// Rejections are final: resubmitting the same command rejects again.
    pub fn is_rejection(&self) -> bool {
        matches!(self, DomainError::GiftCard(_))
    }

    /// Returns true if resubmitting the identical command may succeed.
    pub fn is_retriable(&self) -> bool {
        self.kind() == ErrorKind::TransientFailure
    }
}
