//! Gift card aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::GiftCard;
pub use commands::{CancelGiftCard, GiftCardCommand, IssueGiftCard, RedeemGiftCard};
pub use events::{CancelledData, GiftCardEvent, IssuedData, RedeemedData};
pub use service::GiftCardService;
pub use state::{CardState, CardStatus};

use common::AggregateId;
use thiserror::Error;

use crate::error::ErrorKind;

/// Rejections produced by the gift card aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GiftCardError {
    /// Issue and redeem amounts must be positive.
    #[error("Invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: i64 },

    /// The card was never issued.
    #[error("Gift card not found: {0}")]
    NotFound(AggregateId),

    /// The redemption exceeds the remaining value.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    /// The card identity already has an issued stream.
    #[error("Gift card already issued: {0}")]
    AlreadyIssued(AggregateId),

    /// The card was cancelled and accepts no further redemptions.
    #[error("Gift card cancelled: {0}")]
    Cancelled(AggregateId),
}

impl GiftCardError {
    /// Classifies this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GiftCardError::InvalidAmount { .. } => ErrorKind::InvalidArgument,
            GiftCardError::NotFound(_) => ErrorKind::NotFound,
            GiftCardError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            GiftCardError::AlreadyIssued(_) => ErrorKind::AlreadyExists,
            GiftCardError::Cancelled(_) => ErrorKind::Terminated,
        }
    }
}
