//! Domain layer for the gift card event-sourcing system.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits splitting `decide` (fallible) from `apply` (total)
//! - The replay engine that folds stored events back into state
//! - CommandHandler, which serializes commands per aggregate identity
//! - The gift card aggregate, its commands, events and service

pub mod aggregate;
pub mod command;
pub mod error;
pub mod giftcard;
pub mod replay;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{
    Command, CommandGateway, CommandHandler, CommandResult, DEFAULT_CACHE_CAPACITY,
};
pub use error::{DomainError, ErrorKind};
pub use giftcard::{
    CancelGiftCard, CancelledData, CardState, CardStatus, GiftCard, GiftCardCommand,
    GiftCardError, GiftCardEvent, GiftCardService, IssueGiftCard, IssuedData, RedeemGiftCard,
    RedeemedData,
};
pub use replay::{reconstruct, replay_envelopes, replay_states};
