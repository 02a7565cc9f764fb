//! Gift card domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a gift card aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GiftCardEvent {
    /// Card was issued with an opening balance.
    Issued(IssuedData),

    /// Part of the balance was redeemed.
    Redeemed(RedeemedData),

    /// Card was cancelled.
    Cancelled(CancelledData),
}

impl DomainEvent for GiftCardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GiftCardEvent::Issued(_) => "Issued",
            GiftCardEvent::Redeemed(_) => "Redeemed",
            GiftCardEvent::Cancelled(_) => "Cancelled",
        }
    }
}

/// Data for Issued event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedData {
    pub card_id: AggregateId,

    /// Opening balance.
    pub amount: i64,
}

/// Data for Redeemed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedData {
    pub card_id: AggregateId,
    pub amount: i64,
}

/// Data for Cancelled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledData {
    pub card_id: AggregateId,
}

impl GiftCardEvent {
    pub fn issued(card_id: AggregateId, amount: i64) -> Self {
        GiftCardEvent::Issued(IssuedData { card_id, amount })
    }

    pub fn redeemed(card_id: AggregateId, amount: i64) -> Self {
        GiftCardEvent::Redeemed(RedeemedData { card_id, amount })
    }

    pub fn cancelled(card_id: AggregateId) -> Self {
        GiftCardEvent::Cancelled(CancelledData { card_id })
    }

    /// Returns the card this event belongs to.
    pub fn card_id(&self) -> &AggregateId {
        match self {
            GiftCardEvent::Issued(data) => &data.card_id,
            GiftCardEvent::Redeemed(data) => &data.card_id,
            GiftCardEvent::Cancelled(data) => &data.card_id,
        }
    }
}
