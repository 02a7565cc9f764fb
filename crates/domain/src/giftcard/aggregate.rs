//! Gift card aggregate implementation.

use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{CardState, CardStatus, GiftCardCommand, GiftCardError, GiftCardEvent};

/// Gift card aggregate root.
///
/// The default value is the uninitialized card, distinct from an issued
/// card with a zero balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiftCard {
    card: Option<CardState>,
    status: CardStatus,
    version: Version,
}

impl Aggregate for GiftCard {
    type Command = GiftCardCommand;
    type Event = GiftCardEvent;
    type Error = GiftCardError;

    fn aggregate_type() -> &'static str {
        "GiftCard"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.card.as_ref().map(|card| &card.id)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn decide(&self, command: &GiftCardCommand) -> Result<Vec<GiftCardEvent>, GiftCardError> {
        match command {
            GiftCardCommand::Issue(cmd) => self.issue(&cmd.card_id, cmd.amount),
            GiftCardCommand::Redeem(cmd) => self.redeem(&cmd.card_id, cmd.amount),
            GiftCardCommand::Cancel(cmd) => self.cancel(&cmd.card_id),
        }
    }

    fn apply(&mut self, event: GiftCardEvent) {
        match event {
            GiftCardEvent::Issued(data) => {
                self.card = Some(CardState {
                    id: data.card_id,
                    remaining_value: data.amount,
                });
                self.status = CardStatus::Active;
            }
            GiftCardEvent::Redeemed(data) => {
                if let Some(card) = self.card.as_mut() {
                    card.remaining_value -= data.amount;
                }
            }
            GiftCardEvent::Cancelled(_) => {
                if let Some(card) = self.card.as_mut() {
                    card.remaining_value = 0;
                }
                self.status = CardStatus::Cancelled;
            }
        }
    }
}

// Query methods
impl GiftCard {
    /// Returns the materialized card, or None if it was never issued.
    pub fn card(&self) -> Option<&CardState> {
        self.card.as_ref()
    }

    /// Returns the remaining balance, or None if the card was never issued.
    pub fn remaining_value(&self) -> Option<i64> {
        self.card.as_ref().map(|card| card.remaining_value)
    }

    pub fn status(&self) -> CardStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl GiftCard {
    /// Issues the card with an opening balance.
    pub fn issue(
        &self,
        card_id: &AggregateId,
        amount: i64,
    ) -> Result<Vec<GiftCardEvent>, GiftCardError> {
        if !self.status.can_issue() {
            return Err(GiftCardError::AlreadyIssued(card_id.clone()));
        }

        if amount <= 0 {
            return Err(GiftCardError::InvalidAmount { amount });
        }

        Ok(vec![GiftCardEvent::issued(card_id.clone(), amount)])
    }

    /// Redeems part of the balance.
    pub fn redeem(
        &self,
        card_id: &AggregateId,
        amount: i64,
    ) -> Result<Vec<GiftCardEvent>, GiftCardError> {
        let card = self.require_card(card_id)?;

        if amount <= 0 {
            return Err(GiftCardError::InvalidAmount { amount });
        }

        if !self.status.can_redeem() {
            return Err(GiftCardError::Cancelled(card.id.clone()));
        }

        if amount > card.remaining_value {
            return Err(GiftCardError::InsufficientBalance {
                requested: amount,
                available: card.remaining_value,
            });
        }

        Ok(vec![GiftCardEvent::redeemed(card.id.clone(), amount)])
    }

    /// Cancels the card regardless of its balance.
    ///
    /// Cancelling an already cancelled card produces no event.
    pub fn cancel(&self, card_id: &AggregateId) -> Result<Vec<GiftCardEvent>, GiftCardError> {
        let card = self.require_card(card_id)?;

        if self.status.is_terminal() {
            return Ok(vec![]);
        }

        Ok(vec![GiftCardEvent::cancelled(card.id.clone())])
    }

    fn require_card(&self, card_id: &AggregateId) -> Result<&CardState, GiftCardError> {
        self.card
            .as_ref()
            .ok_or_else(|| GiftCardError::NotFound(card_id.clone()))
    }
}
