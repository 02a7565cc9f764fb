//! Gift card service providing a simplified API for card operations.

use async_trait::async_trait;
use common::AggregateId;
use event_store::EventStore;

use crate::command::{Command, CommandGateway, CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::replay::{replay_envelopes, replay_states};

use super::{
    CancelGiftCard, GiftCard, GiftCardCommand, GiftCardEvent, IssueGiftCard, RedeemGiftCard,
};

/// Service for managing gift cards.
///
/// Wraps the command handler and records command outcomes in metrics.
pub struct GiftCardService<S: EventStore> {
    handler: CommandHandler<S, GiftCard>,
}

impl<S: EventStore> GiftCardService<S> {
    /// Creates a new gift card service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Creates a service whose handler keeps at most `capacity` idle card slots.
    pub fn with_cache_capacity(store: S, capacity: usize) -> Self {
        Self {
            handler: CommandHandler::with_cache_capacity(store, capacity),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, GiftCard> {
        &self.handler
    }

    /// Submits any gift card command.
    #[tracing::instrument(
        skip(self),
        fields(card_id = %command.aggregate_id(), command = command.name())
    )]
    pub async fn submit(
        &self,
        command: GiftCardCommand,
    ) -> Result<CommandResult<GiftCard>, DomainError> {
        let name = command.name();
        metrics::counter!("giftcard_commands_total", "command" => name).increment(1);

        let result = self.handler.submit(command).await;
        if let Err(e) = &result {
            metrics::counter!(
                "giftcard_commands_failed_total",
                "command" => name,
                "kind" => e.kind().as_str()
            )
            .increment(1);
            if e.is_rejection() {
                tracing::debug!(error = %e, "command rejected");
            } else {
                tracing::warn!(error = %e, "command failed");
            }
        }
        result
    }

    /// Issues a new card.
    pub async fn issue(&self, cmd: IssueGiftCard) -> Result<CommandResult<GiftCard>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Redeems part of a card's balance.
    pub async fn redeem(
        &self,
        cmd: RedeemGiftCard,
    ) -> Result<CommandResult<GiftCard>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Cancels a card.
    pub async fn cancel(
        &self,
        cmd: CancelGiftCard,
    ) -> Result<CommandResult<GiftCard>, DomainError> {
        self.submit(cmd.into()).await
    }

    /// Loads a card by replaying its stream.
    ///
    /// Returns None if the card was never issued.
    #[tracing::instrument(skip(self))]
    pub async fn get_card(&self, card_id: &AggregateId) -> Result<Option<GiftCard>, DomainError> {
        self.handler.load_existing(card_id).await
    }

    /// Current balance, replayed from the store.
    pub async fn balance(&self, card_id: &AggregateId) -> Result<Option<i64>, DomainError> {
        let events = self.handler.store().get_events_for_aggregate(card_id).await?;
        let card: GiftCard = replay_envelopes(events)?;
        Ok(card.remaining_value())
    }

    /// Returns the card's events in stream order.
    pub async fn history(&self, card_id: &AggregateId) -> Result<Vec<GiftCardEvent>, DomainError> {
        self.handler
            .store()
            .get_events_for_aggregate(card_id)
            .await?
            .into_iter()
            .map(|envelope| serde_json::from_value(envelope.payload).map_err(DomainError::from))
            .collect()
    }

    /// Returns the balance after each event of the card's stream.
    pub async fn balance_history(&self, card_id: &AggregateId) -> Result<Vec<i64>, DomainError> {
        let events = self.history(card_id).await?;
        Ok(replay_states::<GiftCard>(&events)
            .filter_map(|card| card.remaining_value())
            .collect())
    }
}

#[async_trait]
impl<S: EventStore> CommandGateway<GiftCard> for GiftCardService<S> {
    async fn send(&self, command: GiftCardCommand) -> Result<CommandResult<GiftCard>, DomainError> {
        self.submit(command).await
    }
}
