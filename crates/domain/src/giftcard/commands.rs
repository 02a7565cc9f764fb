//! Gift card commands.

use common::AggregateId;

use crate::command::Command;

/// Command to issue a new card with an opening balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueGiftCard {
    /// Identity chosen by the issuer.
    pub card_id: AggregateId,

    pub amount: i64,
}

impl IssueGiftCard {
    pub fn new(card_id: AggregateId, amount: i64) -> Self {
        Self { card_id, amount }
    }

    /// Creates an Issue command with a freshly generated identity.
    pub fn with_generated_id(amount: i64) -> Self {
        Self::new(AggregateId::generate(), amount)
    }
}

impl Command for IssueGiftCard {
    fn aggregate_id(&self) -> &AggregateId {
        &self.card_id
    }

    fn name(&self) -> &'static str {
        "issue"
    }
}

/// Command to redeem part of a card's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemGiftCard {
    pub card_id: AggregateId,
    pub amount: i64,
}

impl RedeemGiftCard {
    pub fn new(card_id: AggregateId, amount: i64) -> Self {
        Self { card_id, amount }
    }
}

impl Command for RedeemGiftCard {
    fn aggregate_id(&self) -> &AggregateId {
        &self.card_id
    }

    fn name(&self) -> &'static str {
        "redeem"
    }
}

/// Command to cancel a card, forcing its balance to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelGiftCard {
    pub card_id: AggregateId,
}

impl CancelGiftCard {
    pub fn new(card_id: AggregateId) -> Self {
        Self { card_id }
    }
}

impl Command for CancelGiftCard {
    fn aggregate_id(&self) -> &AggregateId {
        &self.card_id
    }

    fn name(&self) -> &'static str {
        "cancel"
    }
}

/// Any command accepted by the gift card aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiftCardCommand {
    Issue(IssueGiftCard),
    Redeem(RedeemGiftCard),
    Cancel(CancelGiftCard),
}

impl GiftCardCommand {
    pub fn issue(card_id: AggregateId, amount: i64) -> Self {
        GiftCardCommand::Issue(IssueGiftCard::new(card_id, amount))
    }

    pub fn redeem(card_id: AggregateId, amount: i64) -> Self {
        GiftCardCommand::Redeem(RedeemGiftCard::new(card_id, amount))
    }

    pub fn cancel(card_id: AggregateId) -> Self {
        GiftCardCommand::Cancel(CancelGiftCard::new(card_id))
    }
}

impl Command for GiftCardCommand {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            GiftCardCommand::Issue(cmd) => cmd.aggregate_id(),
            GiftCardCommand::Redeem(cmd) => cmd.aggregate_id(),
            GiftCardCommand::Cancel(cmd) => cmd.aggregate_id(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            GiftCardCommand::Issue(cmd) => cmd.name(),
            GiftCardCommand::Redeem(cmd) => cmd.name(),
            GiftCardCommand::Cancel(cmd) => cmd.name(),
        }
    }
}

impl From<IssueGiftCard> for GiftCardCommand {
    fn from(cmd: IssueGiftCard) -> Self {
        GiftCardCommand::Issue(cmd)
    }
}

impl From<RedeemGiftCard> for GiftCardCommand {
    fn from(cmd: RedeemGiftCard) -> Self {
        GiftCardCommand::Redeem(cmd)
    }
}

impl From<CancelGiftCard> for GiftCardCommand {
    fn from(cmd: CancelGiftCard) -> Self {
        GiftCardCommand::Cancel(cmd)
    }
}
