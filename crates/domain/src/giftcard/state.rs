//! Gift card state and lifecycle.

use common::AggregateId;
use serde::{Deserialize, Serialize};

/// Materialized value of an issued card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardState {
    pub id: AggregateId,

    /// Never negative for any state reachable by replay.
    pub remaining_value: i64,
}

/// Lifecycle of a gift card.
///
/// ```text
/// Uninitialized ──Issued──► Active ──Redeemed──► Active
///                             │
///                             └──Cancelled──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CardStatus {
    /// No event applied yet.
    #[default]
    Uninitialized,

    /// Issued; may have a reduced balance after redemptions.
    Active,

    /// Cancelled (terminal state), balance forced to zero.
    Cancelled,
}

impl CardStatus {
    /// Returns true if a card may be issued in this state.
    pub fn can_issue(&self) -> bool {
        matches!(self, CardStatus::Uninitialized)
    }

    /// Returns true if redemptions are accepted in this state.
    pub fn can_redeem(&self) -> bool {
        matches!(self, CardStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CardStatus::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Uninitialized => "Uninitialized",
            CardStatus::Active => "Active",
            CardStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
