use serde::{Deserialize, Serialize};

use crate::state::{PlayerId, Throw, Turn};

/// Result of resolving one dart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowOutcome {
    pub is_bust: bool,
    pub is_checkout: bool,
    pub leg_completed: bool,
    /// Thrower's remaining score once the dart is applied.
    pub remaining_score: i32,
    pub throw: Throw,
    /// Snapshot of the turn after the dart.
    pub turn: Turn,
}

/// Result of undoing the most recent dart of a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoOutcome {
    pub removed: Throw,
    pub player_id: PlayerId,
    pub turn_number: u32,
    /// The turn held no other throws and was deleted.
    pub turn_removed: bool,
    /// The undone dart was the winning checkout.
    pub leg_reopened: bool,
    pub remaining_score: i32,
    /// Surviving turn, absent when it was deleted.
    pub turn: Option<Turn>,
}
