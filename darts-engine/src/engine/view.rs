//! Read-only projections for status consumers.
use serde::{Deserialize, Serialize};

use crate::state::{Leg, LegSummary, PlayerId, Roster, Turn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub player_id: PlayerId,
    pub remaining_score: i32,
    pub turns_taken: usize,
}

/// Current player and the one a forced advance would hand the board to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPlayer {
    pub current_player_id: PlayerId,
    pub next_player_id: PlayerId,
}

/// Snapshot of a leg for UI and status consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub leg: LegSummary,
    pub players: Vec<PlayerId>,
    pub current_player_id: Option<PlayerId>,
    pub current_turn: Option<Turn>,
    pub turns: Vec<Turn>,
    pub standings: Vec<PlayerStanding>,
}

impl GameStateView {
    #[must_use]
    pub fn project(leg: &Leg, roster: &Roster) -> Self {
        let standings = roster
            .players()
            .iter()
            .map(|&player_id| PlayerStanding {
                player_id,
                remaining_score: leg.player_remaining_score(player_id),
                turns_taken: leg
                    .turns
                    .iter()
                    .filter(|turn| turn.player_id == player_id)
                    .count(),
            })
            .collect();

        Self {
            leg: leg.summary(),
            players: roster.players().to_vec(),
            current_player_id: leg.current_player(roster),
            current_turn: leg.open_turn().cloned(),
            turns: leg.turns.clone(),
            standings,
        }
    }

    #[must_use]
    pub fn standing(&self, player: PlayerId) -> Option<&PlayerStanding> {
        self.standings.iter().find(|s| s.player_id == player)
    }
}

impl NextPlayer {
    /// Resolve the forced-advance pair for `leg`.
    ///
    /// With no current player (a finished leg) the starting player stands in.
    #[must_use]
    pub fn resolve(leg: &Leg, roster: &Roster) -> Self {
        let current_player_id = leg
            .current_player(roster)
            .unwrap_or(leg.starting_player_id);
        let next_player_id = roster
            .next_after(current_player_id)
            .unwrap_or(current_player_id);
        Self {
            current_player_id,
            next_player_id,
        }
    }
}
