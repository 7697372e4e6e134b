//! Leg lifecycle, turn order, and derived player scores.
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::constants::{LOG_LEG, STARTING_SCORE};
use crate::state::{Leg, LegId, LegStatus, LegSummary, MatchId, PlayerId, Roster, Turn};

impl Leg {
    #[must_use]
    pub fn new(
        id: LegId,
        match_id: MatchId,
        leg_number: u32,
        starting_player_id: PlayerId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            match_id,
            leg_number,
            starting_player_id,
            status: LegStatus::Active,
            winning_player_id: None,
            started_at,
            completed_at: None,
            turns: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LegStatus::Active
    }

    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The turn still accepting darts, if any. Only the last turn can be open.
    #[must_use]
    pub fn open_turn(&self) -> Option<&Turn> {
        self.turns.last().filter(|turn| turn.accepts_darts())
    }

    /// Remaining score for `player`, rebuilt from every non-bust turn.
    ///
    /// This scan is the source of truth for a player's position; running
    /// values stored on turns are never carried forward.
    #[must_use]
    pub fn player_remaining_score(&self, player: PlayerId) -> i32 {
        let scored: i32 = self
            .turns
            .iter()
            .filter(|turn| turn.player_id == player && !turn.is_bust)
            .map(|turn| turn.score)
            .sum();
        STARTING_SCORE - scored
    }

    #[must_use]
    pub fn next_turn_number(&self) -> u32 {
        self.turns
            .iter()
            .map(|turn| turn.turn_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Whether a dart from `player` must start a fresh turn.
    #[must_use]
    pub fn needs_new_turn(&self, player: PlayerId) -> bool {
        self.open_turn()
            .is_none_or(|turn| turn.player_id != player)
    }

    /// Return the turn that a dart from `player` belongs to, creating it
    /// when needed. The flag reports whether the turn was created.
    pub(crate) fn turn_for(&mut self, player: PlayerId) -> (&mut Turn, bool) {
        let created = self.needs_new_turn(player);
        if created {
            let turn = Turn::new(
                self.next_turn_number(),
                player,
                self.player_remaining_score(player),
            );
            debug!(
                target: LOG_LEG,
                "leg {}: turn {} opened for player {} at {}",
                self.id, turn.turn_number, player, turn.remaining_score_at_start
            );
            self.turns.push(turn);
        }
        let len = self.turns.len();
        (&mut self.turns[len - 1], created)
    }

    /// Player expected to throw next, following the roster order.
    ///
    /// `None` once the leg is completed.
    #[must_use]
    pub fn current_player(&self, roster: &Roster) -> Option<PlayerId> {
        if !self.is_active() {
            return None;
        }
        match self.turns.last() {
            None => Some(self.starting_player_id),
            Some(turn) if turn.accepts_darts() => Some(turn.player_id),
            Some(turn) => roster.next_after(turn.player_id),
        }
    }

    pub(crate) fn complete(&mut self, winner: PlayerId, at: DateTime<Utc>) {
        self.status = LegStatus::Completed;
        self.winning_player_id = Some(winner);
        self.completed_at = Some(at);
        info!(target: LOG_LEG, "leg {} won by player {winner}", self.id);
    }

    /// Compensating transition used when a winning throw is undone.
    pub(crate) fn reopen(&mut self) {
        if let Some(winner) = self.winning_player_id.take() {
            info!(target: LOG_LEG, "leg {} reopened, win by player {winner} undone", self.id);
        }
        self.status = LegStatus::Active;
        self.completed_at = None;
    }

    #[must_use]
    pub fn summary(&self) -> LegSummary {
        LegSummary {
            id: self.id,
            match_id: self.match_id,
            leg_number: self.leg_number,
            starting_player_id: self.starting_player_id,
            status: self.status,
            winning_player_id: self.winning_player_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            turn_count: self.turns.len(),
        }
    }
}
