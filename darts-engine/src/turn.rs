//! Turn lifecycle: recording throws and reversing them.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{DARTS_PER_TURN, LOG_TURN};
use crate::dart::{Dart, DartIndex};
use crate::rules::{Verdict, judge};
use crate::state::{PlayerId, Throw, ThrowSet, Turn};

/// Where a turn sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Darts remain and nothing has ended the turn.
    Open,
    /// All three darts thrown without bust or checkout.
    Closed,
    Bust,
    Checkout,
}

impl Turn {
    /// Start an empty turn for `player_id` at `remaining_score_at_start`.
    #[must_use]
    pub fn new(turn_number: u32, player_id: PlayerId, remaining_score_at_start: i32) -> Self {
        Self {
            turn_number,
            player_id,
            remaining_score_at_start,
            score: 0,
            remaining_score: remaining_score_at_start,
            darts_thrown: 0,
            is_bust: false,
            is_checkout: false,
            throws: ThrowSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        if self.is_checkout {
            TurnState::Checkout
        } else if self.is_bust {
            TurnState::Bust
        } else if self.darts_thrown >= DARTS_PER_TURN {
            TurnState::Closed
        } else {
            TurnState::Open
        }
    }

    /// Whether another dart may be recorded in this turn.
    #[must_use]
    pub fn accepts_darts(&self) -> bool {
        self.state() == TurnState::Open
    }

    #[must_use]
    pub fn has_dart(&self, index: DartIndex) -> bool {
        self.throws.iter().any(|throw| throw.dart_index == index)
    }

    /// Index the next dart of this turn is expected to carry.
    #[must_use]
    pub const fn expected_dart_index(&self) -> u8 {
        self.darts_thrown + 1
    }

    #[must_use]
    pub fn last_throw(&self) -> Option<&Throw> {
        self.throws.last()
    }

    /// Judge `dart` against the running remaining score and apply it.
    ///
    /// A bust voids every dart of the turn, so score and remaining fall back
    /// to the turn's starting position.
    pub(crate) fn record(&mut self, dart: &Dart) -> (Verdict, Throw) {
        let verdict = judge(self.remaining_score, dart);
        let points = dart.points();
        let throw = Throw {
            dart_index: dart.index,
            segment: dart.segment,
            multiplier: dart.multiplier,
            points,
            is_bust: verdict.is_bust(),
            is_checkout: verdict.is_checkout(),
        };

        match verdict {
            Verdict::Bust => {
                self.is_bust = true;
                self.score = 0;
                self.remaining_score = self.remaining_score_at_start;
            }
            Verdict::Checkout => {
                self.is_checkout = true;
                self.score += points;
                self.remaining_score = 0;
            }
            Verdict::Scored { remaining } => {
                self.score += points;
                self.remaining_score = remaining;
            }
        }
        self.throws.push(throw.clone());
        self.darts_thrown += 1;

        debug!(
            target: LOG_TURN,
            "turn {} player {}: {dart} -> {verdict:?}, score {} remaining {}",
            self.turn_number, self.player_id, self.score, self.remaining_score
        );
        (verdict, throw)
    }

    /// Remove the most recent throw and reverse its effect on the turn.
    pub(crate) fn revert_last(&mut self) -> Option<Throw> {
        let throw = self.throws.pop()?;
        if throw.is_bust {
            self.is_bust = false;
            self.rederive_score();
        } else {
            if throw.is_checkout {
                self.is_checkout = false;
            }
            self.score -= throw.points;
            self.remaining_score += throw.points;
        }
        self.darts_thrown = self.darts_thrown.saturating_sub(1);

        debug!(
            target: LOG_TURN,
            "turn {} player {}: undid dart {}, score {} remaining {}",
            self.turn_number, self.player_id, throw.dart_index, self.score, self.remaining_score
        );
        Some(throw)
    }

    // The darts preceding a bust were zeroed along with it; rebuild them.
    fn rederive_score(&mut self) {
        self.score = self
            .throws
            .iter()
            .filter(|throw| !throw.is_bust)
            .map(|throw| throw.points)
            .sum();
        self.remaining_score = self.remaining_score_at_start - self.score;
    }
}
