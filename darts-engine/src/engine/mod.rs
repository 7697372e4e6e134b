//! Process-throw and undo orchestration over a leg transaction.
use chrono::{DateTime, Utc};
use log::warn;

use crate::config::{DartOrderPolicy, EngineConfig};
use crate::constants::LOG_TURN;
use crate::dart::Dart;
use crate::error::{EntityKind, InputError, ScoringError, StateError};
use crate::state::{Leg, PlayerId, Roster};
use crate::transaction::LegTransaction;

pub mod outcome;
pub mod view;
pub use outcome::{ThrowOutcome, UndoOutcome};
pub use view::{GameStateView, NextPlayer, PlayerStanding};

/// Stateless rule engine; every call works inside a caller-owned transaction.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: EngineConfig,
}

impl ScoringEngine {
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve `dart` thrown by `player` in the transaction's leg.
    ///
    /// Every check runs before the leg is touched, so an `Err` leaves the
    /// working copy exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::IllegalState`] when the leg is already completed.
    /// - [`ScoringError::InvalidInput`] when the player is not on the roster,
    ///   or the dart is out of order under [`DartOrderPolicy::Strict`].
    /// - [`ScoringError::DuplicateDart`] when the target turn already holds
    ///   a dart at the same index.
    pub fn process_throw(
        &self,
        tx: &mut LegTransaction,
        player: PlayerId,
        dart: Dart,
        now: DateTime<Utc>,
    ) -> Result<ThrowOutcome, ScoringError> {
        self.check_throw(tx, player, &dart)?;

        let leg = tx.leg_mut();
        let (turn, _) = leg.turn_for(player);
        let (verdict, throw) = turn.record(&dart);
        let turn = turn.clone();

        let leg_completed = verdict.is_checkout();
        if leg_completed {
            leg.complete(player, now);
        }

        Ok(ThrowOutcome {
            is_bust: verdict.is_bust(),
            is_checkout: verdict.is_checkout(),
            leg_completed,
            remaining_score: turn.remaining_score,
            throw,
            turn,
        })
    }

    fn check_throw(
        &self,
        tx: &LegTransaction,
        player: PlayerId,
        dart: &Dart,
    ) -> Result<(), ScoringError> {
        let leg = tx.leg();
        if !leg.is_active() {
            return Err(StateError::LegCompleted(leg.id).into());
        }
        if !tx.roster().contains(player) {
            return Err(InputError::PlayerNotInMatch {
                player,
                match_id: tx.match_id(),
            }
            .into());
        }

        let expected = match leg.open_turn().filter(|turn| turn.player_id == player) {
            Some(turn) => {
                if turn.has_dart(dart.index) {
                    return Err(ScoringError::DuplicateDart {
                        turn_number: turn.turn_number,
                        dart_index: dart.index.get(),
                    });
                }
                turn.expected_dart_index()
            }
            None => 1,
        };

        if dart.index.get() != expected {
            match self.config.dart_order {
                DartOrderPolicy::Strict => {
                    return Err(InputError::DartOutOfOrder {
                        expected,
                        got: dart.index.get(),
                    }
                    .into());
                }
                DartOrderPolicy::Lenient => warn!(
                    target: LOG_TURN,
                    "leg {}: player {player} sent dart {} but dart {expected} was expected",
                    leg.id,
                    dart.index
                ),
            }
        }
        Ok(())
    }

    /// Undo the most recent dart of the transaction's leg.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] when the leg has no throws.
    pub fn undo_last_throw(&self, tx: &mut LegTransaction) -> Result<UndoOutcome, ScoringError> {
        let leg = tx.leg_mut();
        let leg_id = leg.id.get();
        let missing = move || ScoringError::not_found(EntityKind::LastThrow, leg_id);
        let (removed, turn) = {
            let turn = leg.turns.last_mut().ok_or_else(missing)?;
            let removed = turn.revert_last().ok_or_else(missing)?;
            (removed, turn.clone())
        };

        let turn_removed = turn.throws.is_empty();
        if turn_removed {
            leg.turns.pop();
        }
        let leg_reopened = removed.is_checkout;
        if leg_reopened {
            leg.reopen();
        }

        Ok(UndoOutcome {
            removed,
            player_id: turn.player_id,
            turn_number: turn.turn_number,
            turn_removed,
            leg_reopened,
            remaining_score: turn.remaining_score,
            turn: (!turn_removed).then_some(turn),
        })
    }

    #[must_use]
    pub fn game_state(&self, leg: &Leg, roster: &Roster) -> GameStateView {
        GameStateView::project(leg, roster)
    }

    #[must_use]
    pub fn next_player(&self, leg: &Leg, roster: &Roster) -> NextPlayer {
        NextPlayer::resolve(leg, roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STARTING_SCORE;
    use crate::state::{Leg, LegId, LegStatus, MatchId, Roster};

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    fn tx() -> LegTransaction {
        let leg = Leg::new(LegId(1), MatchId(1), 1, A, Utc::now());
        LegTransaction::begin(leg, Roster::new(vec![A, B]).unwrap())
    }

    fn dart(segment: i32, multiplier: i32, index: i32) -> Dart {
        Dart::new(segment, multiplier, index).unwrap()
    }

    fn throw(
        engine: &ScoringEngine,
        tx: &mut LegTransaction,
        player: PlayerId,
        d: (i32, i32, i32),
    ) -> Result<ThrowOutcome, ScoringError> {
        engine.process_throw(tx, player, dart(d.0, d.1, d.2), Utc::now())
    }

    /// Play whole turns of treble twenty until `player` sits on `target`.
    fn walk_down(engine: &ScoringEngine, tx: &mut LegTransaction, player: PlayerId, target: i32) {
        while tx.leg().player_remaining_score(player) - target >= 60 {
            for idx in 1..=3 {
                let left = tx.leg().player_remaining_score(player) - target;
                let d = if left >= 60 { (20, 3, idx) } else { (0, 0, idx) };
                throw(engine, tx, player, d).unwrap();
            }
        }
        let left = tx.leg().player_remaining_score(player) - target;
        if left > 0 {
            let mut idx = 1;
            let mut remaining = left;
            while remaining > 0 {
                let step = remaining.min(20);
                throw(engine, tx, player, (step, 1, idx)).unwrap();
                remaining -= step;
                idx += 1;
            }
            for fill in idx..=3 {
                throw(engine, tx, player, (0, 0, fill)).unwrap();
            }
        }
    }

    #[test]
    fn first_turn_scenario() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        for idx in 1..=3 {
            throw(&engine, &mut tx, A, (20, 1, idx)).unwrap();
        }
        let turn = tx.leg().turns[0].clone();
        assert_eq!(turn.score, 60);
        assert_eq!(turn.remaining_score, 441);
        assert_eq!(turn.darts_thrown, 3);

        let outcome = throw(&engine, &mut tx, B, (20, 1, 1)).unwrap();
        assert_eq!(outcome.turn.turn_number, 2);
        assert_eq!(outcome.turn.remaining_score_at_start, STARTING_SCORE);
    }

    #[test]
    fn bust_boundary_at_two() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 2);
        assert_eq!(tx.leg().player_remaining_score(A), 2);

        let outcome = throw(&engine, &mut tx, A, (20, 1, 1)).unwrap();
        assert!(outcome.is_bust);
        assert!(!outcome.leg_completed);
        assert_eq!(outcome.remaining_score, 2);
    }

    #[test]
    fn double_twenty_checks_out_from_forty() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 40);

        let outcome = throw(&engine, &mut tx, A, (20, 2, 1)).unwrap();
        assert!(outcome.is_checkout);
        assert!(outcome.leg_completed);
        assert_eq!(outcome.remaining_score, 0);
        assert_eq!(tx.leg().status, LegStatus::Completed);
        assert_eq!(tx.leg().winning_player_id, Some(A));
        assert!(tx.leg().completed_at.is_some());
    }

    #[test]
    fn single_finish_busts_and_keeps_score() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 20);

        let outcome = throw(&engine, &mut tx, A, (20, 1, 1)).unwrap();
        assert!(outcome.is_bust);
        assert!(!outcome.is_checkout);
        assert_eq!(outcome.turn.score, 0);
        assert_eq!(outcome.remaining_score, 20);
        assert_eq!(tx.leg().player_remaining_score(A), 20);
        assert!(tx.leg().is_active());
    }

    #[test]
    fn completed_leg_rejects_darts() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 40);
        throw(&engine, &mut tx, A, (20, 2, 1)).unwrap();

        let err = throw(&engine, &mut tx, B, (20, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::IllegalState(StateError::LegCompleted(LegId(1)))
        ));
    }

    #[test]
    fn duplicate_dart_leaves_turn_untouched() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        throw(&engine, &mut tx, A, (20, 1, 1)).unwrap();
        throw(&engine, &mut tx, A, (19, 1, 2)).unwrap();
        let before = tx.leg().clone();

        let err = throw(&engine, &mut tx, A, (5, 1, 2)).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::DuplicateDart {
                turn_number: 1,
                dart_index: 2
            }
        ));
        assert_eq!(tx.leg(), &before);
        let turn = tx.leg().last_turn().unwrap();
        assert_eq!(
            turn.throws.iter().filter(|t| t.dart_index.get() == 2).count(),
            1
        );
    }

    #[test]
    fn strict_ordering_rejects_skipped_darts() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        let err = throw(&engine, &mut tx, A, (20, 1, 3)).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidInput(InputError::DartOutOfOrder {
                expected: 1,
                got: 3
            })
        ));
        assert!(tx.leg().turns.is_empty());
    }

    #[test]
    fn lenient_ordering_records_skipped_darts() {
        let engine =
            ScoringEngine::new(EngineConfig::default().with_dart_order(DartOrderPolicy::Lenient));
        let mut tx = tx();
        let outcome = throw(&engine, &mut tx, A, (20, 1, 3)).unwrap();
        assert_eq!(outcome.throw.dart_index.get(), 3);
        assert_eq!(outcome.turn.darts_thrown, 1);
    }

    #[test]
    fn unknown_player_is_rejected() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        let err = throw(&engine, &mut tx, PlayerId(99), (20, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidInput(InputError::PlayerNotInMatch { .. })
        ));
    }

    #[test]
    fn throw_then_undo_restores_leg() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        throw(&engine, &mut tx, A, (20, 3, 1)).unwrap();
        throw(&engine, &mut tx, A, (20, 3, 2)).unwrap();
        let before = tx.leg().clone();

        throw(&engine, &mut tx, A, (19, 3, 3)).unwrap();
        let undo = engine.undo_last_throw(&mut tx).unwrap();
        assert_eq!(undo.removed.points, 57);
        assert!(!undo.turn_removed);
        assert_eq!(tx.leg(), &before);

        throw(&engine, &mut tx, B, (20, 1, 1)).unwrap();
        let undo = engine.undo_last_throw(&mut tx).unwrap();
        assert!(undo.turn_removed);
        assert!(undo.turn.is_none());
        assert_eq!(undo.remaining_score, STARTING_SCORE);
        assert_eq!(tx.leg(), &before);
    }

    #[test]
    fn undoing_checkout_reopens_leg() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 40);
        let before = tx.leg().clone();

        throw(&engine, &mut tx, A, (20, 2, 1)).unwrap();
        let undo = engine.undo_last_throw(&mut tx).unwrap();
        assert!(undo.leg_reopened);
        assert_eq!(undo.remaining_score, 40);
        assert_eq!(tx.leg(), &before);
        assert!(tx.leg().is_active());
        assert_eq!(tx.leg().winning_player_id, None);
    }

    #[test]
    fn undoing_bust_reinstates_earlier_darts() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        walk_down(&engine, &mut tx, A, 100);
        throw(&engine, &mut tx, A, (20, 3, 1)).unwrap();
        let before = tx.leg().clone();

        let bust = throw(&engine, &mut tx, A, (20, 3, 2)).unwrap();
        assert!(bust.is_bust);
        assert_eq!(bust.turn.score, 0);

        engine.undo_last_throw(&mut tx).unwrap();
        assert_eq!(tx.leg(), &before);
        assert_eq!(tx.leg().player_remaining_score(A), 40);
    }

    #[test]
    fn undo_on_empty_leg_is_not_found() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        let err = engine.undo_last_throw(&mut tx).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::NotFound {
                entity: EntityKind::LastThrow,
                id: 1
            }
        ));
    }

    #[test]
    fn next_player_follows_roster() {
        let engine = ScoringEngine::default();
        let mut tx = tx();
        let pair = engine.next_player(tx.leg(), tx.roster());
        assert_eq!(pair.current_player_id, A);
        assert_eq!(pair.next_player_id, B);

        throw(&engine, &mut tx, A, (1, 1, 1)).unwrap();
        throw(&engine, &mut tx, A, (1, 1, 2)).unwrap();
        throw(&engine, &mut tx, A, (1, 1, 3)).unwrap();
        let state = engine.game_state(tx.leg(), tx.roster());
        assert_eq!(state.current_player_id, Some(B));
        assert!(state.current_turn.is_none());
        assert_eq!(state.standing(A).unwrap().remaining_score, 498);
        assert_eq!(engine.next_player(tx.leg(), tx.roster()).next_player_id, A);
    }
}
