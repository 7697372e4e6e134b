//! Darts Scoring Engine
//!
//! Platform-agnostic 501 scoring logic: dart validation, bust and checkout
//! rules, turn and leg lifecycle, and single-step undo. Persistence is
//! delegated to a [`ScoreStorage`] implementation supplied by the caller.

pub mod config;
pub mod constants;
pub mod dart;
pub mod engine;
pub mod error;
pub mod leg;
pub mod rules;
pub mod state;
pub mod store;
pub mod transaction;
pub mod turn;

use chrono::Utc;
use log::info;

// Re-export commonly used types
pub use config::{ConfigError, DartOrderPolicy, EngineConfig};
pub use constants::{DARTS_PER_TURN, STARTING_SCORE};
pub use dart::{Dart, DartIndex, Multiplier, Segment, points};
pub use engine::{
    GameStateView, NextPlayer, PlayerStanding, ScoringEngine, ThrowOutcome, UndoOutcome,
};
pub use error::{EntityKind, InputError, ScoringError, StateError};
pub use rules::{Verdict, judge};
pub use state::{
    Leg, LegId, LegStatus, LegSummary, Match, MatchId, MatchStatus, PlayerId, Roster, Throw,
    Turn,
};
pub use store::{InMemoryStore, StoreError};
pub use transaction::LegTransaction;
pub use turn::TurnState;

use crate::constants::LOG_MATCH;

/// Trait for abstracting persistence of matches and legs.
/// Platform-specific implementations should provide this.
pub trait ScoreStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reserve a fresh match identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no identifier can be allocated.
    fn allocate_match_id(&self) -> Result<MatchId, Self::Error>;

    /// Reserve a fresh leg identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no identifier can be allocated.
    fn allocate_leg_id(&self) -> Result<LegId, Self::Error>;

    /// Insert or replace a match.
    ///
    /// # Errors
    ///
    /// Returns an error if the match cannot be saved.
    fn save_match(&self, record: &Match) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the match cannot be loaded.
    fn load_match(&self, id: MatchId) -> Result<Option<Match>, Self::Error>;

    /// Run `f` with exclusive access to a match and persist its changes only
    /// when it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match,
    /// [`ScoringError::Storage`] when persistence fails, and any error `f`
    /// returns.
    fn transact_match<R, F>(&self, id: MatchId, f: F) -> Result<R, ScoringError>
    where
        F: FnOnce(&mut Match) -> Result<R, ScoringError>;

    /// Store the next leg of a match.
    ///
    /// `build` receives the match and the leg number the new leg must carry.
    /// Implementations hold the match exclusively from numbering until the
    /// leg is stored, so concurrent calls never share a leg number.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match,
    /// [`ScoringError::Storage`] when the leg cannot be saved, is already
    /// stored or carries the wrong number, and any error `build` returns.
    fn insert_next_leg<F>(&self, match_id: MatchId, build: F) -> Result<Leg, ScoringError>
    where
        F: FnOnce(&Match, u32) -> Result<Leg, ScoringError>;

    /// Last committed state of a leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the leg cannot be loaded.
    fn load_leg(&self, id: LegId) -> Result<Option<Leg>, Self::Error>;

    /// All legs of a match, ordered by leg number.
    ///
    /// # Errors
    ///
    /// Returns an error if the legs cannot be loaded.
    fn legs_for_match(&self, id: MatchId) -> Result<Vec<Leg>, Self::Error>;

    /// Run `f` inside a transaction over one leg.
    ///
    /// Implementations must give `f` exclusive access to the leg for its whole
    /// duration and persist [`LegTransaction::commit`] only when `f` returns
    /// `Ok`; on `Err` nothing may be written.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown leg or match,
    /// [`ScoringError::Storage`] when persistence fails, and any error `f`
    /// returns.
    fn transact_leg<R, F>(&self, id: LegId, f: F) -> Result<R, ScoringError>
    where
        F: FnOnce(&mut LegTransaction) -> Result<R, ScoringError>;
}

/// Main scoring engine binding the rules to a storage backend.
pub struct DartsEngine<S>
where
    S: ScoreStorage,
{
    storage: S,
    scoring: ScoringEngine,
}

impl<S> DartsEngine<S>
where
    S: ScoreStorage,
{
    /// Create a new engine with the provided storage and configuration
    #[must_use]
    pub const fn new(storage: S, config: EngineConfig) -> Self {
        Self {
            storage,
            scoring: ScoringEngine::new(config),
        }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        self.scoring.config()
    }

    /// Create a match whose players throw in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidInput`] for an empty or duplicated
    /// roster, or a storage error.
    pub fn create_match(&self, players: &[PlayerId]) -> Result<Match, ScoringError> {
        let roster = Roster::new(players.to_vec())?;
        let id = self
            .storage
            .allocate_match_id()
            .map_err(ScoringError::storage)?;
        let record = Match::new(id, roster, Utc::now());
        self.storage
            .save_match(&record)
            .map_err(ScoringError::storage)?;
        info!(target: LOG_MATCH, "match {id} created for {} players", players.len());
        Ok(record)
    }

    /// Mark an active match as completed.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match and
    /// [`ScoringError::IllegalState`] when it is not active.
    pub fn complete_match(&self, match_id: MatchId) -> Result<Match, ScoringError> {
        let record = self.storage.transact_match(match_id, |record| {
            ensure_active(record)?;
            record.complete(Utc::now());
            Ok(record.clone())
        })?;
        info!(target: LOG_MATCH, "match {match_id} completed");
        Ok(record)
    }

    /// Start the next leg of a match with `starting_player_id` to throw first.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match,
    /// [`ScoringError::IllegalState`] when the match is not active, and
    /// [`ScoringError::InvalidInput`] when the starting player is not in it.
    pub fn start_new_leg(
        &self,
        match_id: MatchId,
        starting_player_id: PlayerId,
    ) -> Result<Leg, ScoringError> {
        let leg = self.storage.insert_next_leg(match_id, |record, leg_number| {
            ensure_active(record)?;
            if !record.players.contains(starting_player_id) {
                return Err(InputError::PlayerNotInMatch {
                    player: starting_player_id,
                    match_id,
                }
                .into());
            }
            let id = self
                .storage
                .allocate_leg_id()
                .map_err(ScoringError::storage)?;
            Ok(Leg::new(
                id,
                match_id,
                leg_number,
                starting_player_id,
                Utc::now(),
            ))
        })?;
        info!(
            target: LOG_MATCH,
            "match {match_id}: leg {} started by player {starting_player_id}",
            leg.leg_number
        );
        Ok(leg)
    }

    /// Validate and resolve one dart.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidInput`] for out-of-domain values, plus
    /// every error of [`ScoringEngine::process_throw`]. State is unchanged on
    /// any error.
    pub fn process_throw(
        &self,
        leg_id: LegId,
        player_id: PlayerId,
        segment: i32,
        multiplier: i32,
        dart_index: i32,
    ) -> Result<ThrowOutcome, ScoringError> {
        let dart = Dart::new(segment, multiplier, dart_index)?;
        self.storage.transact_leg(leg_id, |tx| {
            self.scoring.process_throw(tx, player_id, dart, Utc::now())
        })
    }

    /// Undo the most recent dart of a leg.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown leg or a leg with
    /// no throws.
    pub fn undo_last_throw(&self, leg_id: LegId) -> Result<UndoOutcome, ScoringError> {
        self.storage
            .transact_leg(leg_id, |tx| self.scoring.undo_last_throw(tx))
    }

    /// Read-only projection of a leg.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown leg.
    pub fn get_current_game_state(&self, leg_id: LegId) -> Result<GameStateView, ScoringError> {
        let (leg, roster) = self.read_leg(leg_id)?;
        Ok(self.scoring.game_state(&leg, &roster))
    }

    /// Current player and the one after them in roster order.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown leg.
    pub fn next_player(&self, leg_id: LegId) -> Result<NextPlayer, ScoringError> {
        let (leg, roster) = self.read_leg(leg_id)?;
        Ok(self.scoring.next_player(&leg, &roster))
    }

    /// Remaining score of `player_id`, derived from the leg's turn history.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown leg and
    /// [`ScoringError::InvalidInput`] when the player is not in the match.
    pub fn player_remaining_score(
        &self,
        leg_id: LegId,
        player_id: PlayerId,
    ) -> Result<i32, ScoringError> {
        let (leg, roster) = self.read_leg(leg_id)?;
        if !roster.contains(player_id) {
            return Err(InputError::PlayerNotInMatch {
                player: player_id,
                match_id: leg.match_id,
            }
            .into());
        }
        Ok(leg.player_remaining_score(player_id))
    }

    /// Game state of the match's most recent active leg.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match or when no
    /// leg is active.
    pub fn current_leg(&self, match_id: MatchId) -> Result<GameStateView, ScoringError> {
        let record = self.require_match(match_id)?;
        let legs = self
            .storage
            .legs_for_match(match_id)
            .map_err(ScoringError::storage)?;
        let leg = legs
            .into_iter()
            .rev()
            .find(Leg::is_active)
            .ok_or_else(|| ScoringError::not_found(EntityKind::ActiveLeg, match_id.get()))?;
        Ok(self.scoring.game_state(&leg, &record.players))
    }

    /// Summaries of every leg in a match, in leg order.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::NotFound`] for an unknown match.
    pub fn legs_for_match(&self, match_id: MatchId) -> Result<Vec<LegSummary>, ScoringError> {
        self.require_match(match_id)?;
        let legs = self
            .storage
            .legs_for_match(match_id)
            .map_err(ScoringError::storage)?;
        Ok(legs.iter().map(Leg::summary).collect())
    }

    fn require_match(&self, match_id: MatchId) -> Result<Match, ScoringError> {
        self.storage
            .load_match(match_id)
            .map_err(ScoringError::storage)?
            .ok_or_else(|| ScoringError::not_found(EntityKind::Match, match_id.get()))
    }

    /// Committed leg plus its match roster, without entering a transaction.
    fn read_leg(&self, leg_id: LegId) -> Result<(Leg, Roster), ScoringError> {
        let leg = self
            .storage
            .load_leg(leg_id)
            .map_err(ScoringError::storage)?
            .ok_or_else(|| ScoringError::not_found(EntityKind::Leg, leg_id.get()))?;
        let record = self.require_match(leg.match_id)?;
        Ok((leg, record.players))
    }
}

fn ensure_active(record: &Match) -> Result<(), ScoringError> {
    if record.is_active() {
        return Ok(());
    }
    Err(StateError::MatchNotActive {
        match_id: record.id,
        status: record.status,
    }
    .into())
}

impl Default for DartsEngine<InMemoryStore> {
    fn default() -> Self {
        Self::new(InMemoryStore::default(), EngineConfig::default())
    }
}
