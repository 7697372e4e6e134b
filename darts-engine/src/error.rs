//! Failure kinds surfaced by the scoring engine.
use std::fmt;

use thiserror::Error;

use crate::state::{LegId, MatchId, MatchStatus, PlayerId};

/// Entity referenced by a [`ScoringError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Match,
    Leg,
    /// Active leg of the match with the reported id.
    ActiveLeg,
    /// Most recent throw of the leg with the reported id.
    LastThrow,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Leg => "leg",
            Self::ActiveLeg => "active leg of match",
            Self::LastThrow => "last throw of leg",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied values that fall outside the scoring domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("segment {0} is not on the board (expected 0-20 or 25)")]
    Segment(i32),
    #[error("multiplier {0} is invalid (expected 0-3)")]
    Multiplier(i32),
    #[error("dart index {0} is invalid (expected 1-3)")]
    DartIndex(i32),
    #[error("treble bull does not exist")]
    TrebleBull,
    #[error("dart {got} submitted out of order (expected dart {expected})")]
    DartOutOfOrder { expected: u8, got: u8 },
    #[error("player {player} is not in match {match_id}")]
    PlayerNotInMatch { player: PlayerId, match_id: MatchId },
    #[error("a match needs at least one player")]
    EmptyRoster,
    #[error("player {0} appears more than once in the roster")]
    DuplicatePlayer(PlayerId),
}

/// Operations that are well-formed but not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("leg {0} is already completed")]
    LegCompleted(LegId),
    #[error("match {match_id} is {status}, not active")]
    MatchNotActive { match_id: MatchId, status: MatchStatus },
}

/// Every failure the engine reports to its caller.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },
    #[error("dart {dart_index} already recorded for turn {turn_number}")]
    DuplicateDart { turn_number: u32, dart_index: u8 },
    #[error("illegal state: {0}")]
    IllegalState(#[from] StateError),
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ScoringError {
    /// Wrap a storage collaborator's error, keeping it as the source.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    #[must_use]
    pub const fn not_found(entity: EntityKind, id: u64) -> Self {
        Self::NotFound { entity, id }
    }
}
