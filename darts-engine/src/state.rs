use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::dart::{DartIndex, Multiplier, Segment};
use crate::error::InputError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Player identity, owned by the external player registry.
    PlayerId
);
entity_id!(MatchId);
entity_id!(LegId);

/// Throws of a single turn, stored inline.
pub type ThrowSet = SmallVec<[Throw; 3]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LegStatus {
    #[default]
    Active,
    Completed,
}

impl LegStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
}

impl MatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one resolved dart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throw {
    pub dart_index: DartIndex,
    pub segment: Segment,
    pub multiplier: Multiplier,
    pub points: i32,
    #[serde(default)]
    pub is_bust: bool,
    #[serde(default)]
    pub is_checkout: bool,
}

/// One player's visit to the board: up to three throws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Leg-wide sequence number, starting at 1.
    pub turn_number: u32,
    pub player_id: PlayerId,
    /// Player's remaining score before this turn began.
    pub remaining_score_at_start: i32,
    /// Points scored this turn; zero once the turn busts.
    pub score: i32,
    pub remaining_score: i32,
    pub darts_thrown: u8,
    #[serde(default)]
    pub is_bust: bool,
    #[serde(default)]
    pub is_checkout: bool,
    #[serde(default)]
    pub throws: ThrowSet,
}

/// One game to zero within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub id: LegId,
    pub match_id: MatchId,
    pub leg_number: u32,
    pub starting_player_id: PlayerId,
    #[serde(default)]
    pub status: LegStatus,
    #[serde(default)]
    pub winning_player_id: Option<PlayerId>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

/// Leg header without its turn history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSummary {
    pub id: LegId,
    pub match_id: MatchId,
    pub leg_number: u32,
    pub starting_player_id: PlayerId,
    pub status: LegStatus,
    pub winning_player_id: Option<PlayerId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub turn_count: usize,
}

/// Fixed throwing order established when a match is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<PlayerId>);

impl Roster {
    /// # Errors
    ///
    /// Returns [`InputError::EmptyRoster`] or [`InputError::DuplicatePlayer`]
    /// when the order cannot drive a game.
    pub fn new(players: Vec<PlayerId>) -> Result<Self, InputError> {
        if players.is_empty() {
            return Err(InputError::EmptyRoster);
        }
        for (idx, player) in players.iter().enumerate() {
            if players[..idx].contains(player) {
                return Err(InputError::DuplicatePlayer(*player));
            }
        }
        Ok(Self(players))
    }

    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.0.contains(&player)
    }

    /// Player throwing after `player`, wrapping to the front of the order.
    #[must_use]
    pub fn next_after(&self, player: PlayerId) -> Option<PlayerId> {
        let idx = self.0.iter().position(|p| *p == player)?;
        self.0.get((idx + 1) % self.0.len()).copied()
    }
}

/// A match: ordered roster plus lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub players: Roster,
    #[serde(default)]
    pub status: MatchStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    #[must_use]
    pub fn new(id: MatchId, players: Roster, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            players,
            status: MatchStatus::Active,
            started_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }

    pub(crate) fn complete(&mut self, at: DateTime<Utc>) {
        self.status = MatchStatus::Completed;
        self.completed_at = Some(at);
    }
}
