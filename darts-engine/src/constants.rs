//! Centralized rule constants for 501 scoring.
//!
//! These values define the deterministic math for the scoring engine.
//! Keeping them together ensures rules can only be adjusted via reviewed
//! code changes rather than through external configuration.

// Board geometry -----------------------------------------------------------
pub const MISS_SEGMENT: u8 = 0;
pub const MIN_NUMBER_SEGMENT: u8 = 1;
pub const MAX_NUMBER_SEGMENT: u8 = 20;
pub const BULL_SEGMENT: u8 = 25;
pub const OUTER_BULL_POINTS: i32 = 25;
pub const INNER_BULL_POINTS: i32 = 50;

// Game rules ---------------------------------------------------------------
pub const STARTING_SCORE: i32 = 501;
pub const DARTS_PER_TURN: u8 = 3;
/// Lowest remaining score that can still be finished on a double.
pub const MIN_FINISHABLE_SCORE: i32 = 2;

// Log targets --------------------------------------------------------------
pub(crate) const LOG_TURN: &str = "darts::turn";
pub(crate) const LOG_LEG: &str = "darts::leg";
pub(crate) const LOG_MATCH: &str = "darts::match";
