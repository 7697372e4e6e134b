//! Raw dart values and point calculation.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    BULL_SEGMENT, DARTS_PER_TURN, INNER_BULL_POINTS, MAX_NUMBER_SEGMENT, MISS_SEGMENT,
    OUTER_BULL_POINTS,
};
use crate::error::InputError;

/// Ring hit by a dart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    Miss,
    Single,
    Double,
    Treble,
}

impl Multiplier {
    /// Parse the wire value (0 = miss, 1 = single, 2 = double, 3 = treble).
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Multiplier`] for anything outside 0-3.
    pub const fn from_raw(value: i32) -> Result<Self, InputError> {
        match value {
            0 => Ok(Self::Miss),
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            3 => Ok(Self::Treble),
            other => Err(InputError::Multiplier(other)),
        }
    }

    #[must_use]
    pub const fn factor(self) -> i32 {
        match self {
            Self::Miss => 0,
            Self::Single => 1,
            Self::Double => 2,
            Self::Treble => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miss => "miss",
            Self::Single => "single",
            Self::Double => "double",
            Self::Treble => "treble",
        }
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board segment: 0 for a miss, 1-20 for the numbers, 25 for the bull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Segment(u8);

impl Segment {
    pub const MISS: Self = Self(MISS_SEGMENT);
    pub const BULL: Self = Self(BULL_SEGMENT);

    /// # Errors
    ///
    /// Returns [`InputError::Segment`] for values that are not on the board.
    pub fn new(value: i32) -> Result<Self, InputError> {
        let raw = u8::try_from(value).map_err(|_| InputError::Segment(value))?;
        if raw <= MAX_NUMBER_SEGMENT || raw == BULL_SEGMENT {
            Ok(Self(raw))
        } else {
            Err(InputError::Segment(value))
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_miss(self) -> bool {
        self.0 == MISS_SEGMENT
    }

    #[must_use]
    pub const fn is_bull(self) -> bool {
        self.0 == BULL_SEGMENT
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a dart within its turn (1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DartIndex(u8);

impl DartIndex {
    pub const FIRST: Self = Self(1);

    /// # Errors
    ///
    /// Returns [`InputError::DartIndex`] unless the value is 1, 2, or 3.
    pub fn new(value: i32) -> Result<Self, InputError> {
        match u8::try_from(value) {
            Ok(raw @ 1..=DARTS_PER_TURN) => Ok(Self(raw)),
            _ => Err(InputError::DartIndex(value)),
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DartIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Points scored by a segment/multiplier pair.
///
/// A miss segment scores nothing whatever the multiplier; the bull scores 25
/// on the outer ring and 50 on the inner ring.
#[must_use]
pub const fn points(segment: Segment, multiplier: Multiplier) -> i32 {
    if segment.is_miss() {
        return 0;
    }
    if segment.is_bull() {
        return match multiplier {
            Multiplier::Miss => 0,
            Multiplier::Single => OUTER_BULL_POINTS,
            // Treble bull is rejected when a `Dart` is built.
            Multiplier::Double | Multiplier::Treble => INNER_BULL_POINTS,
        };
    }
    segment.value() as i32 * multiplier.factor()
}

/// A validated dart event awaiting resolution by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dart {
    pub segment: Segment,
    pub multiplier: Multiplier,
    pub index: DartIndex,
}

impl Dart {
    /// Validate raw caller input into a dart.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] when any value is out of range or the
    /// combination is impossible (treble bull).
    pub fn new(segment: i32, multiplier: i32, dart_index: i32) -> Result<Self, InputError> {
        let segment = Segment::new(segment)?;
        let multiplier = Multiplier::from_raw(multiplier)?;
        let index = DartIndex::new(dart_index)?;
        if segment.is_bull() && multiplier == Multiplier::Treble {
            return Err(InputError::TrebleBull);
        }
        Ok(Self {
            segment,
            multiplier,
            index,
        })
    }

    #[must_use]
    pub const fn points(&self) -> i32 {
        points(self.segment, self.multiplier)
    }

    /// Whether the dart landed in a double ring (double bull included).
    #[must_use]
    pub fn is_double(&self) -> bool {
        self.multiplier == Multiplier::Double && !self.segment.is_miss()
    }
}

impl fmt::Display for Dart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dart {}: {} {}",
            self.index, self.multiplier, self.segment
        )
    }
}
