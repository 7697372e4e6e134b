//! Bust and checkout determination.
use serde::{Deserialize, Serialize};

use crate::constants::MIN_FINISHABLE_SCORE;
use crate::dart::Dart;

/// Result of judging one dart against the score it was thrown at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Verdict {
    /// Ordinary scoring dart; the turn continues from `remaining`.
    Scored { remaining: i32 },
    /// The whole turn is void.
    Bust,
    /// Reached exactly zero on a double.
    Checkout,
}

impl Verdict {
    #[must_use]
    pub const fn is_bust(self) -> bool {
        matches!(self, Self::Bust)
    }

    #[must_use]
    pub const fn is_checkout(self) -> bool {
        matches!(self, Self::Checkout)
    }

    /// Whether the verdict ends the turn regardless of darts left.
    #[must_use]
    pub const fn ends_turn(self) -> bool {
        !matches!(self, Self::Scored { .. })
    }
}

/// Judge `dart` thrown with `remaining_before` points left.
///
/// Zero on a double finishes the leg. Anything below two otherwise busts:
/// negative scores, exactly one, and zero reached on a non-double.
#[must_use]
pub fn judge(remaining_before: i32, dart: &Dart) -> Verdict {
    let remaining = remaining_before - dart.points();
    if remaining == 0 && dart.is_double() {
        Verdict::Checkout
    } else if remaining < MIN_FINISHABLE_SCORE {
        Verdict::Bust
    } else {
        Verdict::Scored { remaining }
    }
}
