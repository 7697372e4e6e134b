//! Explicit transaction boundary over one leg aggregate.
use crate::state::{Leg, MatchId, Roster};

/// Working copy of a leg handed to the engine by a storage collaborator.
///
/// The engine mutates only the working copy. Storage persists
/// [`LegTransaction::commit`] when the operation succeeds and discards the
/// transaction otherwise, so a failed operation never leaves partial state.
#[derive(Debug, Clone)]
pub struct LegTransaction {
    roster: Roster,
    original: Leg,
    working: Leg,
}

impl LegTransaction {
    /// Begin a transaction over `leg`, whose match throws in `roster` order.
    #[must_use]
    pub fn begin(leg: Leg, roster: Roster) -> Self {
        Self {
            roster,
            original: leg.clone(),
            working: leg,
        }
    }

    #[must_use]
    pub const fn leg(&self) -> &Leg {
        &self.working
    }

    pub(crate) const fn leg_mut(&mut self) -> &mut Leg {
        &mut self.working
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub const fn match_id(&self) -> MatchId {
        self.working.match_id
    }

    /// Whether the working copy differs from the state the transaction began with.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    /// Finish the transaction, yielding the leg to persist.
    #[must_use]
    pub fn commit(self) -> Leg {
        self.working
    }

    /// Abandon the transaction, yielding the untouched leg.
    #[must_use]
    pub fn rollback(self) -> Leg {
        self.original
    }
}
