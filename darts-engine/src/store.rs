//! In-process storage backend.
//!
//! Each match and each leg lives in its own slot. A leg slot pairs a writer
//! mutex, held for the whole of a transaction, with the last committed copy,
//! so throws on one leg are serialized while reads and other legs proceed.
//! A match slot owns the ids of its legs, and leg numbers are assigned while
//! that slot is locked.
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::{debug, trace};
use thiserror::Error;

use crate::ScoreStorage;
use crate::constants::{LOG_LEG, LOG_MATCH};
use crate::error::{EntityKind, ScoringError};
use crate::state::{Leg, LegId, Match, MatchId};
use crate::transaction::LegTransaction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} lock poisoned by a panicking writer")]
    Poisoned(&'static str),
    #[error("leg {0} already exists")]
    DuplicateLeg(LegId),
    #[error("leg {leg} is not leg {expected} of match {match_id}")]
    LegOutOfSequence {
        leg: LegId,
        match_id: MatchId,
        expected: u32,
    },
}

#[derive(Debug)]
struct MatchEntry {
    record: Match,
    /// Leg ids in leg-number order.
    legs: Vec<LegId>,
}

#[derive(Debug)]
struct LegEntry {
    writer: Mutex<()>,
    committed: RwLock<Leg>,
}

impl LegEntry {
    fn new(leg: Leg) -> Self {
        Self {
            writer: Mutex::new(()),
            committed: RwLock::new(leg),
        }
    }

    fn snapshot(&self) -> Result<Leg, StoreError> {
        self.committed
            .read()
            .map(|leg| leg.clone())
            .map_err(|_| StoreError::Poisoned("leg"))
    }
}

type MatchSlot = Arc<Mutex<MatchEntry>>;
type LegSlot = Arc<LegEntry>;

#[derive(Debug)]
pub struct InMemoryStore {
    next_match_id: AtomicU64,
    next_leg_id: AtomicU64,
    matches: RwLock<BTreeMap<MatchId, MatchSlot>>,
    legs: RwLock<BTreeMap<LegId, LegSlot>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            next_match_id: AtomicU64::new(1),
            next_leg_id: AtomicU64::new(1),
            matches: RwLock::new(BTreeMap::new()),
            legs: RwLock::new(BTreeMap::new()),
        }
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn match_slot(&self, id: MatchId) -> Result<Option<MatchSlot>, StoreError> {
        let matches = self
            .matches
            .read()
            .map_err(|_| StoreError::Poisoned("match table"))?;
        Ok(matches.get(&id).cloned())
    }

    fn leg_slot(&self, id: LegId) -> Result<Option<LegSlot>, StoreError> {
        let legs = self.legs.read().map_err(|_| StoreError::Poisoned("leg index"))?;
        Ok(legs.get(&id).cloned())
    }

    fn require_match_slot(&self, id: MatchId) -> Result<MatchSlot, ScoringError> {
        self.match_slot(id)
            .map_err(ScoringError::storage)?
            .ok_or_else(|| ScoringError::not_found(EntityKind::Match, id.get()))
    }

    fn lock_match(slot: &MatchSlot) -> Result<MutexGuard<'_, MatchEntry>, StoreError> {
        slot.lock().map_err(|_| StoreError::Poisoned("match"))
    }
}

impl ScoreStorage for InMemoryStore {
    type Error = StoreError;

    fn allocate_match_id(&self) -> Result<MatchId, StoreError> {
        Ok(MatchId(self.next_match_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn allocate_leg_id(&self) -> Result<LegId, StoreError> {
        Ok(LegId(self.next_leg_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn save_match(&self, record: &Match) -> Result<(), StoreError> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| StoreError::Poisoned("match table"))?;
        match matches.entry(record.id) {
            Entry::Occupied(slot) => {
                Self::lock_match(slot.get())?.record = record.clone();
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(MatchEntry {
                    record: record.clone(),
                    legs: Vec::new(),
                })));
            }
        }
        Ok(())
    }

    fn load_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        let Some(slot) = self.match_slot(id)? else {
            return Ok(None);
        };
        let entry = Self::lock_match(&slot)?;
        Ok(Some(entry.record.clone()))
    }

    fn transact_match<R, F>(&self, id: MatchId, f: F) -> Result<R, ScoringError>
    where
        F: FnOnce(&mut Match) -> Result<R, ScoringError>,
    {
        let slot = self.require_match_slot(id)?;
        let mut entry = Self::lock_match(&slot).map_err(ScoringError::storage)?;
        let mut working = entry.record.clone();
        let value = f(&mut working)?;
        if working != entry.record {
            entry.record = working;
            debug!(target: LOG_MATCH, "match {id}: committed");
        }
        Ok(value)
    }

    fn insert_next_leg<F>(&self, match_id: MatchId, build: F) -> Result<Leg, ScoringError>
    where
        F: FnOnce(&Match, u32) -> Result<Leg, ScoringError>,
    {
        let slot = self.require_match_slot(match_id)?;
        let mut entry = Self::lock_match(&slot).map_err(ScoringError::storage)?;
        let leg_number = u32::try_from(entry.legs.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let leg = build(&entry.record, leg_number)?;
        if leg.match_id != match_id || leg.leg_number != leg_number {
            return Err(ScoringError::storage(StoreError::LegOutOfSequence {
                leg: leg.id,
                match_id,
                expected: leg_number,
            }));
        }

        let mut legs = self
            .legs
            .write()
            .map_err(|_| ScoringError::storage(StoreError::Poisoned("leg index")))?;
        if legs.contains_key(&leg.id) {
            return Err(ScoringError::storage(StoreError::DuplicateLeg(leg.id)));
        }
        legs.insert(leg.id, Arc::new(LegEntry::new(leg.clone())));
        drop(legs);
        entry.legs.push(leg.id);
        debug!(target: LOG_MATCH, "match {match_id}: leg {leg_number} stored as {}", leg.id);
        Ok(leg)
    }

    fn load_leg(&self, id: LegId) -> Result<Option<Leg>, StoreError> {
        self.leg_slot(id)?
            .map(|slot| slot.snapshot())
            .transpose()
    }

    fn legs_for_match(&self, id: MatchId) -> Result<Vec<Leg>, StoreError> {
        let Some(slot) = self.match_slot(id)? else {
            return Ok(Vec::new());
        };
        // Release the match before touching legs; transactions lock the other way round.
        let ids = Self::lock_match(&slot)?.legs.clone();
        let mut found = Vec::with_capacity(ids.len());
        for leg_id in ids {
            if let Some(leg) = self.load_leg(leg_id)? {
                found.push(leg);
            }
        }
        Ok(found)
    }

    fn transact_leg<R, F>(&self, id: LegId, f: F) -> Result<R, ScoringError>
    where
        F: FnOnce(&mut LegTransaction) -> Result<R, ScoringError>,
    {
        let slot = self
            .leg_slot(id)
            .map_err(ScoringError::storage)?
            .ok_or_else(|| ScoringError::not_found(EntityKind::Leg, id.get()))?;
        let _writer = slot
            .writer
            .lock()
            .map_err(|_| ScoringError::storage(StoreError::Poisoned("leg writer")))?;

        let current = slot.snapshot().map_err(ScoringError::storage)?;
        let match_id = current.match_id;
        let roster = self
            .load_match(match_id)
            .map_err(ScoringError::storage)?
            .ok_or_else(|| ScoringError::not_found(EntityKind::Match, match_id.get()))?
            .players;

        let mut tx = LegTransaction::begin(current, roster);
        match f(&mut tx) {
            Ok(value) => {
                if tx.is_dirty() {
                    let mut committed = slot
                        .committed
                        .write()
                        .map_err(|_| ScoringError::storage(StoreError::Poisoned("leg")))?;
                    *committed = tx.commit();
                    debug!(target: LOG_LEG, "leg {id}: committed");
                }
                Ok(value)
            }
            Err(err) => {
                trace!(target: LOG_LEG, "leg {id}: rolled back ({err})");
                drop(tx.rollback());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LegStatus, MatchStatus, PlayerId, Roster};
    use chrono::Utc;

    fn new_match(store: &InMemoryStore) -> Match {
        let match_id = store.allocate_match_id().unwrap();
        let roster = Roster::new(vec![PlayerId(1), PlayerId(2)]).unwrap();
        let record = Match::new(match_id, roster, Utc::now());
        store.save_match(&record).unwrap();
        record
    }

    fn next_leg(store: &InMemoryStore, match_id: MatchId) -> Leg {
        store
            .insert_next_leg(match_id, |_, number| {
                let id = store.allocate_leg_id().map_err(ScoringError::storage)?;
                Ok(Leg::new(id, match_id, number, PlayerId(1), Utc::now()))
            })
            .unwrap()
    }

    fn seeded() -> (InMemoryStore, Match, Leg) {
        let store = InMemoryStore::new();
        let record = new_match(&store);
        let leg = next_leg(&store, record.id);
        (store, record, leg)
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let store = InMemoryStore::new();
        assert_eq!(store.allocate_match_id().unwrap(), MatchId(1));
        assert_eq!(store.allocate_match_id().unwrap(), MatchId(2));
        assert_eq!(store.allocate_leg_id().unwrap(), LegId(1));
    }

    #[test]
    fn duplicate_leg_insert_is_refused() {
        let (store, record, leg) = seeded();
        let err = store
            .insert_next_leg(record.id, |_, number| {
                Ok(Leg::new(leg.id, record.id, number, PlayerId(2), Utc::now()))
            })
            .unwrap_err();
        match err {
            ScoringError::Storage(source) => assert_eq!(
                source.downcast_ref::<StoreError>(),
                Some(&StoreError::DuplicateLeg(leg.id))
            ),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert_eq!(store.legs_for_match(record.id).unwrap(), vec![leg]);
    }

    #[test]
    fn misnumbered_leg_is_refused() {
        let (store, record, _) = seeded();
        let err = store
            .insert_next_leg(record.id, |_, _| {
                Ok(Leg::new(LegId(77), record.id, 1, PlayerId(1), Utc::now()))
            })
            .unwrap_err();
        assert!(matches!(err, ScoringError::Storage(_)));
        assert!(store.load_leg(LegId(77)).unwrap().is_none());
    }

    #[test]
    fn leg_numbers_follow_the_match() {
        let store = InMemoryStore::new();
        let first = new_match(&store);
        let second = new_match(&store);
        let numbers: Vec<u32> = [first.id, second.id, first.id, first.id]
            .into_iter()
            .map(|id| next_leg(&store, id).leg_number)
            .collect();
        assert_eq!(numbers, vec![1, 1, 2, 3]);

        let err = store
            .insert_next_leg(MatchId(404), |_, _| unreachable!())
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::NotFound {
                entity: EntityKind::Match,
                id: 404
            }
        ));
    }

    #[test]
    fn failed_match_transaction_writes_nothing() {
        let (store, record, _) = seeded();
        let result: Result<(), ScoringError> = store.transact_match(record.id, |game| {
            game.complete(Utc::now());
            Err(ScoringError::not_found(EntityKind::ActiveLeg, 0))
        });
        assert!(result.is_err());
        assert_eq!(store.load_match(record.id).unwrap().unwrap(), record);

        store
            .transact_match(record.id, |game| {
                game.complete(Utc::now());
                Ok(())
            })
            .unwrap();
        let stored = store.load_match(record.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Completed);
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let (store, _, leg) = seeded();
        let result: Result<(), ScoringError> = store.transact_leg(leg.id, |tx| {
            tx.leg_mut().status = LegStatus::Completed;
            Err(ScoringError::not_found(EntityKind::LastThrow, 0))
        });
        assert!(result.is_err());
        assert_eq!(store.load_leg(leg.id).unwrap().unwrap(), leg);
    }

    #[test]
    fn successful_transaction_is_persisted() {
        let (store, record, leg) = seeded();
        let seen = store
            .transact_leg(leg.id, |tx| {
                tx.leg_mut().status = LegStatus::Completed;
                Ok(tx.roster().players().len())
            })
            .unwrap();
        assert_eq!(seen, record.players.players().len());
        let stored = store.load_leg(leg.id).unwrap().unwrap();
        assert_eq!(stored.status, LegStatus::Completed);
    }

    #[test]
    fn reads_see_committed_state_during_a_transaction() {
        let (store, record, leg) = seeded();
        store
            .transact_leg(leg.id, |tx| {
                tx.leg_mut().status = LegStatus::Completed;
                let seen = store.load_leg(leg.id).map_err(ScoringError::storage)?;
                assert_eq!(seen.map(|l| l.status), Some(LegStatus::Active));
                let listed = store
                    .legs_for_match(record.id)
                    .map_err(ScoringError::storage)?;
                assert_eq!(listed.len(), 1);
                Ok(())
            })
            .unwrap();
        assert_eq!(
            store.load_leg(leg.id).unwrap().unwrap().status,
            LegStatus::Completed
        );
    }

    #[test]
    fn unknown_leg_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.transact_leg(LegId(5), |_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::NotFound {
                entity: EntityKind::Leg,
                id: 5
            }
        ));
    }

    #[test]
    fn legs_are_listed_per_match_in_order() {
        let (store, record, first) = seeded();
        let foreign = new_match(&store);
        next_leg(&store, foreign.id);
        let second = next_leg(&store, record.id);

        let legs = store.legs_for_match(record.id).unwrap();
        let ids: Vec<LegId> = legs.iter().map(|leg| leg.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(store.legs_for_match(MatchId(999)).unwrap().is_empty());
    }

    #[test]
    fn saving_a_match_again_keeps_its_legs() {
        let (store, mut record, leg) = seeded();
        record.complete(Utc::now());
        store.save_match(&record).unwrap();
        assert_eq!(store.load_match(record.id).unwrap().unwrap(), record);
        assert_eq!(store.legs_for_match(record.id).unwrap(), vec![leg]);
    }
}
