//! Admission engine and query surface over a [`RankedStore`].
//!
//! Admission is split in two so callers can persist a decision before it
//! becomes visible:
//! - [`Board::evaluate`] checks a submission against the board at `now` and
//!   returns the complete [`Admission`] (entry, rank, victim) without mutating
//! - [`Board::commit`] re-verifies that admission against current state and
//!   applies it; every check runs before the first mutation
//!
//! [`Board::submit`] does both. Rejections never change state.

use std::sync::Arc;

use tracing::debug;

use ember_core::constants::BOARD_CAPACITY;
use ember_core::error::{EmberError, RefundError, StoreError, SubmitError};
use ember_core::traits::DecayCalculator;
use ember_core::types::{Amount, Entry, MessageId, Sender, Submission, Timestamp};
use ember_core::validation::validate_content;

use crate::events::BoardEvent;
use crate::refunds::RefundLedger;
use crate::store::{RankKey, RankedEntry, RankedStore};

/// An accepted submission, ready to be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    /// The entry to insert, stamped with `submitted_at = now`.
    pub entry: Entry,
    /// 1-based rank the entry takes at admission time.
    pub rank: usize,
    /// Entry that loses its seat, if the board was full.
    pub evicted: Option<Entry>,
    /// Owed balance of the evicted sender after the refund credit; 0 when
    /// nothing is evicted.
    pub refund_balance: Amount,
}

impl Admission {
    /// Events to publish once the admission is applied.
    pub fn events(&self) -> Vec<BoardEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(victim) = &self.evicted {
            events.push(BoardEvent::Evicted {
                id: victim.id,
                sender: victim.sender,
                refund: victim.raw_bid,
            });
        }
        events.push(BoardEvent::Admitted {
            id: self.entry.id,
            sender: self.entry.sender,
            raw_bid: self.entry.raw_bid,
            submitted_at: self.entry.submitted_at,
            rank: self.rank,
        });
        events
    }
}

/// Plain-data image of a board, for persistence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub entries: Vec<Entry>,
    /// Every id ever admitted.
    pub seen: Vec<MessageId>,
    pub refunds: Vec<(Sender, Amount)>,
    pub next_seq: u64,
}

/// The message board: ranked store, refund ledger and decay rule.
pub struct Board {
    store: RankedStore,
    refunds: RefundLedger,
    decay: Arc<dyn DecayCalculator>,
    /// Sequence number for the next admitted entry.
    next_seq: u64,
}

impl Board {
    /// Create an empty board with the standard capacity.
    pub fn new(decay: Arc<dyn DecayCalculator>) -> Self {
        Self::with_capacity(decay, BOARD_CAPACITY)
    }

    /// Create an empty board holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(decay: Arc<dyn DecayCalculator>, capacity: usize) -> Self {
        Self {
            store: RankedStore::new(capacity.max(1)),
            refunds: RefundLedger::new(),
            decay,
            next_seq: 0,
        }
    }

    /// Rebuild a board from a persisted snapshot.
    pub fn from_snapshot(
        decay: Arc<dyn DecayCalculator>,
        capacity: usize,
        snapshot: BoardSnapshot,
        now: Timestamp,
    ) -> Result<Self, StoreError> {
        let next_seq = snapshot
            .entries
            .iter()
            .map(|e| e.seq.saturating_add(1))
            .max()
            .unwrap_or(0)
            .max(snapshot.next_seq);
        let store = RankedStore::from_parts(
            capacity.max(1),
            snapshot.entries,
            snapshot.seen,
            now,
            decay.as_ref(),
        )?;
        Ok(Self {
            store,
            refunds: RefundLedger::from_balances(snapshot.refunds),
            decay,
            next_seq,
        })
    }

    /// Export the board as plain data.
    pub fn snapshot_state(&self) -> BoardSnapshot {
        BoardSnapshot {
            entries: self.store.iter().cloned().collect(),
            seen: self.store.seen_ids().copied().collect(),
            refunds: self.refunds.iter().map(|(s, a)| (*s, *a)).collect(),
            next_seq: self.next_seq,
        }
    }

    // --- Admission ---

    /// Decide whether `submission` is admitted at `now`, without mutating.
    ///
    /// Checks, in order: content, id uniqueness (current and evicted), then
    /// that the bid strictly exceeds the qualifying minimum.
    pub fn evaluate(&self, submission: &Submission, now: Timestamp) -> Result<Admission, SubmitError> {
        validate_content(&submission.content)?;

        if self.store.is_known(&submission.id) {
            return Err(SubmitError::DuplicateId(submission.id));
        }

        let minimum = self.minimum_qualifying_bid(now);
        if submission.raw_bid <= minimum {
            return Err(SubmitError::BidTooLow {
                bid: submission.raw_bid,
                minimum,
            });
        }

        let evicted = if self.store.is_full() {
            self.store
                .lowest(now, self.decay.as_ref())
                .map(|(entry, _)| entry.clone())
        } else {
            None
        };

        let refund_balance = match &evicted {
            Some(victim) => self
                .refunds
                .balance_after_credit(&victim.sender, victim.raw_bid)
                .map_err(|_| SubmitError::RefundOverflow(victim.sender))?,
            None => 0,
        };

        let entry = Entry {
            id: submission.id,
            content: submission.content.clone(),
            sender: submission.sender,
            raw_bid: submission.raw_bid,
            submitted_at: now,
            seq: self.next_seq,
        };

        let key = RankKey::at(&entry, now, self.decay.as_ref());
        let victim_id = evicted.as_ref().map(|v| v.id);
        let ahead = self
            .store
            .iter()
            .filter(|other| Some(other.id) != victim_id)
            .filter(|other| RankKey::at(other, now, self.decay.as_ref()) < key)
            .count();

        Ok(Admission {
            entry,
            rank: ahead + 1,
            evicted,
            refund_balance,
        })
    }

    /// Apply an admission produced by [`evaluate`](Self::evaluate).
    ///
    /// Fails without mutating if the board changed since evaluation in a way
    /// that invalidates it. Returns the entry's rank.
    pub fn commit(&mut self, admission: &Admission) -> Result<usize, EmberError> {
        let entry = &admission.entry;
        let now = entry.submitted_at;

        if self.store.is_known(&entry.id) {
            return Err(StoreError::DuplicateId(entry.id).into());
        }
        match &admission.evicted {
            Some(victim) => {
                let lowest = self
                    .store
                    .lowest(now, self.decay.as_ref())
                    .map(|(e, _)| e.id);
                if lowest != Some(victim.id) {
                    return Err(StoreError::StaleAdmission(victim.id).into());
                }
                self.refunds
                    .balance_after_credit(&victim.sender, victim.raw_bid)?;
            }
            None if self.store.is_full() => {
                return Err(StoreError::CapacityExceeded(self.store.capacity()).into());
            }
            None => {}
        }
        if entry.seq != self.next_seq {
            return Err(StoreError::StaleSequence {
                expected: self.next_seq,
                found: entry.seq,
            }
            .into());
        }

        if admission.evicted.is_some() {
            let evicted = self.store.evict_lowest(now, self.decay.as_ref())?;
            let owed = self.refunds.credit(evicted.sender, evicted.raw_bid)?;
            debug!(id = %evicted.id, sender = %evicted.sender, owed = %owed, "evicted entry");
        }

        let rank = self.store.insert(entry.clone(), now, self.decay.as_ref())?;
        self.next_seq = entry.seq.saturating_add(1);
        debug!(id = %entry.id, rank, "committed entry");
        Ok(rank)
    }

    /// Evaluate and apply a submission in one step.
    pub fn submit(&mut self, submission: &Submission, now: Timestamp) -> Result<Admission, EmberError> {
        let admission = self.evaluate(submission, now)?;
        self.commit(&admission)?;
        Ok(admission)
    }

    /// Pay out everything owed to `sender`, returning the amount.
    pub fn withdraw(&mut self, sender: &Sender) -> Result<Amount, RefundError> {
        self.refunds.take(sender)
    }

    // --- Queries ---

    /// All entries ranked at `now`, best first, recomputed on every call.
    pub fn list_top(&self, now: Timestamp) -> Vec<RankedEntry> {
        self.store.snapshot(now, self.decay.as_ref())
    }

    /// Current number of entries.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// The bid a submission must strictly exceed to be admitted at `now`:
    /// 0 while there is free space, otherwise the lowest entry's effective value.
    pub fn minimum_qualifying_bid(&self, now: Timestamp) -> Amount {
        if !self.store.is_full() {
            return 0;
        }
        self.store
            .lowest(now, self.decay.as_ref())
            .map(|(_, value)| value)
            .unwrap_or(0)
    }

    /// Get a current entry by id.
    pub fn get(&self, id: &MessageId) -> Option<&Entry> {
        self.store.get(id)
    }

    /// Whether the id was ever admitted.
    pub fn is_known(&self, id: &MessageId) -> bool {
        self.store.is_known(id)
    }

    /// Effective value of `entry` at `now` under this board's decay rule.
    pub fn effective_value(&self, entry: &Entry, now: Timestamp) -> Amount {
        self.decay
            .effective_value(entry.raw_bid, entry.submitted_at, now)
    }

    /// Amount withdrawable by `sender`.
    pub fn pending_refund(&self, sender: &Sender) -> Amount {
        self.refunds.owed(sender)
    }

    /// Sum of all withdrawable refunds.
    pub fn total_refunds_owed(&self) -> Amount {
        self.refunds.total_owed()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn decay(&self) -> &dyn DecayCalculator {
        self.decay.as_ref()
    }

    pub fn store(&self) -> &RankedStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::constants::HALF_LIFE_SECS;
    use ember_core::error::ContentError;
    use ember_decay::HalvingEngine;

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    const DAY: u64 = HALF_LIFE_SECS;

    fn board() -> Board {
        Board::new(Arc::new(HalvingEngine::new()))
    }

    fn id(seed: u64) -> MessageId {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&seed.to_be_bytes());
        MessageId(bytes)
    }

    fn sender(seed: u8) -> Sender {
        Sender([seed; 20])
    }

    fn sub(seed: u64, raw_bid: Amount) -> Submission {
        Submission::new(format!("message {seed}"), id(seed), sender(seed as u8), raw_bid)
    }

    /// Fill the board to capacity with `raw_bid` entries at `now`.
    fn fill(board: &mut Board, raw_bid: Amount, now: Timestamp) {
        for seed in 1..=BOARD_CAPACITY as u64 {
            board.submit(&sub(seed, raw_bid), now).unwrap();
        }
    }

    fn submit_err(board: &mut Board, submission: &Submission, now: Timestamp) -> SubmitError {
        match board.submit(submission, now) {
            Err(EmberError::Submit(e)) => e,
            other => panic!("expected submit rejection, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    #[test]
    fn first_submission_is_rank_one() {
        let mut b = board();
        let hello = Submission::new("hello", MessageId([1; 32]), sender(1), 100);
        let admission = b.submit(&hello, 0).unwrap();
        assert_eq!(admission.rank, 1);
        assert_eq!(admission.evicted, None);
        assert_eq!(b.count(), 1);
        assert_eq!(b.minimum_qualifying_bid(0), 0);
    }

    #[test]
    fn full_board_rejects_then_admits_after_decay() {
        let mut b = board();
        fill(&mut b, 100, 0);
        assert_eq!(b.count(), BOARD_CAPACITY);
        assert_eq!(b.minimum_qualifying_bid(0), 100);

        let low = sub(1_000, 50);
        assert_eq!(
            submit_err(&mut b, &low, 0),
            SubmitError::BidTooLow { bid: 50, minimum: 100 }
        );

        assert_eq!(b.minimum_qualifying_bid(DAY), 50);
        assert_eq!(
            submit_err(&mut b, &low, DAY),
            SubmitError::BidTooLow { bid: 50, minimum: 50 }
        );

        let admission = b.submit(&sub(1_001, 51), DAY).unwrap();
        assert_eq!(b.count(), BOARD_CAPACITY);
        // All occupants tie at 50 after a day; the latest admitted loses.
        let victim = admission.evicted.unwrap();
        assert_eq!(victim.id, id(BOARD_CAPACITY as u64));
        assert!(!b.store().contains(&victim.id));
        assert_eq!(admission.rank, 1);
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    #[test]
    fn rejects_invalid_content() {
        let mut b = board();
        let blank = Submission::new("  ", id(1), sender(1), 10);
        assert_eq!(
            submit_err(&mut b, &blank, 0),
            SubmitError::InvalidContent(ContentError::Empty)
        );
        let long = Submission::new("x".repeat(281), id(2), sender(1), 10);
        assert!(matches!(
            submit_err(&mut b, &long, 0),
            SubmitError::InvalidContent(ContentError::TooLong { len: 281, max: 280 })
        ));
        assert_eq!(b.count(), 0);
    }

    #[test]
    fn rejects_duplicate_active_id() {
        let mut b = board();
        b.submit(&sub(1, 10), 0).unwrap();
        assert_eq!(submit_err(&mut b, &sub(1, 999), 0), SubmitError::DuplicateId(id(1)));
    }

    #[test]
    fn rejects_replayed_evicted_id() {
        let mut b = board();
        fill(&mut b, 100, 0);
        let admission = b.submit(&sub(5_000, 101), 0).unwrap();
        let victim = admission.evicted.unwrap();
        let replay = Submission::new("again", victim.id, victim.sender, 1_000_000);
        assert_eq!(submit_err(&mut b, &replay, 0), SubmitError::DuplicateId(victim.id));
    }

    #[test]
    fn content_checked_before_duplicate() {
        let mut b = board();
        b.submit(&sub(1, 10), 0).unwrap();
        let dup_blank = Submission::new("", id(1), sender(1), 10);
        assert_eq!(
            submit_err(&mut b, &dup_blank, 0),
            SubmitError::InvalidContent(ContentError::Empty)
        );
    }

    #[test]
    fn zero_bid_rejected_even_with_space() {
        let mut b = board();
        assert_eq!(
            submit_err(&mut b, &sub(1, 0), 0),
            SubmitError::BidTooLow { bid: 0, minimum: 0 }
        );
    }

    #[test]
    fn any_positive_bid_admitted_with_space() {
        let mut b = board();
        for seed in 1..=10 {
            b.submit(&sub(seed, 1), 0).unwrap();
        }
        assert_eq!(b.count(), 10);
    }

    // ------------------------------------------------------------------
    // Ranking
    // ------------------------------------------------------------------

    #[test]
    fn rank_reflects_decayed_competition() {
        let mut b = board();
        b.submit(&sub(1, 400), 0).unwrap();
        b.submit(&sub(2, 300), 0).unwrap();
        // Two days later: 400 → 100, 300 → 75. A fresh 90 slots between.
        let admission = b.submit(&sub(3, 90), 2 * DAY).unwrap();
        assert_eq!(admission.rank, 2);

        let top = b.list_top(2 * DAY);
        let ids: Vec<MessageId> = top.iter().map(|r| r.entry.id).collect();
        assert_eq!(ids, vec![id(1), id(3), id(2)]);
        assert_eq!(top[0].effective_value, 100);
        assert_eq!(top[2].effective_value, 75);
    }

    #[test]
    fn list_top_recomputes_per_call() {
        let mut b = board();
        b.submit(&sub(1, 100), 0).unwrap();
        b.submit(&sub(2, 60), DAY).unwrap();
        assert_eq!(b.list_top(DAY)[0].entry.id, id(2));
        assert_eq!(b.list_top(DAY)[1].effective_value, 50);
        assert_eq!(b.list_top(3 * DAY)[0].effective_value, 15);
    }

    #[test]
    fn decayed_occupant_loses_to_smaller_absolute_bid() {
        let mut b = board();
        fill(&mut b, 1_000, 0);
        // After 4 days each 1_000 bid is worth 62.
        let admission = b.submit(&sub(9_000, 63), 4 * DAY).unwrap();
        assert!(admission.evicted.is_some());
        assert_eq!(b.count(), BOARD_CAPACITY);
    }

    #[test]
    fn committed_rank_matches_evaluated_rank() {
        let mut b = board();
        for seed in 1..=20 {
            b.submit(&sub(seed, (seed * 37 % 101) as Amount + 1), seed * 3_600).unwrap();
        }
        let admission = b.evaluate(&sub(99, 50), 30 * 3_600).unwrap();
        let rank = b.commit(&admission).unwrap();
        assert_eq!(rank, admission.rank);
    }

    // ------------------------------------------------------------------
    // Evaluate / commit
    // ------------------------------------------------------------------

    #[test]
    fn evaluate_does_not_mutate() {
        let mut b = board();
        fill(&mut b, 100, 0);
        let before = b.list_top(0);
        let admission = b.evaluate(&sub(7_000, 500), 0).unwrap();
        assert!(admission.evicted.is_some());
        assert_eq!(admission.refund_balance, 100);
        assert_eq!(b.list_top(0), before);
        assert_eq!(b.total_refunds_owed(), 0);
    }

    #[test]
    fn commit_twice_is_rejected() {
        let mut b = board();
        let admission = b.evaluate(&sub(1, 10), 0).unwrap();
        b.commit(&admission).unwrap();
        let err = b.commit(&admission).unwrap_err();
        assert!(matches!(err, EmberError::Store(StoreError::DuplicateId(_))));
        assert_eq!(b.count(), 1);
    }

    #[test]
    fn stale_victim_is_rejected_without_mutation() {
        let mut b = board();
        fill(&mut b, 100, 0);
        let first = b.evaluate(&sub(7_000, 500), 0).unwrap();
        let second = b.evaluate(&sub(7_001, 600), 0).unwrap();
        assert_eq!(first.evicted, second.evicted);

        b.commit(&first).unwrap();
        let owed = b.total_refunds_owed();
        let err = b.commit(&second).unwrap_err();
        assert!(matches!(err, EmberError::Store(StoreError::StaleAdmission(_))));
        assert!(!b.is_known(&id(7_001)));
        assert_eq!(b.total_refunds_owed(), owed);
    }

    #[test]
    fn admissions_from_the_same_state_cannot_share_a_seq() {
        let mut b = board();
        let first = b.evaluate(&sub(1, 100), 0).unwrap();
        let second = b.evaluate(&sub(2, 100), 0).unwrap();
        assert_eq!(first.entry.seq, second.entry.seq);

        b.commit(&first).unwrap();
        let err = b.commit(&second).unwrap_err();
        assert!(matches!(
            err,
            EmberError::Store(StoreError::StaleSequence { expected: 1, found: 0 })
        ));
        assert!(!b.is_known(&id(2)));
        assert_eq!(b.count(), 1);
        assert_eq!(b.next_seq(), 1);

        // Re-evaluated against the new state it takes the next seq.
        let retry = b.evaluate(&sub(2, 100), 0).unwrap();
        assert_eq!(retry.entry.seq, 1);
        assert_eq!(b.commit(&retry).unwrap(), retry.rank);
        assert_eq!(retry.rank, 2);
    }

    #[test]
    fn admission_without_victim_fails_on_full_board() {
        let mut b = board();
        let early = b.evaluate(&sub(9_999, 500), 0).unwrap();
        fill(&mut b, 100, 0);
        let err = b.commit(&early).unwrap_err();
        assert!(matches!(err, EmberError::Store(StoreError::CapacityExceeded(100))));
    }

    #[test]
    fn admission_events_order() {
        let mut b = board();
        fill(&mut b, 100, 0);
        let admission = b.submit(&sub(7_000, 500), 0).unwrap();
        let events = admission.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "evicted");
        assert_eq!(
            events[1],
            BoardEvent::Admitted {
                id: id(7_000),
                sender: sender((7_000u64) as u8),
                raw_bid: 500,
                submitted_at: 0,
                rank: 1,
            }
        );
    }

    // ------------------------------------------------------------------
    // Refunds
    // ------------------------------------------------------------------

    #[test]
    fn eviction_credits_full_raw_bid() {
        let mut b = board();
        fill(&mut b, 100, 0);
        let admission = b.submit(&sub(7_000, 80), 2 * DAY).unwrap();
        let victim = admission.evicted.unwrap();
        assert_eq!(b.pending_refund(&victim.sender), 100);
        assert_eq!(b.withdraw(&victim.sender).unwrap(), 100);
        assert_eq!(b.pending_refund(&victim.sender), 0);
        assert_eq!(
            b.withdraw(&victim.sender),
            Err(RefundError::NothingOwed(victim.sender))
        );
    }

    #[test]
    fn repeated_evictions_accumulate_per_sender() {
        let mut b = Board::with_capacity(Arc::new(HalvingEngine::new()), 2);
        let loser = sender(0xEE);
        b.submit(&Submission::new("a", id(1), loser, 10), 0).unwrap();
        b.submit(&Submission::new("b", id(2), loser, 20), 0).unwrap();
        b.submit(&sub(3, 30), 0).unwrap();
        b.submit(&sub(4, 40), 0).unwrap();
        assert_eq!(b.pending_refund(&loser), 30);
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let decay: Arc<dyn DecayCalculator> = Arc::new(HalvingEngine::new());
        let mut b = Board::with_capacity(Arc::clone(&decay), 3);
        for seed in 1..=5 {
            b.submit(&sub(seed, seed as Amount * 10), 0).unwrap();
        }

        let restored = Board::from_snapshot(decay, 3, b.snapshot_state(), 0).unwrap();
        assert_eq!(restored.list_top(0), b.list_top(0));
        assert_eq!(restored.next_seq(), 5);
        assert!(restored.is_known(&id(1)));
        assert_eq!(restored.pending_refund(&sender(1)), 10);
        assert_eq!(restored.total_refunds_owed(), 30);
    }

    #[test]
    fn from_snapshot_derives_next_seq_from_entries() {
        let mut b = board();
        b.submit(&sub(1, 10), 0).unwrap();
        let mut snap = b.snapshot_state();
        snap.next_seq = 0;
        let restored =
            Board::from_snapshot(Arc::new(HalvingEngine::new()), BOARD_CAPACITY, snap, 0).unwrap();
        assert_eq!(restored.next_seq(), 1);
    }
}
