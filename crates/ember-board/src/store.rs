//! Bounded store of ranked entries.
//!
//! The store keeps entries in an arena keyed by [`MessageId`] and remembers
//! every id it has ever admitted so evicted ids cannot be replayed. Ranking
//! depends on `now` (bids decay), so the store never trusts a cached order:
//! - mutations (`insert`, `evict_lowest`) recompute the order at the
//!   mutation's `now` and keep it as [`RankedStore::order`]
//! - [`RankedStore::snapshot`] recomputes a fresh order at the caller's `now`
//!   without touching stored state
//!
//! Both are O(n log n) over at most `capacity` entries.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ember_core::constants::BOARD_CAPACITY;
use ember_core::error::StoreError;
use ember_core::traits::DecayCalculator;
use ember_core::types::{Amount, Entry, MessageId, Timestamp};

/// Position of an entry in the ranking at some instant.
///
/// Orders "better" keys first: higher effective value, then earlier
/// submission, then earlier admission sequence. The greatest key is the
/// lowest-ranked entry, the one evicted first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankKey {
    pub value: Amount,
    pub submitted_at: Timestamp,
    pub seq: u64,
}

impl RankKey {
    /// Key for `entry` with its bid decayed to `now`.
    pub fn at(entry: &Entry, now: Timestamp, decay: &dyn DecayCalculator) -> Self {
        Self {
            value: decay.effective_value(entry.raw_bid, entry.submitted_at, now),
            submitted_at: entry.submitted_at,
            seq: entry.seq,
        }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .cmp(&self.value)
            .then_with(|| self.submitted_at.cmp(&other.submitted_at))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An entry with its rank and effective value at a given instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based position; 1 is the top of the board.
    pub rank: usize,
    /// Bid after decay at the snapshot instant.
    pub effective_value: Amount,
    pub entry: Entry,
}

/// Bounded collection of entries ordered by decayed bid.
///
/// Not thread-safe: callers wrap it (via [`Board`](crate::Board)) in a lock
/// when shared.
#[derive(Debug, Clone)]
pub struct RankedStore {
    /// Primary storage: id → entry.
    entries: HashMap<MessageId, Entry>,
    /// Every id ever inserted, including evicted ones.
    seen: HashSet<MessageId>,
    /// Ranking as of the last mutation, best first.
    order: Vec<MessageId>,
    capacity: usize,
}

impl RankedStore {
    /// Create an empty store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            seen: HashSet::new(),
            order: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Create an empty store with the board's standard capacity.
    pub fn with_defaults() -> Self {
        Self::new(BOARD_CAPACITY)
    }

    /// Rebuild a store from persisted parts.
    ///
    /// `seen` may omit ids of `entries`; they are added. Fails if `entries`
    /// exceeds `capacity` or repeats an id.
    pub fn from_parts(
        capacity: usize,
        entries: Vec<Entry>,
        seen: impl IntoIterator<Item = MessageId>,
        now: Timestamp,
        decay: &dyn DecayCalculator,
    ) -> Result<Self, StoreError> {
        if entries.len() > capacity {
            return Err(StoreError::OverCapacitySnapshot {
                entries: entries.len(),
                capacity,
            });
        }
        let mut store = Self::new(capacity);
        store.seen.extend(seen);
        for entry in entries {
            if store.entries.contains_key(&entry.id) {
                return Err(StoreError::DuplicateId(entry.id));
            }
            store.seen.insert(entry.id);
            store.entries.insert(entry.id, entry);
        }
        store.reorder(now, decay);
        Ok(store)
    }

    /// Insert a new entry and reposition the ranking at `now`.
    ///
    /// Returns the entry's 1-based rank at `now`. Fails if the id was ever
    /// inserted before or the store is full.
    pub fn insert(
        &mut self,
        entry: Entry,
        now: Timestamp,
        decay: &dyn DecayCalculator,
    ) -> Result<usize, StoreError> {
        if self.is_known(&entry.id) {
            return Err(StoreError::DuplicateId(entry.id));
        }
        if self.is_full() {
            return Err(StoreError::CapacityExceeded(self.capacity));
        }

        let id = entry.id;
        self.seen.insert(id);
        self.entries.insert(id, entry);
        self.reorder(now, decay);

        self.order
            .iter()
            .position(|other| *other == id)
            .map(|index| index + 1)
            .ok_or(StoreError::NotFound(id))
    }

    /// Remove and return the lowest-ranked entry at `now`.
    ///
    /// The id stays reserved. Fails with
    /// [`StoreError::EmptyStoreEviction`] on an empty store.
    pub fn evict_lowest(
        &mut self,
        now: Timestamp,
        decay: &dyn DecayCalculator,
    ) -> Result<Entry, StoreError> {
        let id = self
            .lowest(now, decay)
            .map(|(entry, _)| entry.id)
            .ok_or(StoreError::EmptyStoreEviction)?;
        let entry = self.entries.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.reorder(now, decay);
        Ok(entry)
    }

    /// The lowest-ranked entry at `now` and its effective value.
    pub fn lowest(&self, now: Timestamp, decay: &dyn DecayCalculator) -> Option<(&Entry, Amount)> {
        self.entries
            .values()
            .map(|entry| (entry, RankKey::at(entry, now, decay)))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(entry, key)| (entry, key.value))
    }

    /// All entries ranked at `now`, best first.
    ///
    /// Values are recomputed on every call; stored order is not modified.
    pub fn snapshot(&self, now: Timestamp, decay: &dyn DecayCalculator) -> Vec<RankedEntry> {
        let mut keyed: Vec<(RankKey, &Entry)> = self
            .entries
            .values()
            .map(|entry| (RankKey::at(entry, now, decay), entry))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

        keyed
            .into_iter()
            .enumerate()
            .map(|(index, (key, entry))| RankedEntry {
                rank: index + 1,
                effective_value: key.value,
                entry: entry.clone(),
            })
            .collect()
    }

    /// Recompute the stored order at `now`.
    fn reorder(&mut self, now: Timestamp, decay: &dyn DecayCalculator) {
        let mut keyed: Vec<(RankKey, MessageId)> = self
            .entries
            .values()
            .map(|entry| (RankKey::at(entry, now, decay), entry.id))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
        self.order = keyed.into_iter().map(|(_, id)| id).collect();
    }

    /// Ranking as of the last mutation, best first. May be stale relative to
    /// the current time; use [`snapshot`](Self::snapshot) for reads.
    pub fn order(&self) -> &[MessageId] {
        &self.order
    }

    /// Whether the id belongs to a current entry.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether the id was ever inserted, current or evicted.
    pub fn is_known(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Get a current entry by id.
    pub fn get(&self, id: &MessageId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Number of current entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of ids ever inserted.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Iterate over current entries (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Iterate over every id ever inserted (arbitrary order).
    pub fn seen_ids(&self) -> impl Iterator<Item = &MessageId> {
        self.seen.iter()
    }
}
