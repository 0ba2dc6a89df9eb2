//! Board node composition.
//!
//! The [`Node`] wires the in-memory [`Board`] to RocksDB storage, a clock,
//! and an event channel. Mutations are serialized under the board's write
//! lock and persisted before the in-memory board changes, so a storage
//! failure leaves both sides untouched.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use ember_board::{Admission, Board, BoardEvent, RankedEntry};
use ember_core::constants::{BOARD_CAPACITY, EVENT_CHANNEL_CAPACITY};
use ember_core::error::{EmberError, RefundError};
use ember_core::traits::{Clock, DecayCalculator, SystemClock};
use ember_core::types::{Amount, Entry, MessageId, Sender, Submission, Timestamp};
use ember_decay::HalvingEngine;

use crate::config::NodeConfig;
use crate::storage::RocksStore;

/// Aggregate board figures reported by `getinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    pub count: usize,
    pub capacity: usize,
    pub minimum_bid: Amount,
    pub half_life_secs: u64,
    pub now: Timestamp,
    pub total_refunds_owed: Amount,
    pub next_seq: u64,
}

/// A running board: storage, ranked state, clock, and event fan-out.
pub struct Node {
    /// RocksDB storage. Written only while the board write lock is held.
    storage: RocksStore,
    /// In-memory board rebuilt from storage on open.
    board: RwLock<Board>,
    /// Source of "now" for admission and decay.
    clock: Arc<dyn Clock>,
    /// Fan-out of applied mutations to subscribers.
    events: broadcast::Sender<BoardEvent>,
    /// Node configuration.
    config: NodeConfig,
}

impl Node {
    /// Open the node's storage and rebuild the board using the system clock.
    pub fn open(config: NodeConfig) -> Result<Arc<Self>, EmberError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open the node with an explicit clock.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, EmberError> {
        let storage = RocksStore::open(config.db_path())?;
        let decay: Arc<dyn DecayCalculator> =
            Arc::new(HalvingEngine::with_half_life(config.half_life_secs)?);

        let snapshot = storage.load_snapshot()?;
        let restored = snapshot.entries.len();
        let board = Board::from_snapshot(decay, BOARD_CAPACITY, snapshot, clock.now())?;

        info!(
            entries = restored,
            seen = board.store().seen_count(),
            next_seq = board.next_seq(),
            path = %config.db_path().display(),
            "board restored from storage"
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Arc::new(Self {
            storage,
            board: RwLock::new(board),
            clock,
            events,
            config,
        }))
    }

    /// Submit an entry.
    ///
    /// Evaluates against the current board, persists the outcome atomically,
    /// then applies it in memory and publishes the resulting events.
    pub fn submit(&self, submission: &Submission) -> Result<Admission, EmberError> {
        let admission = {
            let mut board = self.board.write();
            // Read under the lock so admission times follow seq order.
            let now = self.clock.now();
            let admission = match board.evaluate(submission, now) {
                Ok(admission) => admission,
                Err(e) => {
                    debug!(id = %submission.id, sender = %submission.sender, reason = %e, "submission rejected");
                    return Err(e.into());
                }
            };
            self.storage.persist_admission(&admission)?;
            board.commit(&admission)?;
            admission
        };

        info!(
            id = %admission.entry.id,
            sender = %admission.entry.sender,
            raw_bid = %admission.entry.raw_bid,
            rank = admission.rank,
            evicted = ?admission.evicted.as_ref().map(|e| e.id.to_string()),
            "entry admitted"
        );

        for event in admission.events() {
            self.publish(event);
        }
        Ok(admission)
    }

    /// Withdraw everything owed to `sender`.
    pub fn withdraw(&self, sender: &Sender) -> Result<Amount, EmberError> {
        let amount = {
            let mut board = self.board.write();
            if board.pending_refund(sender) == 0 {
                return Err(RefundError::NothingOwed(*sender).into());
            }
            self.storage.persist_withdrawal(sender)?;
            board.withdraw(sender)?
        };

        info!(%sender, amount = %amount, "refund withdrawn");
        self.publish(BoardEvent::RefundWithdrawn {
            sender: *sender,
            amount,
        });
        Ok(amount)
    }

    // --- Queries ---

    /// Current entries, best first.
    pub fn list_top(&self) -> Vec<RankedEntry> {
        let now = self.clock.now();
        self.board.read().list_top(now)
    }

    /// Number of entries currently held.
    pub fn count(&self) -> usize {
        self.board.read().count()
    }

    /// Smallest bid that would currently be admitted.
    pub fn minimum_qualifying_bid(&self) -> Amount {
        let now = self.clock.now();
        self.board.read().minimum_qualifying_bid(now)
    }

    /// A live entry with its current effective value.
    pub fn get_entry(&self, id: &MessageId) -> Option<RankedEntry> {
        let now = self.clock.now();
        self.board
            .read()
            .list_top(now)
            .into_iter()
            .find(|ranked| ranked.entry.id == *id)
    }

    /// Raw stored entry, without ranking.
    pub fn entry(&self, id: &MessageId) -> Option<Entry> {
        self.board.read().get(id).cloned()
    }

    /// Refund balance owed to `sender`.
    pub fn pending_refund(&self, sender: &Sender) -> Amount {
        self.board.read().pending_refund(sender)
    }

    /// Aggregate figures for the board.
    pub fn info(&self) -> BoardInfo {
        let now = self.clock.now();
        let board = self.board.read();
        BoardInfo {
            count: board.count(),
            capacity: board.capacity(),
            minimum_bid: board.minimum_qualifying_bid(now),
            half_life_secs: board.decay().half_life_secs(),
            now,
            total_refunds_owed: board.total_refunds_owed(),
            next_seq: board.next_seq(),
        }
    }

    /// Subscribe to events for mutations applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Current time as seen by this node.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn publish(&self, event: BoardEvent) {
        if self.events.send(event).is_err() {
            debug!("no event subscribers");
        }
    }
}
