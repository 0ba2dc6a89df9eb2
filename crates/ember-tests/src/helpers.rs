//! Shared test helpers for E2E and integration tests.

use std::sync::Arc;

use ember_board::Board;
use ember_core::constants::BOARD_CAPACITY;
use ember_core::traits::FixedClock;
use ember_core::types::{Amount, MessageId, Sender, Submission, Timestamp};
use ember_decay::HalvingEngine;
use ember_node_lib::config::NodeConfig;
use ember_node_lib::node::Node;

/// Simple sender address from a seed byte.
pub fn sender(seed: u8) -> Sender {
    Sender([seed; 20])
}

/// Deterministic message id from a tag and counter.
pub fn message_id(tag: &str, n: u64) -> MessageId {
    MessageId::derive(tag, &n.to_le_bytes())
}

/// A valid submission with content and id derived from `n`.
pub fn submission(n: u64, from: Sender, raw_bid: Amount) -> Submission {
    Submission::new(format!("message #{n}"), message_id("helpers", n), from, raw_bid)
}

/// An in-memory board with the standard one-day half-life.
pub fn board() -> Board {
    Board::new(Arc::new(HalvingEngine::new()))
}

/// Submit `BOARD_CAPACITY` entries at `now`, each bidding `raw_bid`.
///
/// Entries are numbered from `first`; the sender is `sender(0x10)`.
pub fn fill_board(board: &mut Board, first: u64, raw_bid: Amount, now: Timestamp) {
    for n in first..first + BOARD_CAPACITY as u64 {
        board
            .submit(&submission(n, sender(0x10), raw_bid), now)
            .unwrap();
    }
}

/// Create a node backed by a temp directory with a settable clock.
pub fn test_node(now: Timestamp) -> (Arc<Node>, Arc<FixedClock>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(now));
    let node = Node::with_clock(node_config(&dir), clock.clone()).unwrap();
    (node, clock, dir)
}

/// Node configuration rooted at `dir`.
pub fn node_config(dir: &tempfile::TempDir) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().to_path_buf(),
        ..NodeConfig::default()
    }
}

/// Submit `BOARD_CAPACITY` entries through `node`, each bidding `raw_bid`.
pub fn fill_node(node: &Node, first: u64, raw_bid: Amount) {
    for n in first..first + BOARD_CAPACITY as u64 {
        node.submit(&submission(n, sender(0x10), raw_bid)).unwrap();
    }
}
