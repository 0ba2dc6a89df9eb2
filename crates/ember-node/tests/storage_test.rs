//! Storage tests driven through the board, checking that what RocksDB holds
//! rebuilds the same board.

use std::sync::Arc;

use ember_board::Board;
use ember_core::constants::{BOARD_CAPACITY, HALF_LIFE_SECS};
use ember_core::types::{Amount, MessageId, Sender, Submission};
use ember_decay::HalvingEngine;
use ember_node_lib::storage::RocksStore;

fn sub(i: u16, sender: u8, raw_bid: Amount) -> Submission {
    Submission::new(
        format!("post {i}"),
        MessageId::derive("storage", &i.to_le_bytes()),
        Sender([sender; 20]),
        raw_bid,
    )
}

fn board() -> Board {
    Board::new(Arc::new(HalvingEngine::new()))
}

#[test]
fn persisted_admissions_rebuild_identical_board() {
    let dir = tempfile::tempdir().unwrap();
    let store = RocksStore::open(dir.path().join("boarddata")).unwrap();
    let mut live = board();

    // Overfill so that evictions and refunds are exercised.
    for i in 0..(BOARD_CAPACITY as u16 + 25) {
        let now = u64::from(i) * 3_600;
        let admission = match live.evaluate(&sub(i, (i % 7) as u8, 1_000 + Amount::from(i) * 10), now) {
            Ok(a) => a,
            Err(_) => continue,
        };
        store.persist_admission(&admission).unwrap();
        live.commit(&admission).unwrap();
    }

    let now = 200 * 3_600;
    let restored = Board::from_snapshot(
        Arc::new(HalvingEngine::new()),
        BOARD_CAPACITY,
        store.load_snapshot().unwrap(),
        now,
    )
    .unwrap();

    assert_eq!(restored.count(), live.count());
    assert_eq!(restored.list_top(now), live.list_top(now));
    assert_eq!(restored.next_seq(), live.next_seq());
    assert_eq!(restored.total_refunds_owed(), live.total_refunds_owed());
    for s in 0..7u8 {
        let sender = Sender([s; 20]);
        assert_eq!(restored.pending_refund(&sender), live.pending_refund(&sender));
    }
}

#[test]
fn evicted_ids_stay_rejected_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boarddata");
    let mut live = board();
    let evicted_id;
    {
        let store = RocksStore::open(&path).unwrap();
        for i in 0..BOARD_CAPACITY as u16 {
            let admission = live.evaluate(&sub(i, 1, 100 + Amount::from(i)), 0).unwrap();
            store.persist_admission(&admission).unwrap();
            live.commit(&admission).unwrap();
        }
        let admission = live.evaluate(&sub(9_999, 2, 10_000), 0).unwrap();
        evicted_id = admission.evicted.as_ref().unwrap().id;
        store.persist_admission(&admission).unwrap();
        live.commit(&admission).unwrap();
    }

    let store = RocksStore::open(&path).unwrap();
    let restored = Board::from_snapshot(
        Arc::new(HalvingEngine::new()),
        BOARD_CAPACITY,
        store.load_snapshot().unwrap(),
        HALF_LIFE_SECS,
    )
    .unwrap();

    assert!(restored.get(&evicted_id).is_none());
    assert!(restored.is_known(&evicted_id));
    assert_eq!(restored.pending_refund(&Sender([1; 20])), 100);
}
