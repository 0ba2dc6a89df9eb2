//! Criterion benchmarks for ember-board.
//!
//! Covers: admission against a full board, read snapshot, qualifying minimum.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use ember_board::Board;
use ember_core::constants::{BOARD_CAPACITY, HALF_LIFE_SECS};
use ember_core::types::{MessageId, Sender, Submission};
use ember_decay::HalvingEngine;

fn full_board() -> Board {
    let mut board = Board::new(Arc::new(HalvingEngine::new()));
    for seed in 0..BOARD_CAPACITY as u64 {
        let sub = Submission::new(
            format!("entry {seed}"),
            MessageId::derive("bench", &seed.to_le_bytes()),
            Sender([seed as u8; 20]),
            1_000 + u128::from(seed),
        );
        let _ = board.submit(&sub, seed * 600);
    }
    board
}

fn bench_admission(c: &mut Criterion) {
    let now = 2 * HALF_LIFE_SECS;
    let challenger = Submission::new("challenger", MessageId([0xCC; 32]), Sender([0xCC; 20]), 5_000);

    c.bench_function("submit_evicting", |b| {
        b.iter_batched(
            full_board,
            |mut board| board.submit(black_box(&challenger), black_box(now)),
            BatchSize::SmallInput,
        )
    });
}

fn bench_list_top(c: &mut Criterion) {
    let board = full_board();
    let now = 3 * HALF_LIFE_SECS;

    c.bench_function("list_top", |b| b.iter(|| board.list_top(black_box(now))));
}

fn bench_minimum_bid(c: &mut Criterion) {
    let board = full_board();
    let now = 3 * HALF_LIFE_SECS;

    c.bench_function("minimum_qualifying_bid", |b| {
        b.iter(|| board.minimum_qualifying_bid(black_box(now)))
    });
}

criterion_group!(benches, bench_admission, bench_list_top, bench_minimum_bid);
criterion_main!(benches);
