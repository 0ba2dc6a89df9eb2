//! # ember-board: Ranked store and admission engine.
//!
//! The board holds at most `BOARD_CAPACITY` entries ranked by decayed bid:
//! - [`RankedStore`] owns entries, remembers every id ever admitted, and
//!   recomputes order at mutation time and on every read
//! - [`Board`] admits submissions (validate, compare against the qualifying
//!   minimum, evict the lowest) and answers queries
//! - [`RefundLedger`] records what evicted senders may withdraw; eviction
//!   never transfers funds inline
//! - [`BoardEvent`] describes each applied mutation

pub mod board;
pub mod events;
pub mod refunds;
pub mod store;

pub use board::{Admission, Board, BoardSnapshot};
pub use events::BoardEvent;
pub use refunds::RefundLedger;
pub use store::{RankKey, RankedEntry, RankedStore};
