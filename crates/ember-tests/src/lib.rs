//! Adversarial and end-to-end test suite for the Ember board.
//!
//! Integration tests in this crate try to break the board's invariants
//! under randomized submission streams and drive a full node through its
//! storage, event, and RPC layers.

pub mod helpers;
