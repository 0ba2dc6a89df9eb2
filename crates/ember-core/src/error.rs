//! Error types for the Ember board.
use thiserror::Error;

use crate::types::{Amount, MessageId, Sender};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("content is empty")] Empty,
    #[error("content too long: {len} > {max}")] TooLong { len: usize, max: usize },
}

/// Reasons a submission is rejected. Every rejection leaves the board untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("invalid content: {0}")] InvalidContent(#[from] ContentError),
    #[error("duplicate id: {0}")] DuplicateId(MessageId),
    #[error("bid too low: {bid} does not exceed {minimum}")] BidTooLow { bid: Amount, minimum: Amount },
    #[error("refund balance overflow for {0}")] RefundOverflow(Sender),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate id: {0}")] DuplicateId(MessageId),
    #[error("eviction attempted on an empty store")] EmptyStoreEviction,
    #[error("store at capacity: {0}")] CapacityExceeded(usize),
    #[error("entry not found: {0}")] NotFound(MessageId),
    #[error("admission is stale: lowest entry is no longer {0}")] StaleAdmission(MessageId),
    #[error("admission is stale: expected seq {expected}, got {found}")] StaleSequence { expected: u64, found: u64 },
    #[error("snapshot lists {entries} entries for capacity {capacity}")] OverCapacitySnapshot { entries: usize, capacity: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefundError {
    #[error("nothing owed to {0}")] NothingOwed(Sender),
    #[error("refund balance overflow for {0}")] Overflow(Sender),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("half-life must be non-zero")] ZeroHalfLife,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: expected {expected} bytes, got {got}")] InvalidLength { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum EmberError {
    #[error(transparent)] Submit(#[from] SubmitError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Refund(#[from] RefundError),
    #[error(transparent)] Decay(#[from] DecayError),
    #[error(transparent)] Parse(#[from] ParseError),
    #[error("storage: {0}")] Storage(String),
}
