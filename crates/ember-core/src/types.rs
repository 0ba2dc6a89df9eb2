//! Core board types: message identifiers, sender addresses, entries.
//!
//! All monetary values are [`Amount`] base units; all timestamps are Unix
//! seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MESSAGE_ID_LEN, SENDER_LEN};
use crate::error::ParseError;

/// Monetary amount in base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Decode a hex string (optional `0x` prefix) into a fixed-size byte array.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseError::InvalidLength { expected: N, got })
}

/// A 32-byte message identifier.
///
/// Unique across every entry the board has ever admitted, including evicted
/// ones.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct MessageId(pub [u8; MESSAGE_ID_LEN]);

impl MessageId {
    /// The all-zero identifier.
    pub const ZERO: Self = Self([0u8; MESSAGE_ID_LEN]);

    /// Create a MessageId from a byte array.
    pub fn from_bytes(bytes: [u8; MESSAGE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; MESSAGE_ID_LEN] {
        &self.0
    }

    /// Derive an identifier from message content and a caller-chosen nonce.
    ///
    /// `BLAKE3(content || nonce)`. Callers pick a nonce (a timestamp, a
    /// counter, their address) so that identical texts still get distinct ids.
    pub fn derive(content: &str, nonce: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content.as_bytes());
        hasher.update(nonce);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for MessageId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed(s).map(Self)
    }
}

impl From<[u8; MESSAGE_ID_LEN]> for MessageId {
    fn from(bytes: [u8; MESSAGE_ID_LEN]) -> Self {
        Self(bytes)
    }
}

/// A 20-byte account address identifying the submitter of an entry.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Sender(pub [u8; SENDER_LEN]);

impl Sender {
    pub fn as_bytes(&self) -> &[u8; SENDER_LEN] {
        &self.0
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Sender {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed(s).map(Self)
    }
}

/// One ranked message.
///
/// `raw_bid` and `submitted_at` are fixed at admission and never change;
/// only membership in the board does.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Entry {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message text, at most `MAX_CONTENT_LEN` characters.
    pub content: String,
    /// Address that paid for the entry.
    pub sender: Sender,
    /// Amount attached at submission, in base units.
    pub raw_bid: Amount,
    /// Admission time (Unix seconds).
    pub submitted_at: Timestamp,
    /// Admission sequence number. Orders entries that tie on both effective
    /// value and `submitted_at`.
    pub seq: u64,
}

/// A submission as received from a caller, before admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub content: String,
    pub id: MessageId,
    pub sender: Sender,
    pub raw_bid: Amount,
}

impl Submission {
    pub fn new(content: impl Into<String>, id: MessageId, sender: Sender, raw_bid: Amount) -> Self {
        Self {
            content: content.into(),
            id,
            sender,
            raw_bid,
        }
    }
}
