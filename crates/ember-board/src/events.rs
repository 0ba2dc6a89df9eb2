//! Notifications emitted by successful board mutations.

use ember_core::types::{Amount, MessageId, Sender, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    /// A submission was admitted at `rank`.
    Admitted {
        id: MessageId,
        sender: Sender,
        raw_bid: Amount,
        submitted_at: Timestamp,
        rank: usize,
    },
    /// An entry lost its seat; `refund` is now withdrawable by `sender`.
    Evicted {
        id: MessageId,
        sender: Sender,
        refund: Amount,
    },
    /// `sender` withdrew `amount` of owed refunds.
    RefundWithdrawn { sender: Sender, amount: Amount },
}

impl BoardEvent {
    /// Short machine-readable event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Admitted { .. } => "admitted",
            Self::Evicted { .. } => "evicted",
            Self::RefundWithdrawn { .. } => "refund_withdrawn",
        }
    }
}
