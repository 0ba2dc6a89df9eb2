//! Board constants. All monetary values are in base units (the smallest
//! indivisible unit of the attached currency).

use crate::types::Amount;

/// Maximum number of entries the board holds at any instant.
pub const BOARD_CAPACITY: usize = 100;

/// Maximum message length, counted in Unicode scalar values.
pub const MAX_CONTENT_LEN: usize = 280;

/// Seconds after which a bid's effective value halves.
pub const HALF_LIFE_SECS: u64 = 86_400;

/// Halvings after which any amount is exactly zero.
///
/// Equal to the bit width of [`Amount`]: shifting by this many bits clears
/// every representable value.
pub const MAX_HALVINGS: u32 = Amount::BITS;

/// Default TCP port for the JSON-RPC server.
pub const DEFAULT_RPC_PORT: u16 = 18_645;

/// Capacity of the node's event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Length in bytes of a [`MessageId`](crate::types::MessageId).
pub const MESSAGE_ID_LEN: usize = 32;

/// Length in bytes of a [`Sender`](crate::types::Sender) address.
pub const SENDER_LEN: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_halvings_clears_every_amount() {
        assert_eq!(u128::MAX.checked_shr(MAX_HALVINGS), None);
        assert_eq!(u128::MAX >> (MAX_HALVINGS - 1), 1);
    }

    #[test]
    fn half_life_is_one_day() {
        assert_eq!(HALF_LIFE_SECS, 24 * 60 * 60);
    }
}
