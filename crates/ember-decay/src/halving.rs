//! Repeated integer halving with a hard period cap.

use ember_core::constants::MAX_HALVINGS;
use ember_core::types::Amount;

/// Halve `value` `periods` times, flooring at every step.
///
/// `k` successive floor divisions by two equal a right shift by `k`, which is
/// what this computes. Any `periods >= MAX_HALVINGS` yields zero.
pub fn halve(value: Amount, periods: u64) -> Amount {
    if periods >= u64::from(MAX_HALVINGS) {
        return 0;
    }
    // periods < 128 here, so the cast and shift are exact.
    value >> periods as u32
}
