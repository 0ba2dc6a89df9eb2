//! Decay engine implementing the [`DecayCalculator`] trait.
//!
//! Effective value is the raw bid halved once per whole elapsed half-life.
//! The engine holds no state besides its period length.

use ember_core::constants::HALF_LIFE_SECS;
use ember_core::error::DecayError;
use ember_core::traits::DecayCalculator;
use ember_core::types::{Amount, Timestamp};

use crate::halving::halve;

/// The production decay calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalvingEngine {
    half_life_secs: u64,
}

impl HalvingEngine {
    /// Create an engine with the standard 24-hour half-life.
    pub fn new() -> Self {
        Self {
            half_life_secs: HALF_LIFE_SECS,
        }
    }

    /// Create an engine with a custom half-life, for development boards
    /// where waiting a day per halving is impractical.
    pub fn with_half_life(half_life_secs: u64) -> Result<Self, DecayError> {
        if half_life_secs == 0 {
            return Err(DecayError::ZeroHalfLife);
        }
        Ok(Self { half_life_secs })
    }
}

impl Default for HalvingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecayCalculator for HalvingEngine {
    fn half_life_secs(&self) -> u64 {
        self.half_life_secs
    }

    fn effective_value(&self, raw_bid: Amount, submitted_at: Timestamp, now: Timestamp) -> Amount {
        halve(raw_bid, self.halvings(submitted_at, now))
    }
}
