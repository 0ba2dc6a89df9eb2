//! Trait interfaces for the Ember board.
//!
//! - [`DecayCalculator`]: bid decay math (ember-decay implements)
//! - [`Clock`]: source of `now` for the node; the engine itself never reads a clock

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{Amount, Timestamp};

/// Pure computation of effective (decayed) bid values.
///
/// Implementations must be deterministic: the same three inputs always give
/// the same output, with integer arithmetic only.
pub trait DecayCalculator: Send + Sync {
    /// Seconds per halving period.
    fn half_life_secs(&self) -> u64;

    /// Whole halving periods elapsed between `submitted_at` and `now`.
    ///
    /// A `now` earlier than `submitted_at` counts as zero elapsed periods.
    fn halvings(&self, submitted_at: Timestamp, now: Timestamp) -> u64 {
        now.saturating_sub(submitted_at) / self.half_life_secs()
    }

    /// Effective value of `raw_bid` at `now`.
    fn effective_value(&self, raw_bid: Amount, submitted_at: Timestamp, now: Timestamp) -> Amount;

    /// Amount lost to decay so far.
    ///
    /// Default implementation: `raw_bid - effective_value(...)`.
    fn decayed_amount(&self, raw_bid: Amount, submitted_at: Timestamp, now: Timestamp) -> Amount {
        raw_bid.saturating_sub(self.effective_value(raw_bid, submitted_at, now))
    }
}

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch clocks clamp to zero.
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(secs)));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Halving;

    impl DecayCalculator for Halving {
        fn half_life_secs(&self) -> u64 {
            10
        }

        fn effective_value(&self, raw_bid: Amount, submitted_at: Timestamp, now: Timestamp) -> Amount {
            raw_bid >> self.halvings(submitted_at, now).min(127)
        }
    }

    #[test]
    fn halvings_floor_elapsed_periods() {
        let d = Halving;
        assert_eq!(d.halvings(100, 100), 0);
        assert_eq!(d.halvings(100, 109), 0);
        assert_eq!(d.halvings(100, 110), 1);
        assert_eq!(d.halvings(100, 135), 3);
    }

    #[test]
    fn halvings_clamp_clock_skew() {
        assert_eq!(Halving.halvings(100, 50), 0);
    }

    #[test]
    fn decayed_amount_default() {
        let d = Halving;
        assert_eq!(d.decayed_amount(100, 0, 10), 50);
        assert_eq!(d.decayed_amount(100, 0, 0), 0);
    }

    #[test]
    fn calculator_is_object_safe() {
        let d: &dyn DecayCalculator = &Halving;
        assert_eq!(d.effective_value(8, 0, 20), 2);
    }

    #[test]
    fn fixed_clock_set_and_advance() {
        let clock = FixedClock::new(5);
        assert_eq!(clock.now(), 5);
        clock.advance(10);
        assert_eq!(clock.now(), 15);
        clock.set(u64::MAX - 1);
        clock.advance(10);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
