//! # ember-decay: Half-life bid decay engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! A bid's effective value halves once per elapsed half-life period:
//! - **Whole periods**: `floor((now - submitted_at) / half_life)`; partial
//!   periods do not decay, and a `now` before submission counts as zero.
//! - **Integer halving**: each period is a floor division by two, so the
//!   result is `raw_bid >> periods`, reproducible across implementations.
//! - **Bounded**: after `MAX_HALVINGS` periods every amount is exactly zero,
//!   so evaluation cost does not grow with age.

pub mod engine;
pub mod halving;

pub use engine::HalvingEngine;
pub use halving::halve;
