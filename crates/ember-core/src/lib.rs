//! # ember-core
//! Foundation types and traits for the Ember message board.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod validation;
