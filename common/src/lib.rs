//! Ratechain Common Types
//!
//! Value types shared across the ratechain workspace: currency codes,
//! currency pairs and the calendar helpers used by rate lookups.

pub mod currency;
pub mod error;
pub mod time;

pub use currency::*;
pub use error::*;
pub use time::*;
