//! Error types for shared value types.

use thiserror::Error;

/// Errors raised while building currency values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Not a three-letter alphabetic code.
    #[error("Invalid currency code: {0:?}")]
    InvalidCode(String),
}
