//! FX engine error types.

use ratechain_common::{CurrencyCode, CurrencyError, CurrencyPair};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the FX engine.
///
/// A missing rate is not an error: lookups return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum FxError {
    /// A provider name that is not registered was requested.
    #[error("Unsupported conversion/rate provider: {0}")]
    UnsupportedProvider(String),

    /// No default provider chain entry is currently registered.
    #[error("No default provider chain available")]
    NoDefaultChain,

    /// Two engines report the same provider name.
    #[error("Duplicate rate provider: {0}")]
    DuplicateProvider(String),

    /// A provider factory failed while (re)building the registry.
    #[error("Failed to construct rate provider {name}: {reason}")]
    ProviderConstruction { name: String, reason: String },

    /// Configuration value rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot source currency differs from the store's base currency.
    #[error("Base currency mismatch: store holds {expected}, snapshot is based on {actual}")]
    BaseCurrencyMismatch {
        expected: CurrencyCode,
        actual: CurrencyCode,
    },

    /// Upstream quote source reported a failure.
    #[error("Error [{code}]: {info}")]
    UpstreamFailure { code: i64, info: String },

    /// Payload could not be decoded into a snapshot.
    #[error("Malformed rate payload: {0}")]
    MalformedPayload(String),

    /// Rate factors must be strictly positive.
    #[error("Non-positive rate factor {factor} for {pair}")]
    NonPositiveFactor { pair: CurrencyPair, factor: Decimal },

    /// Triangulation through the base currency failed on one of its legs.
    #[error("Cannot convert {base} to {term}: no rate path through the base currency")]
    ConversionFailed {
        base: CurrencyCode,
        term: CurrencyCode,
    },

    /// Decimal arithmetic overflowed while deriving a rate.
    #[error("Arithmetic overflow deriving rate for {0}")]
    ArithmeticOverflow(CurrencyPair),

    /// The ingestion task is no longer running.
    #[error("Snapshot ingestion channel closed")]
    IngestionClosed,

    /// A snapshot source failed to deliver a payload.
    #[error("Snapshot source error: {0}")]
    Source(String),

    /// Currency code could not be parsed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Broad classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Provider setup or selection is wrong; fix the configuration.
    Configuration,
    /// Incoming data is inconsistent or reported as failed upstream.
    DataIntegrity,
    /// A rate could not be derived.
    Conversion,
    /// Ingestion plumbing failed.
    Ingestion,
}

impl FxError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FxError::UnsupportedProvider(_)
            | FxError::NoDefaultChain
            | FxError::DuplicateProvider(_)
            | FxError::ProviderConstruction { .. }
            | FxError::InvalidConfig(_) => ErrorCategory::Configuration,
            FxError::BaseCurrencyMismatch { .. }
            | FxError::UpstreamFailure { .. }
            | FxError::MalformedPayload(_)
            | FxError::NonPositiveFactor { .. }
            | FxError::Currency(_) => ErrorCategory::DataIntegrity,
            FxError::ConversionFailed { .. } | FxError::ArithmeticOverflow(_) => {
                ErrorCategory::Conversion
            }
            FxError::IngestionClosed | FxError::Source(_) => ErrorCategory::Ingestion,
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            FxError::NoDefaultChain => "NO_DEFAULT_CHAIN",
            FxError::DuplicateProvider(_) => "DUPLICATE_PROVIDER",
            FxError::ProviderConstruction { .. } => "PROVIDER_CONSTRUCTION",
            FxError::InvalidConfig(_) => "INVALID_CONFIG",
            FxError::BaseCurrencyMismatch { .. } => "BASE_CURRENCY_MISMATCH",
            FxError::UpstreamFailure { .. } => "UPSTREAM_FAILURE",
            FxError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            FxError::NonPositiveFactor { .. } => "NON_POSITIVE_FACTOR",
            FxError::ConversionFailed { .. } => "CONVERSION_FAILED",
            FxError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            FxError::IngestionClosed => "INGESTION_CLOSED",
            FxError::Source(_) => "SOURCE_ERROR",
            FxError::Currency(_) => "INVALID_CURRENCY",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
