//! Rate snapshots and decoding of upstream quote payloads.

use chrono::NaiveDate;
use ratechain_common::{date_from_epoch, CurrencyCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// One atomic batch of quotes for a single source currency and date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Currency every quote is expressed against.
    pub source: CurrencyCode,
    /// Date the quotes apply to.
    pub as_of: NaiveDate,
    /// Factor per term currency.
    pub quotes: BTreeMap<CurrencyCode, Decimal>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new(source: CurrencyCode, as_of: NaiveDate) -> Self {
        Self {
            source,
            as_of,
            quotes: BTreeMap::new(),
        }
    }

    /// Add a quote, replacing any previous factor for the same term.
    pub fn with_quote(mut self, term: CurrencyCode, factor: Decimal) -> Self {
        self.quotes.insert(term, factor);
        self
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Decode an upstream JSON payload.
    ///
    /// Accepts the live-quotes shape
    /// `{"success": true, "timestamp": <epoch secs>, "source": "USD", "quotes": {"USDEUR": 0.9}}`.
    /// A payload flagged as failed is rejected with the upstream code and
    /// message. Individual quotes with an unusable key or value are skipped.
    pub fn from_json(payload: &str) -> FxResult<Self> {
        let payload: QuotePayload = serde_json::from_str(payload)
            .map_err(|e| FxError::MalformedPayload(e.to_string()))?;
        payload.into_snapshot()
    }
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    #[serde(default)]
    success: bool,
    source: Option<String>,
    timestamp: Option<i64>,
    #[serde(default)]
    quotes: BTreeMap<String, serde_json::Value>,
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    info: Option<String>,
}

impl QuotePayload {
    fn into_snapshot(self) -> FxResult<Snapshot> {
        if !self.success {
            let (code, info) = match self.error {
                Some(error) => (
                    error.code,
                    error.info.unwrap_or_else(|| "unknown error".to_string()),
                ),
                None => (0, "unknown error".to_string()),
            };
            return Err(FxError::UpstreamFailure { code, info });
        }

        let source = self
            .source
            .ok_or_else(|| FxError::MalformedPayload("missing source currency".to_string()))?;
        let source = CurrencyCode::new(&source)
            .map_err(|e| FxError::MalformedPayload(e.to_string()))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| FxError::MalformedPayload("missing timestamp".to_string()))?;
        let as_of = date_from_epoch(timestamp).ok_or_else(|| {
            FxError::MalformedPayload(format!("timestamp out of range: {}", timestamp))
        })?;

        let mut snapshot = Snapshot::new(source, as_of);
        for (key, value) in self.quotes {
            let Some(term) = parse_term(&snapshot.source, &key) else {
                debug!(key = %key, "Unknown currency in quote key, skipping");
                continue;
            };
            let Some(factor) = parse_factor(&value) else {
                debug!(key = %key, value = %value, "Unusable quote factor, skipping");
                continue;
            };
            snapshot.quotes.insert(term, factor);
        }

        Ok(snapshot)
    }
}

/// Term currency of a `<SOURCE><TERM>` quote key.
fn parse_term(source: &CurrencyCode, key: &str) -> Option<CurrencyCode> {
    key.strip_prefix(source.code())
        .and_then(|term| CurrencyCode::new(term).ok())
}

/// Positive decimal factor from a JSON number.
///
/// With `arbitrary_precision` the number keeps its source text, which is
/// parsed straight into a `Decimal`.
fn parse_factor(value: &serde_json::Value) -> Option<Decimal> {
    let serde_json::Value::Number(number) = value else {
        return None;
    };
    let text = number.to_string();
    let factor = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (factor > Decimal::ZERO).then_some(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_payload() {
        let payload = r#"{
            "success": true,
            "timestamp": 1704888000,
            "source": "USD",
            "quotes": {"USDEUR": 0.90, "USDBRL": 5.00, "USDUSD": 1}
        }"#;

        let snapshot = Snapshot::from_json(payload).unwrap();

        assert_eq!(snapshot.source, CurrencyCode::usd());
        assert_eq!(snapshot.as_of, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.quotes[&CurrencyCode::eur()], dec!(0.9));
        assert_eq!(snapshot.quotes[&CurrencyCode::brl()], dec!(5));
    }

    #[test]
    fn test_long_factors_keep_precision() {
        let payload = r#"{
            "success": true,
            "timestamp": 1704888000,
            "source": "USD",
            "quotes": {"USDEUR": 0.12345678901234567890123, "USDBRL": 1.00000000000000000001}
        }"#;

        let snapshot = Snapshot::from_json(payload).unwrap();

        assert_eq!(
            snapshot.quotes[&CurrencyCode::eur()],
            Decimal::from_str("0.12345678901234567890123").unwrap()
        );
        assert_eq!(
            snapshot.quotes[&CurrencyCode::brl()],
            dec!(1.00000000000000000001)
        );
    }

    #[test]
    fn test_upstream_failure() {
        let payload = r#"{
            "success": false,
            "error": {"code": 104, "info": "Your monthly usage limit has been reached."}
        }"#;

        let err = Snapshot::from_json(payload).unwrap_err();

        assert!(matches!(err, FxError::UpstreamFailure { code: 104, .. }));
        assert_eq!(
            err.to_string(),
            "Error [104]: Your monthly usage limit has been reached."
        );
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        let payload = r#"{"source": "USD", "timestamp": 1704888000, "quotes": {}}"#;

        let err = Snapshot::from_json(payload).unwrap_err();

        assert!(matches!(err, FxError::UpstreamFailure { code: 0, .. }));
    }

    #[test]
    fn test_invalid_quotes_are_skipped() {
        let payload = r#"{
            "success": true,
            "timestamp": 1704888000,
            "source": "USD",
            "quotes": {
                "USDEUR": 0.9,
                "USDXXXX": 1.2,
                "EURGBP": 0.8,
                "USDGBP": "0.79",
                "USDJPY": 0,
                "USDCHF": 8.7e-1
            }
        }"#;

        let snapshot = Snapshot::from_json(payload).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.quotes.contains_key(&CurrencyCode::eur()));
        assert_eq!(
            snapshot.quotes[&CurrencyCode::new("CHF").unwrap()],
            dec!(0.87)
        );
    }

    #[test]
    fn test_bad_source_rejected() {
        let payload = r#"{"success": true, "timestamp": 1704888000, "source": "DOLLARS", "quotes": {}}"#;

        let err = Snapshot::from_json(payload).unwrap_err();

        assert!(matches!(err, FxError::MalformedPayload(_)));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            Snapshot::from_json("<html>"),
            Err(FxError::MalformedPayload(_))
        ));
    }
}
