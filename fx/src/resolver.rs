//! Rate resolution against a snapshot store.
//!
//! Every stored quote is expressed against the store's base currency (the
//! pivot). A query is answered, in order of preference, as:
//!
//! 1. identity: same currency on both sides, factor exactly one;
//! 2. reverse: `X -> pivot`, the inverse of the stored `pivot -> X` quote;
//! 3. direct: `pivot -> X`, the stored quote as-is;
//! 4. triangulated: `X -> pivot -> Y`, the product of cases 2 and 3.
//!
//! Quotes are looked up on the requested date and up to three days before it.

use chrono::NaiveDate;
use ratechain_common::{fallback_window, today, CurrencyCode, CurrencyPair};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::rate::{ProviderContext, Rate, RateKind, RateQuery};
use crate::store::RateSnapshotStore;

/// Resolves rates from a [`RateSnapshotStore`].
pub struct RateResolver {
    context: ProviderContext,
    store: Arc<RateSnapshotStore>,
}

impl RateResolver {
    /// Create a resolver over `store`.
    pub fn new(context: ProviderContext, store: Arc<RateSnapshotStore>) -> Self {
        Self { context, store }
    }

    /// The store this resolver reads from.
    pub fn store(&self) -> &Arc<RateSnapshotStore> {
        &self.store
    }

    /// Resolve the rate for a query. `Ok(None)` when no data covers it.
    #[instrument(skip(self, query), fields(provider = %self.context.name, pair = %query.pair()))]
    pub fn resolve_rate(&self, query: &RateQuery) -> FxResult<Option<Rate>> {
        let Some(pivot) = self.store.base_currency() else {
            debug!("Store is empty");
            return Ok(None);
        };
        if self.store.is_empty() {
            debug!("Store is empty");
            return Ok(None);
        }

        let requested = query.as_of.unwrap_or_else(today);
        let dates = fallback_window(requested);

        if query.base == query.term {
            return Ok(Some(self.identity(query, &dates, requested)));
        }
        if query.term == pivot {
            return Ok(self.reverse(&query.base, &pivot, &dates));
        }
        if query.base == pivot {
            return Ok(self.direct(&query.term, &dates));
        }
        self.triangulate(query, &pivot, &dates).map(Some)
    }

    fn identity(&self, query: &RateQuery, dates: &[NaiveDate], requested: NaiveDate) -> Rate {
        let as_of = self.store.first_date_with_data(dates).unwrap_or(requested);
        Rate {
            pair: query.pair(),
            factor: Decimal::ONE,
            kind: RateKind::for_date(as_of, today()),
            as_of,
            provider: self.context.name.clone(),
            chain: Vec::new(),
        }
    }

    /// `base -> pivot` from the stored `pivot -> base` quote.
    fn reverse(&self, base: &CurrencyCode, pivot: &CurrencyCode, dates: &[NaiveDate]) -> Option<Rate> {
        let quote = self.store.lookup(base, dates)?;
        // Stored factors are strictly positive, so the division is defined.
        let factor = Decimal::ONE / quote.factor();
        debug!(stored = %quote.factor(), reversed = %factor, "Reversed quote");
        Some(Rate {
            pair: CurrencyPair::new(base.clone(), pivot.clone()),
            factor,
            kind: quote.kind(),
            as_of: quote.as_of(),
            provider: self.context.name.clone(),
            chain: Vec::new(),
        })
    }

    fn direct(&self, term: &CurrencyCode, dates: &[NaiveDate]) -> Option<Rate> {
        self.store
            .lookup(term, dates)
            .map(|quote| Rate::from_quote(&quote, self.context.name.clone()))
    }

    /// `base -> pivot -> term`.
    fn triangulate(
        &self,
        query: &RateQuery,
        pivot: &CurrencyCode,
        dates: &[NaiveDate],
    ) -> FxResult<Rate> {
        let to_pivot = self.reverse(&query.base, pivot, dates);
        let from_pivot = self.direct(&query.term, dates);

        let (Some(to_pivot), Some(from_pivot)) = (to_pivot, from_pivot) else {
            debug!(pivot = %pivot, "Triangulation leg missing");
            return Err(FxError::ConversionFailed {
                base: query.base.clone(),
                term: query.term.clone(),
            });
        };

        let pair = query.pair();
        let factor = to_pivot
            .factor
            .checked_mul(from_pivot.factor)
            .ok_or_else(|| FxError::ArithmeticOverflow(pair.clone()))?;

        Ok(Rate {
            pair,
            factor,
            kind: to_pivot.kind.combine(from_pivot.kind),
            as_of: to_pivot.as_of.min(from_pivot.as_of),
            provider: self.context.name.clone(),
            chain: vec![to_pivot, from_pivot],
        })
    }
}

impl RateProvider for RateResolver {
    fn context(&self) -> &ProviderContext {
        &self.context
    }

    fn resolve(&self, query: &RateQuery) -> FxResult<Option<Rate>> {
        self.resolve_rate(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn setup_resolver() -> RateResolver {
        let store = Arc::new(RateSnapshotStore::new());
        store
            .merge_on(
                &Snapshot::new(CurrencyCode::usd(), date(10))
                    .with_quote(CurrencyCode::eur(), dec!(0.90))
                    .with_quote(CurrencyCode::brl(), dec!(5.00)),
                date(10),
            )
            .unwrap();
        RateResolver::new(ProviderContext::new("CL", "test"), store)
    }

    fn query(base: CurrencyCode, term: CurrencyCode, d: u32) -> RateQuery {
        RateQuery::new(base, term).on(date(d))
    }

    #[test]
    fn test_empty_store_is_not_found() {
        let resolver = RateResolver::new(
            ProviderContext::new("CL", "test"),
            Arc::new(RateSnapshotStore::new()),
        );

        let result = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::usd(), 10))
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_identity() {
        let resolver = setup_resolver();

        let rate = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::usd(), 10))
            .unwrap()
            .unwrap();

        assert_eq!(rate.factor, Decimal::ONE);
        assert_eq!(rate.as_of, date(10));

        // Outside the data window the identity still holds.
        let far = resolver
            .resolve_rate(&query(CurrencyCode::eur(), CurrencyCode::eur(), 28))
            .unwrap()
            .unwrap();
        assert_eq!(far.factor, Decimal::ONE);
        assert_eq!(far.as_of, date(28));
    }

    #[test]
    fn test_direct() {
        let resolver = setup_resolver();

        let rate = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::eur(), 10))
            .unwrap()
            .unwrap();

        assert_eq!(rate.factor, dec!(0.90));
        assert_eq!(rate.pair.base, CurrencyCode::usd());
        assert_eq!(rate.provider, "CL");
        assert!(!rate.is_derived());
    }

    #[test]
    fn test_reverse() {
        let resolver = setup_resolver();

        let rate = resolver
            .resolve_rate(&query(CurrencyCode::brl(), CurrencyCode::usd(), 10))
            .unwrap()
            .unwrap();

        assert_eq!(rate.factor, dec!(0.2));
        assert_eq!(rate.pair, CurrencyPair::new(CurrencyCode::brl(), CurrencyCode::usd()));
    }

    #[test]
    fn test_reverse_missing_is_not_found() {
        let resolver = setup_resolver();

        let result = resolver
            .resolve_rate(&query(CurrencyCode::gbp(), CurrencyCode::usd(), 10))
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_triangulated() {
        let resolver = setup_resolver();

        let rate = resolver
            .resolve_rate(&query(CurrencyCode::brl(), CurrencyCode::eur(), 10))
            .unwrap()
            .unwrap();

        assert_eq!(rate.factor, dec!(0.18));
        assert_eq!(rate.as_of, date(10));
        assert!(rate.is_derived());
        assert_eq!(rate.chain[0].pair.term, CurrencyCode::usd());
        assert_eq!(rate.chain[1].pair.base, CurrencyCode::usd());
    }

    #[test]
    fn test_triangulation_failure_names_both_currencies() {
        let resolver = setup_resolver();

        let err = resolver
            .resolve_rate(&query(CurrencyCode::gbp(), CurrencyCode::eur(), 10))
            .unwrap_err();

        match err {
            FxError::ConversionFailed { base, term } => {
                assert_eq!(base, CurrencyCode::gbp());
                assert_eq!(term, CurrencyCode::eur());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fallback_window() {
        let resolver = setup_resolver();

        // Data three days back is found and reported with its own date.
        let rate = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::eur(), 13))
            .unwrap()
            .unwrap();
        assert_eq!(rate.as_of, date(10));

        // Four days back is out of the window.
        let result = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::eur(), 14))
            .unwrap();
        assert!(result.is_none());

        // Data after the requested date is never used.
        let result = resolver
            .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::eur(), 9))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_legs_from_different_dates() {
        let resolver = setup_resolver();
        resolver
            .store()
            .merge_on(
                &Snapshot::new(CurrencyCode::usd(), date(12))
                    .with_quote(CurrencyCode::eur(), dec!(0.95)),
                date(12),
            )
            .unwrap();

        let rate = resolver
            .resolve_rate(&query(CurrencyCode::brl(), CurrencyCode::eur(), 12))
            .unwrap()
            .unwrap();

        assert_eq!(rate.factor, dec!(0.19));
        assert_eq!(rate.as_of, date(10));
        assert_eq!(rate.chain[1].as_of, date(12));
    }

    fn factor_strategy() -> impl Strategy<Value = Decimal> {
        (1u64..=10_000_000_000, 0u32..=8).prop_map(|(mantissa, scale)| {
            Decimal::from_i128_with_scale(mantissa as i128, scale)
        })
    }

    fn tolerance(expected: Decimal) -> Decimal {
        (expected.abs() * dec!(0.0000000000000001)).max(dec!(0.0000000000000000000001))
    }

    proptest! {
        #[test]
        fn prop_reversal_round_trip(factor in factor_strategy()) {
            let store = Arc::new(RateSnapshotStore::new());
            store
                .merge_on(
                    &Snapshot::new(CurrencyCode::usd(), date(10)).with_quote(CurrencyCode::eur(), factor),
                    date(10),
                )
                .unwrap();
            let resolver = RateResolver::new(ProviderContext::new("CL", "test"), store);

            let reversed = resolver
                .resolve_rate(&query(CurrencyCode::eur(), CurrencyCode::usd(), 10))
                .unwrap()
                .unwrap();
            let recovered = Decimal::ONE / reversed.factor;

            prop_assert!((recovered - factor).abs() <= tolerance(factor));
        }

        #[test]
        fn prop_triangulation_consistent(a in factor_strategy(), b in factor_strategy()) {
            let store = Arc::new(RateSnapshotStore::new());
            store
                .merge_on(
                    &Snapshot::new(CurrencyCode::usd(), date(10))
                        .with_quote(CurrencyCode::brl(), a)
                        .with_quote(CurrencyCode::eur(), b),
                    date(10),
                )
                .unwrap();
            let resolver = RateResolver::new(ProviderContext::new("CL", "test"), store);

            let cross = resolver
                .resolve_rate(&query(CurrencyCode::brl(), CurrencyCode::eur(), 10))
                .unwrap()
                .unwrap();
            let to_pivot = resolver
                .resolve_rate(&query(CurrencyCode::brl(), CurrencyCode::usd(), 10))
                .unwrap()
                .unwrap();
            let from_pivot = resolver
                .resolve_rate(&query(CurrencyCode::usd(), CurrencyCode::eur(), 10))
                .unwrap()
                .unwrap();

            let expected = to_pivot.factor * from_pivot.factor;
            prop_assert!((cross.factor - expected).abs() <= tolerance(expected));
        }
    }
}
