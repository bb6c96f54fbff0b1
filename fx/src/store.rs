//! Date-indexed store of quoted rates.

use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use parking_lot::RwLock;
use ratechain_common::{today, CurrencyCode, FALLBACK_DAYS};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{FxError, FxResult};
use crate::rate::{Quote, RateKind};
use crate::snapshot::Snapshot;

type DateBucket = Arc<DashMap<CurrencyCode, Quote>>;

/// Configuration for the snapshot store.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Days of history to keep behind the newest merged date. `None` keeps
    /// everything.
    pub retention_days: Option<u64>,
}

/// Thread-safe, date-indexed table of quotes against a single base currency.
///
/// Snapshots are merged in by upsert; quotes are replaced whole, so a reader
/// sees either the previous quote or the new one.
pub struct RateSnapshotStore {
    rates: DashMap<NaiveDate, DateBucket>,
    base_currency: RwLock<Option<CurrencyCode>>,
    config: StoreConfig,
}

impl RateSnapshotStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            rates: DashMap::new(),
            base_currency: RwLock::new(None),
            config,
        }
    }

    /// Merge a snapshot ingested today.
    pub fn merge(&self, snapshot: &Snapshot) -> FxResult<usize> {
        self.merge_on(snapshot, today())
    }

    /// Merge a snapshot, classifying its quotes relative to `today`.
    ///
    /// Returns the number of quotes written. A snapshot whose source differs
    /// from the recorded base currency is rejected whole.
    #[instrument(skip(self, snapshot), fields(source = %snapshot.source, as_of = %snapshot.as_of))]
    pub fn merge_on(&self, snapshot: &Snapshot, today: NaiveDate) -> FxResult<usize> {
        let kind = RateKind::for_date(snapshot.as_of, today);
        let mut quotes = Vec::with_capacity(snapshot.len());
        for (term, factor) in &snapshot.quotes {
            match Quote::new(
                snapshot.source.clone(),
                term.clone(),
                *factor,
                snapshot.as_of,
                kind,
            ) {
                Ok(quote) => quotes.push(quote),
                Err(e) => warn!(term = %term, error = %e, "Skipping invalid quote"),
            }
        }

        // The base is only fixed by a snapshot that stores something.
        self.check_base(&snapshot.source, !quotes.is_empty())?;
        if quotes.is_empty() {
            debug!("Snapshot has no usable quotes");
            return Ok(0);
        }

        let bucket = self
            .rates
            .entry(snapshot.as_of)
            .or_default()
            .value()
            .clone();
        let merged = quotes.len();
        for quote in quotes {
            bucket.insert(quote.term().clone(), quote);
        }

        info!(quotes = merged, kind = %kind, "Merged rate snapshot");

        if let Some(days) = self.config.retention_days {
            self.apply_retention(days);
        }

        Ok(merged)
    }

    /// Find the quote for `term`, trying each date in order.
    pub fn lookup(&self, term: &CurrencyCode, dates: &[NaiveDate]) -> Option<Quote> {
        for date in dates {
            let Some(bucket) = self.rates.get(date) else {
                continue;
            };
            let found = bucket.get(term).map(|quote| quote.value().clone());
            if found.is_some() {
                debug!(term = %term, date = %date, "Quote found");
                return found;
            }
        }
        debug!(term = %term, "No quote in window");
        None
    }

    /// First of `dates` that has any data.
    pub fn first_date_with_data(&self, dates: &[NaiveDate]) -> Option<NaiveDate> {
        dates
            .iter()
            .copied()
            .find(|date| self.rates.get(date).is_some_and(|b| !b.is_empty()))
    }

    /// Base currency shared by every stored quote, once anything was merged.
    pub fn base_currency(&self) -> Option<CurrencyCode> {
        self.base_currency.read().clone()
    }

    /// Check if the store holds no quotes.
    pub fn is_empty(&self) -> bool {
        self.rates.iter().all(|bucket| bucket.is_empty())
    }

    /// Stored dates, oldest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rates.iter().map(|e| *e.key()).collect();
        dates.sort();
        dates
    }

    /// Drop every date before `cutoff`. Returns the number of dates removed.
    pub fn prune_before(&self, cutoff: NaiveDate) -> usize {
        let before = self.rates.len();
        self.rates.retain(|date, _| *date >= cutoff);
        let removed = before - self.rates.len();
        if removed > 0 {
            debug!(cutoff = %cutoff, removed, "Pruned old rate dates");
        }
        removed
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            dates: self.rates.len(),
            quotes: self.rates.iter().map(|bucket| bucket.len()).sum(),
            base_currency: self.base_currency(),
        }
    }

    fn check_base(&self, source: &CurrencyCode, record: bool) -> FxResult<()> {
        let mut base = self.base_currency.write();
        if let Some(expected) = base.as_ref() {
            if expected != source {
                warn!(expected = %expected, actual = %source, "Rejecting snapshot with foreign base currency");
                return Err(FxError::BaseCurrencyMismatch {
                    expected: expected.clone(),
                    actual: source.clone(),
                });
            }
            return Ok(());
        }
        if record {
            *base = Some(source.clone());
        }
        Ok(())
    }

    /// Keep `days` of history behind the newest date, never less than the
    /// lookup fallback window.
    fn apply_retention(&self, days: u64) {
        let Some(newest) = self.rates.iter().map(|e| *e.key()).max() else {
            return;
        };
        if let Some(cutoff) = newest.checked_sub_days(Days::new(days.max(FALLBACK_DAYS))) {
            self.prune_before(cutoff);
        }
    }
}

impl Default for RateSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub dates: usize,
    pub quotes: usize,
    pub base_currency: Option<CurrencyCode>,
}
