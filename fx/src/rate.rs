//! Rate values, queries and provider identity.

use chrono::{NaiveDate, NaiveDateTime};
use ratechain_common::{date_of, CurrencyCode, CurrencyPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FxError, FxResult};

/// Whether a rate comes from the latest ingested day or from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateKind {
    /// Quoted on the day it was ingested.
    Current,
    /// Quoted for an earlier day.
    Historic,
}

impl RateKind {
    /// Kind of data quoted for `as_of` when ingested on `today`.
    pub fn for_date(as_of: NaiveDate, today: NaiveDate) -> Self {
        if as_of == today {
            RateKind::Current
        } else {
            RateKind::Historic
        }
    }

    /// Combine the kinds of the legs of a derived rate.
    pub fn combine(self, other: RateKind) -> Self {
        match (self, other) {
            (RateKind::Current, RateKind::Current) => RateKind::Current,
            _ => RateKind::Historic,
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKind::Current => write!(f, "CURRENT"),
            RateKind::Historic => write!(f, "HISTORIC"),
        }
    }
}

/// A stored quote from a snapshot. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pair: CurrencyPair,
    factor: Decimal,
    as_of: NaiveDate,
    kind: RateKind,
}

impl Quote {
    /// Create a quote. The factor must be strictly positive.
    pub fn new(
        base: CurrencyCode,
        term: CurrencyCode,
        factor: Decimal,
        as_of: NaiveDate,
        kind: RateKind,
    ) -> FxResult<Self> {
        let pair = CurrencyPair::new(base, term);
        if factor <= Decimal::ZERO {
            return Err(FxError::NonPositiveFactor { pair, factor });
        }
        Ok(Self {
            pair,
            factor,
            as_of,
            kind,
        })
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.pair.base
    }

    pub fn term(&self) -> &CurrencyCode {
        &self.pair.term
    }

    pub fn factor(&self) -> Decimal {
        self.factor
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn kind(&self) -> RateKind {
        self.kind
    }
}

/// A resolved exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// `amount_in_term = amount_in_base * factor`.
    pub factor: Decimal,
    /// Kind of the underlying data.
    pub kind: RateKind,
    /// Date of the data actually used, which may precede the requested date.
    pub as_of: NaiveDate,
    /// Name of the provider that produced the rate.
    pub provider: String,
    /// Legs of a derived rate, in application order. Empty for quoted rates.
    pub chain: Vec<Rate>,
}

impl Rate {
    /// A rate taken from a stored quote as-is.
    pub fn from_quote(quote: &Quote, provider: impl Into<String>) -> Self {
        Self {
            pair: quote.pair.clone(),
            factor: quote.factor,
            kind: quote.kind,
            as_of: quote.as_of,
            provider: provider.into(),
            chain: Vec::new(),
        }
    }

    /// Whether this rate was derived from other rates.
    pub fn is_derived(&self) -> bool {
        !self.chain.is_empty()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} {}, {})",
            self.pair, self.factor, self.kind, self.as_of, self.provider
        )
    }
}

/// A request for a rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    /// Currency being priced.
    pub base: CurrencyCode,
    /// Currency the price is expressed in.
    pub term: CurrencyCode,
    /// Requested date; today when absent.
    pub as_of: Option<NaiveDate>,
    /// Providers to use, in order. Empty means the default chain.
    pub providers: Vec<String>,
}

impl RateQuery {
    /// Create a query for today's rate.
    pub fn new(base: CurrencyCode, term: CurrencyCode) -> Self {
        Self {
            base,
            term,
            as_of: None,
            providers: Vec::new(),
        }
    }

    /// Ask for the rate on a given date.
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Ask for the rate at a given time; only its calendar date matters.
    pub fn at(mut self, date_time: NaiveDateTime) -> Self {
        self.as_of = Some(date_of(date_time));
        self
    }

    /// Restrict the query to the given providers, tried in order.
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// The same query for another currency pair.
    pub fn for_pair(&self, base: CurrencyCode, term: CurrencyCode) -> Self {
        Self {
            base,
            term,
            as_of: self.as_of,
            providers: self.providers.clone(),
        }
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.base.clone(), self.term.clone())
    }
}

/// Identity of a rate provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    /// Unique short name, used for lookup and chaining.
    pub name: String,
    /// Human readable description.
    pub description: String,
}

impl ProviderContext {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}
