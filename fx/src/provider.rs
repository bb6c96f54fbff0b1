//! Rate provider trait and the composite provider.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::FxResult;
use crate::rate::{ProviderContext, Rate, RateQuery};

/// A named rate-resolution engine.
pub trait RateProvider: Send + Sync {
    /// Get the provider identity.
    fn context(&self) -> &ProviderContext;

    /// Get the provider name.
    fn name(&self) -> &str {
        &self.context().name
    }

    /// Resolve a rate. `Ok(None)` means the provider has no rate for the query.
    fn resolve(&self, query: &RateQuery) -> FxResult<Option<Rate>>;
}

/// Tries several providers in order and returns the first rate found.
pub struct CompositeProvider {
    context: ProviderContext,
    providers: Vec<Arc<dyn RateProvider>>,
}

impl CompositeProvider {
    /// Create a composite over `providers`, tried in the given order.
    pub fn new(providers: Vec<Arc<dyn RateProvider>>) -> Self {
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        let context = ProviderContext::new(
            names.join(","),
            format!("Compound rate provider over [{}]", names.join(", ")),
        );
        Self { context, providers }
    }

    /// Member providers, in lookup order.
    pub fn providers(&self) -> &[Arc<dyn RateProvider>] {
        &self.providers
    }
}

impl RateProvider for CompositeProvider {
    fn context(&self) -> &ProviderContext {
        &self.context
    }

    fn resolve(&self, query: &RateQuery) -> FxResult<Option<Rate>> {
        for provider in &self.providers {
            match provider.resolve(query) {
                Ok(Some(rate)) => {
                    debug!(
                        provider = provider.name(),
                        pair = %rate.pair,
                        factor = %rate.factor,
                        "Got rate from provider"
                    );
                    return Ok(Some(rate));
                }
                Ok(None) => {
                    debug!(provider = provider.name(), pair = %query.pair(), "Provider has no rate");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        pair = %query.pair(),
                        error = %e,
                        "Provider failed to return rate"
                    );
                }
            }
        }
        Ok(None)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    context: ProviderContext,
    rates: dashmap::DashMap<String, Rate>,
    failing: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            context: ProviderContext::new(name, "Mock rate provider"),
            rates: dashmap::DashMap::new(),
            failing: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a provider that fails every query.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            failing: true,
            ..Self::new(name)
        }
    }

    /// Set a rate for a currency pair.
    pub fn set_rate(&self, rate: Rate) {
        let key = format!("{}", rate.pair);
        self.rates.insert(key, rate);
    }

    /// Number of queries answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RateProvider for MockRateProvider {
    fn context(&self) -> &ProviderContext {
        &self.context
    }

    fn resolve(&self, query: &RateQuery) -> FxResult<Option<Rate>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.failing {
            return Err(crate::error::FxError::Source(format!(
                "{} is unavailable",
                self.context.name
            )));
        }
        let key = format!("{}", query.pair());
        Ok(self.rates.get(&key).map(|r| r.value().clone()))
    }
}
