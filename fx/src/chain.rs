//! Provider selection for rate queries.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::FxConfig;
use crate::error::{FxError, FxResult};
use crate::provider::{CompositeProvider, RateProvider};
use crate::rate::{Rate, RateQuery};
use crate::registry::{ProviderMap, ProviderRegistry};

/// Picks the providers that answer a query and combines them.
pub struct ProviderChainSelector {
    registry: Arc<ProviderRegistry>,
    default_chain: Vec<String>,
}

impl ProviderChainSelector {
    /// Create a selector with a configured default chain.
    ///
    /// The chain must be non-empty and free of duplicates. Names that are not
    /// registered are allowed; they are skipped when the chain is used.
    pub fn new(registry: Arc<ProviderRegistry>, default_chain: Vec<String>) -> FxResult<Self> {
        if default_chain.is_empty() {
            return Err(FxError::InvalidConfig(
                "default provider chain cannot be empty".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = default_chain.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(FxError::InvalidConfig(format!(
                "duplicate provider in default chain: {}",
                duplicate
            )));
        }
        Ok(Self {
            registry,
            default_chain,
        })
    }

    /// Create a selector using the configured default chain.
    pub fn from_config(registry: Arc<ProviderRegistry>, config: &FxConfig) -> FxResult<Self> {
        Self::new(registry, config.default_chain.clone())
    }

    /// Default chain as configured, including unregistered names.
    pub fn configured_chain(&self) -> &[String] {
        &self.default_chain
    }

    /// Default chain restricted to registered providers, in configured order.
    pub fn default_chain(&self) -> Vec<String> {
        self.registered_chain(&self.registry.snapshot())
    }

    /// Provider names that should answer `query`.
    ///
    /// An explicit list must name only registered providers. Without one the
    /// default chain is used, which must have at least one registered entry.
    pub fn providers_for_query(&self, query: &RateQuery) -> FxResult<Vec<String>> {
        self.select(query, &self.registry.snapshot())
    }

    /// Build one provider out of `names`: the provider itself for a single
    /// name, a [`CompositeProvider`] trying them in order otherwise.
    pub fn build_provider<S: AsRef<str>>(&self, names: &[S]) -> FxResult<Arc<dyn RateProvider>> {
        Self::build_from(&self.registry.snapshot(), names)
    }

    /// The provider that answers `query`.
    ///
    /// Selection and construction read the same registry map.
    pub fn provider_for_query(&self, query: &RateQuery) -> FxResult<Arc<dyn RateProvider>> {
        let providers = self.registry.snapshot();
        let names = self.select(query, &providers)?;
        debug!(providers = ?names, "Selected providers");
        Self::build_from(&providers, names.as_slice())
    }

    fn registered_chain(&self, providers: &ProviderMap) -> Vec<String> {
        self.default_chain
            .iter()
            .filter(|name| providers.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    fn select(&self, query: &RateQuery, providers: &ProviderMap) -> FxResult<Vec<String>> {
        let names = if query.providers.is_empty() {
            let chain = self.registered_chain(providers);
            if chain.is_empty() {
                return Err(FxError::NoDefaultChain);
            }
            chain
        } else {
            let mut seen = BTreeSet::new();
            query
                .providers
                .iter()
                .filter(|name| seen.insert(name.as_str()))
                .cloned()
                .collect()
        };

        if let Some(unknown) = names.iter().find(|name| !providers.contains_key(name.as_str())) {
            return Err(FxError::UnsupportedProvider(unknown.clone()));
        }
        Ok(names)
    }

    fn build_from<S: AsRef<str>>(
        providers: &ProviderMap,
        names: &[S],
    ) -> FxResult<Arc<dyn RateProvider>> {
        let mut selected = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                providers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FxError::UnsupportedProvider(name.to_string()))
            })
            .collect::<FxResult<Vec<_>>>()?;

        match selected.len() {
            0 => Err(FxError::InvalidConfig(
                "at least one provider name is required".to_string(),
            )),
            1 => Ok(selected.remove(0)),
            _ => Ok(Arc::new(CompositeProvider::new(selected))),
        }
    }

    /// Resolve `query` through its providers.
    #[instrument(skip(self, query), fields(pair = %query.pair()))]
    pub fn resolve(&self, query: &RateQuery) -> FxResult<Option<Rate>> {
        self.provider_for_query(query)?.resolve(query)
    }

    /// Whether providers can be selected for `query`.
    pub fn is_provider_available(&self, query: &RateQuery) -> bool {
        self.providers_for_query(query).is_ok()
    }

    /// Whether the selected providers actually produce a rate for `query`.
    pub fn is_available(&self, query: &RateQuery) -> bool {
        matches!(self.resolve(query), Ok(Some(_)))
    }

    /// Names of all registered providers.
    pub fn provider_names(&self) -> BTreeSet<String> {
        self.registry.names()
    }

    /// Rebuild all registered providers.
    pub fn reload(&self) -> FxResult<()> {
        self.registry.reload()
    }
}
