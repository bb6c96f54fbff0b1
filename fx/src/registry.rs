//! Registry of named rate providers.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;

/// Builds a fresh provider engine.
pub type ProviderFactory = Arc<dyn Fn() -> FxResult<Arc<dyn RateProvider>> + Send + Sync>;

/// Providers by name.
pub type ProviderMap = HashMap<String, Arc<dyn RateProvider>>;

/// Set of named rate providers.
///
/// Readers always see a complete map: updates build a new map and publish it
/// with a single pointer swap.
pub struct ProviderRegistry {
    factories: Vec<ProviderFactory>,
    providers: RwLock<Arc<ProviderMap>>,
}

impl ProviderRegistry {
    /// Create a registry and build every provider from `factories`.
    pub fn new(factories: Vec<ProviderFactory>) -> FxResult<Self> {
        let providers = Self::build(&factories)?;
        Ok(Self {
            factories,
            providers: RwLock::new(Arc::new(providers)),
        })
    }

    /// Create a registry without configured factories.
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
            providers: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Add a provider under its own name, replacing any existing entry.
    ///
    /// Providers added this way are dropped by the next [`reload`](Self::reload)
    /// unless a factory also produces them.
    pub fn register(&self, provider: Arc<dyn RateProvider>) {
        let name = provider.name().to_string();
        let mut guard = self.providers.write();
        let mut next = ProviderMap::clone(&guard);
        if next.insert(name.clone(), provider).is_some() {
            warn!(provider = %name, "Replacing registered rate provider");
        }
        *guard = Arc::new(next);
        info!(provider = %name, "Registered rate provider");
    }

    /// Rebuild every provider from the configured factories.
    ///
    /// On any failure the current providers stay in place.
    pub fn reload(&self) -> FxResult<()> {
        let providers = Self::build(&self.factories).map_err(|e| {
            warn!(error = %e, "Provider reload failed, keeping current registry");
            e
        })?;
        let count = providers.len();
        *self.providers.write() = Arc::new(providers);
        info!(providers = count, "Reloaded rate providers");
        Ok(())
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> FxResult<Arc<dyn RateProvider>> {
        self.snapshot()
            .get(name)
            .cloned()
            .ok_or_else(|| FxError::UnsupportedProvider(name.to_string()))
    }

    /// Check whether a provider is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Names of all registered providers.
    pub fn names(&self) -> BTreeSet<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// The current provider map. Later reloads do not affect it.
    pub fn snapshot(&self) -> Arc<ProviderMap> {
        self.providers.read().clone()
    }

    fn build(factories: &[ProviderFactory]) -> FxResult<ProviderMap> {
        let mut providers = ProviderMap::with_capacity(factories.len());
        for factory in factories {
            let provider = factory()?;
            let name = provider.name().to_string();
            if providers.contains_key(&name) {
                return Err(FxError::DuplicateProvider(name));
            }
            debug!(provider = %name, "Constructed rate provider");
            providers.insert(name, provider);
        }
        Ok(providers)
    }
}
