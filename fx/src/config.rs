//! Rate engine configuration.

use ratechain_common::FALLBACK_DAYS;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::rate::ProviderContext;
use crate::registry::ProviderFactory;
use crate::resolver::RateResolver;
use crate::store::{RateSnapshotStore, StoreConfig};

/// Main rate engine configuration.
#[derive(Debug, Clone)]
pub struct FxConfig {
    /// Provider names tried in order when a query names none.
    pub default_chain: Vec<String>,
    /// Name of the snapshot-backed provider.
    pub provider_name: String,
    /// Description of the snapshot-backed provider.
    pub provider_description: String,
    /// Days of history kept in the store. `None` keeps everything.
    pub retention_days: Option<u64>,
    /// Ingestion channel capacity.
    pub ingest_capacity: usize,
    /// Interval between payload fetches.
    pub poll_interval: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            default_chain: vec!["CL".to_string()],
            provider_name: "CL".to_string(),
            provider_description: "Currency layer snapshot rates".to_string(),
            retention_days: None,
            ingest_capacity: 16,
            poll_interval: Duration::from_secs(3600),
            log_level: "info".to_string(),
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(chain) = lookup("FX_CONVERSION_CHAIN") {
            config.default_chain = parse_chain(&chain);
        }

        if let Some(name) = lookup("FX_PROVIDER_NAME") {
            config.provider_name = name.trim().to_string();
        }

        if let Some(days) = lookup("FX_RETENTION_DAYS") {
            match days.parse() {
                Ok(days) => config.retention_days = Some(days),
                Err(_) => warn!(value = %days, "Ignoring invalid FX_RETENTION_DAYS"),
            }
        }

        if let Some(capacity) = lookup("FX_INGEST_CAPACITY") {
            match capacity.parse() {
                Ok(capacity) => config.ingest_capacity = capacity,
                Err(_) => warn!(value = %capacity, "Ignoring invalid FX_INGEST_CAPACITY"),
            }
        }

        if let Some(secs) = lookup("FX_POLL_INTERVAL_SECS") {
            match secs.parse() {
                Ok(secs) => config.poll_interval = Duration::from_secs(secs),
                Err(_) => warn!(value = %secs, "Ignoring invalid FX_POLL_INTERVAL_SECS"),
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.default_chain.is_empty() {
            return Err(FxError::InvalidConfig(
                "Default provider chain cannot be empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = self.default_chain.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(FxError::InvalidConfig(format!(
                "Provider {} appears twice in the default chain",
                duplicate
            )));
        }

        if self.provider_name.is_empty() {
            return Err(FxError::InvalidConfig(
                "Provider name cannot be empty".to_string(),
            ));
        }

        if self.ingest_capacity == 0 {
            return Err(FxError::InvalidConfig(
                "Ingest capacity cannot be 0".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(FxError::InvalidConfig(
                "Poll interval cannot be 0".to_string(),
            ));
        }

        if matches!(self.retention_days, Some(days) if days < FALLBACK_DAYS) {
            return Err(FxError::InvalidConfig(format!(
                "Retention cannot be shorter than the {} day fallback window",
                FALLBACK_DAYS
            )));
        }

        Ok(())
    }

    /// Store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            retention_days: self.retention_days,
        }
    }

    /// Identity of the snapshot-backed provider.
    pub fn provider_context(&self) -> ProviderContext {
        ProviderContext::new(&self.provider_name, &self.provider_description)
    }

    /// Factory for the snapshot-backed provider.
    ///
    /// Every engine it builds reads the same `store`, so reloading the
    /// registry never discards ingested rates.
    pub fn resolver_factory(&self, store: Arc<RateSnapshotStore>) -> ProviderFactory {
        let context = self.provider_context();
        Arc::new(move || {
            Ok(Arc::new(RateResolver::new(context.clone(), store.clone())) as Arc<dyn RateProvider>)
        })
    }
}

/// Split a comma-separated provider list, dropping blank entries.
pub fn parse_chain(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
