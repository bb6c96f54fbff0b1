//! Ratechain FX Engine
//!
//! Currency rate resolution over ingested quote snapshots.
//!
//! # Features
//!
//! - Date-indexed snapshot store with a short look-back window
//! - Identity, reverse, direct and triangulated rate resolution
//! - Named providers with atomic reload and ordered fallback chains
//! - Background ingestion of upstream quote payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use ratechain_fx::{FxConfig, ProviderChainSelector, ProviderRegistry, RateQuery, RateSnapshotStore};
//! use ratechain_common::CurrencyCode;
//!
//! let config = FxConfig::from_env();
//! let store = Arc::new(RateSnapshotStore::with_config(config.store_config()));
//! let registry = Arc::new(ProviderRegistry::new(vec![config.resolver_factory(store.clone())])?);
//! let selector = ProviderChainSelector::from_config(registry, &config)?;
//!
//! // BRL -> EUR, triangulated through the store's base currency
//! let rate = selector.resolve(&RateQuery::new(CurrencyCode::brl(), CurrencyCode::eur()))?;
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod ingest;
pub mod provider;
pub mod rate;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod store;

pub use chain::ProviderChainSelector;
pub use config::FxConfig;
pub use error::{ErrorCategory, FxError, FxResult};
pub use ingest::{
    spawn_ingestion, spawn_poller, FileSource, IngestMessage, IngestStats, IngestionHandle,
    SnapshotSource,
};
pub use provider::{CompositeProvider, RateProvider};
pub use rate::{ProviderContext, Quote, Rate, RateKind, RateQuery};
pub use registry::{ProviderFactory, ProviderMap, ProviderRegistry};
pub use resolver::RateResolver;
pub use snapshot::Snapshot;
pub use store::{RateSnapshotStore, StoreConfig};
