//! Ratechain CLI
//!
//! Loads quote payloads into a snapshot store and resolves one rate.

use chrono::NaiveDate;
use clap::Parser;
use ratechain_common::CurrencyCode;
use ratechain_fx::{
    spawn_ingestion, FileSource, FxConfig, ProviderChainSelector, ProviderRegistry, RateQuery,
    RateSnapshotStore, SnapshotSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ratechain CLI
#[derive(Parser, Debug)]
#[command(name = "ratechain")]
#[command(about = "Resolve currency rates from quote snapshots")]
struct Args {
    /// Currency to convert from
    base: String,

    /// Currency to convert to
    term: String,

    /// Quote payload files to load, in order
    #[arg(short, long = "payload", required = true)]
    payloads: Vec<PathBuf>,

    /// Rate date (defaults to today, UTC)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Comma-separated providers to use instead of the default chain
    #[arg(long)]
    providers: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = FxConfig::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if args.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    config.validate()?;
    info!(chain = ?config.default_chain, "Starting ratechain");

    let store = Arc::new(RateSnapshotStore::with_config(config.store_config()));
    let providers = Arc::new(ProviderRegistry::new(vec![
        config.resolver_factory(store.clone())
    ])?);
    let selector = ProviderChainSelector::from_config(providers, &config)?;

    let (handle, ingestion) = spawn_ingestion(store.clone(), config.ingest_capacity);
    for path in &args.payloads {
        let payload = FileSource::new(path).fetch().await?;
        match handle.ingest_payload(payload).await {
            Ok(quotes) => info!(path = %path.display(), quotes, "Loaded payload"),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping payload"),
        }
    }
    drop(handle);
    let stats = ingestion.await?;
    info!(merged = stats.merged, rejected = stats.rejected, "Ingestion complete");

    let mut query = RateQuery::new(CurrencyCode::new(&args.base)?, CurrencyCode::new(&args.term)?);
    if let Some(date) = args.date {
        query = query.on(date);
    }
    if let Some(providers) = &args.providers {
        query = query.with_providers(ratechain_fx::config::parse_chain(providers));
    }

    match selector.resolve(&query)? {
        Some(rate) => println!("{}", serde_json::to_string_pretty(&rate)?),
        None => anyhow::bail!("No rate available for {}", query.pair()),
    }

    Ok(())
}
