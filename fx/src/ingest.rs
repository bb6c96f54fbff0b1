//! Snapshot ingestion.
//!
//! Payloads fetched from a [`SnapshotSource`] travel over a channel to a
//! single task that decodes them and merges them into the store. The store's
//! merge is the only write path; queries never wait on ingestion.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{FxError, FxResult};
use crate::snapshot::Snapshot;
use crate::store::RateSnapshotStore;

/// Source of raw quote payloads.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the latest payload.
    async fn fetch(&self) -> FxResult<String>;
}

/// Reads payloads from a JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> FxResult<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FxError::Source(format!("{}: {}", self.path.display(), e)))
    }
}

/// Something to merge into the store.
#[derive(Debug, Clone)]
pub enum IngestMessage {
    /// Raw upstream JSON, decoded by the ingestion task.
    Payload(String),
    /// An already decoded snapshot.
    Snapshot(Snapshot),
}

struct Envelope {
    message: IngestMessage,
    reply: Option<oneshot::Sender<FxResult<usize>>>,
}

/// Sending side of the ingestion channel.
#[derive(Clone)]
pub struct IngestionHandle {
    tx: mpsc::Sender<Envelope>,
}

impl IngestionHandle {
    /// Queue a message without waiting for it to be merged.
    pub async fn submit(&self, message: IngestMessage) -> FxResult<()> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .await
            .map_err(|_| FxError::IngestionClosed)
    }

    /// Queue a message and wait for the merge outcome.
    ///
    /// Returns the number of quotes merged.
    pub async fn ingest(&self, message: IngestMessage) -> FxResult<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| FxError::IngestionClosed)?;
        reply_rx.await.map_err(|_| FxError::IngestionClosed)?
    }

    /// Decode and merge a raw payload, waiting for the outcome.
    pub async fn ingest_payload(&self, payload: impl Into<String>) -> FxResult<usize> {
        self.ingest(IngestMessage::Payload(payload.into())).await
    }
}

/// Counters reported by the ingestion task when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Snapshots merged.
    pub merged: usize,
    /// Snapshots rejected.
    pub rejected: usize,
}

/// Start the ingestion task for `store`.
///
/// The task runs until every [`IngestionHandle`] is dropped.
pub fn spawn_ingestion(
    store: Arc<RateSnapshotStore>,
    capacity: usize,
) -> (IngestionHandle, JoinHandle<IngestStats>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));

    let task = tokio::spawn(async move {
        let mut stats = IngestStats::default();
        while let Some(envelope) = rx.recv().await {
            let result = apply(&store, envelope.message);
            match &result {
                Ok(quotes) => {
                    stats.merged += 1;
                    debug!(quotes, "Snapshot ingested");
                }
                Err(e) => {
                    stats.rejected += 1;
                    warn!(error = %e, code = e.error_code(), "Snapshot rejected");
                }
            }
            if let Some(reply) = envelope.reply {
                // The caller may have stopped waiting.
                let _ = reply.send(result);
            }
        }
        info!(merged = stats.merged, rejected = stats.rejected, "Ingestion stopped");
        stats
    });

    (IngestionHandle { tx }, task)
}

fn apply(store: &RateSnapshotStore, message: IngestMessage) -> FxResult<usize> {
    let snapshot = match message {
        IngestMessage::Payload(payload) => Snapshot::from_json(&payload)?,
        IngestMessage::Snapshot(snapshot) => snapshot,
    };
    store.merge(&snapshot)
}

/// Fetch from `source` every `interval` and forward payloads for ingestion.
///
/// Fetch failures are logged and retried on the next tick. The poller stops
/// once the ingestion task is gone.
pub fn spawn_poller(
    source: Arc<dyn SnapshotSource>,
    handle: IngestionHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match source.fetch().await {
                Ok(payload) => {
                    debug!(source = source.name(), bytes = payload.len(), "Fetched payload");
                    if handle.submit(IngestMessage::Payload(payload)).await.is_err() {
                        info!(source = source.name(), "Ingestion closed, stopping poller");
                        break;
                    }
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Failed to fetch payload");
                }
            }
        }
    })
}
