//! Channel-fed ingest loop.
//!
//! The upstream network client (an external collaborator) hands canonical
//! sealed-ledger blobs to the sender half; this loop applies them one at a
//! time, in order. Transient store errors retry the same ledger with
//! backoff; out-of-order blobs are reported upstream by logging and
//! dropped (the client resyncs); fatal errors stop the loop so no further
//! writes happen on a corrupt store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use arclight_storage::{Ingestor, StoreError};
use arclight_types::LedgerInfo;

/// Retries for transient (`Busy`/`Io`) store errors before giving up on a
/// ledger.
const MAX_APPLY_ATTEMPTS: u32 = 5;

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Consumes sealed-ledger blobs until the channel closes or a fatal store
/// error occurs.
pub async fn run(
    mut feed: mpsc::Receiver<Vec<u8>>,
    ingestor: Arc<Ingestor>,
    retention_window: u32,
) {
    while let Some(raw) = feed.recv().await {
        match apply_with_retry(&ingestor, raw, retention_window).await {
            Ok(info) => {
                metrics::counter!("arclight_ingested_ledgers_total").increment(1);
                metrics::gauge!("arclight_latest_ledger_sequence").set(f64::from(info.sequence));
            },
            Err(e @ StoreError::OutOfOrder { .. }) => {
                tracing::warn!(error = %e, "dropping out-of-order ledger; upstream should resync");
            },
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "fatal store error; refusing further writes");
                return;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to apply ledger");
            },
        }
    }
    tracing::info!("ledger feed closed, ingest loop exiting");
}

async fn apply_with_retry(
    ingestor: &Arc<Ingestor>,
    raw: Vec<u8>,
    retention_window: u32,
) -> Result<LedgerInfo, StoreError> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        let ingestor = Arc::clone(ingestor);
        let blob = raw.clone();
        let outcome =
            tokio::task::spawn_blocking(move || ingestor.apply(&blob, retention_window))
                .await
                .unwrap_or_else(|join| {
                    Err(StoreError::Busy { message: format!("ingest task failed: {join}") })
                });

        match outcome {
            Err(e) if e.is_retryable() && attempt < MAX_APPLY_ATTEMPTS => {
                tracing::warn!(error = %e, attempt, "transient store error, retrying ledger");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            },
            other => return other,
        }
    }
}
