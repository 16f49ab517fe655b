//! Arclight server library.
//!
//! Wires the storage core to a JSON-RPC-over-HTTP face: request dispatch,
//! the query method handlers, the channel-fed ingest loop, configuration,
//! and shutdown handling.

use std::sync::Arc;

use axum::Router;
use axum::routing::post;

use arclight_storage::{LedgerReader, TransactionReader};

pub mod config;
pub mod ingest_loop;
pub mod jsonrpc;
pub mod methods;
pub mod shutdown;

/// Shared read-side handles for the RPC method handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger store reader.
    pub ledgers: Arc<LedgerReader>,
    /// Transaction index reader.
    pub transactions: Arc<TransactionReader>,
}

/// Builds the JSON-RPC router: a single POST endpoint at `/`.
pub fn build_router(state: AppState) -> Router {
    Router::new().route("/", post(jsonrpc::handle)).with_state(state)
}
