//! Shared helpers for server integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use arclight_server::{AppState, build_router};
use arclight_storage::{
    Ingestor, LatestLedgerCache, LedgerReader, StorageEngine, TransactionReader,
};
use arclight_types::wire::{self, EnvelopeKind, ResultStatus};
use arclight_types::{LedgerTransaction, SealedLedger};

/// An in-memory node: storage stack plus the JSON-RPC router.
pub struct TestNode {
    pub ingestor: Ingestor,
    pub router: Router,
}

impl TestNode {
    pub fn new() -> Self {
        let engine = StorageEngine::open_in_memory().expect("open engine");
        let cache = Arc::new(LatestLedgerCache::load(&engine).expect("load cache"));
        let state = AppState {
            ledgers: Arc::new(LedgerReader::new(engine.clone(), Arc::clone(&cache))),
            transactions: Arc::new(TransactionReader::new(engine.clone())),
        };
        Self { ingestor: Ingestor::new(engine, cache), router: build_router(state) }
    }

    pub fn ingest(&self, ledger: &SealedLedger, retention_window: u32) {
        let raw = wire::encode_sealed_ledger(ledger).expect("encode ledger");
        self.ingestor.apply(&raw, retention_window).expect("apply ledger");
    }

    /// Posts one JSON-RPC call and returns the decoded response envelope.
    pub async fn rpc(&self, method: &str, params: Value) -> Value {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("send request");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        serde_json::from_slice(&bytes).expect("decode response")
    }

    /// Like [`rpc`](Self::rpc), asserting success and returning `result`.
    pub async fn rpc_ok(&self, method: &str, params: Value) -> Value {
        let envelope = self.rpc(method, params).await;
        assert!(
            envelope["error"].is_null(),
            "expected success, got error: {}",
            envelope["error"]
        );
        envelope["result"].clone()
    }

    /// Like [`rpc`](Self::rpc), asserting an error with the given code.
    pub async fn rpc_err(&self, method: &str, params: Value, code: i64) -> Value {
        let envelope = self.rpc(method, params).await;
        assert!(envelope["result"].is_null(), "expected error, got: {}", envelope["result"]);
        assert_eq!(envelope["error"]["code"], code, "error: {}", envelope["error"]);
        envelope["error"].clone()
    }
}

pub fn ledger(sequence: u32, close_time: i64, transactions: Vec<LedgerTransaction>) -> SealedLedger {
    SealedLedger::builder()
        .sequence(sequence)
        .close_time(close_time)
        .header(sequence.to_be_bytes().to_vec())
        .transactions(transactions)
        .build()
}

pub fn tx(seed: &[u8], successful: bool, fee_bump: bool, events: Vec<Vec<u8>>) -> LedgerTransaction {
    let kind = if fee_bump { EnvelopeKind::FeeBump } else { EnvelopeKind::Plain };
    let status = if successful { ResultStatus::Success } else { ResultStatus::Failed };
    LedgerTransaction::builder()
        .envelope(wire::encode_envelope(kind, seed))
        .result(wire::encode_result(status, b"detail"))
        .meta(seed.to_vec())
        .events(events)
        .build()
}

pub fn tx_hash_hex(tx: &LedgerTransaction) -> String {
    hex::encode(tx.hash())
}
