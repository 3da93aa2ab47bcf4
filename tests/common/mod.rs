//! In-process mock of the upstream swap tiers and pair discovery

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use swap_feed::models::config::{EndpointConfig, FeedConfig, PollConfig};
use tokio::net::TcpListener;

pub const TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const QUOTE: &str = "0x2222222222222222222222222222222222222222";
pub const POOL: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const WALLET: &str = "0x3333333333333333333333333333333333333333";

/// 2024-05-01T12:00:00Z, aligned to a minute bucket
pub const T0: i64 = 1_714_564_800_000;

pub const TOKEN_PATH: &str = "/api/token-swaps";
pub const POOL_PATH: &str = "/api/pool-swaps";
pub const AGGREGATED_PATH: &str = "/api/realtime-transactions";
pub const DISCOVERY_PATH: &str = "/api/dex/pairs";

/// How a mocked endpoint answers
#[derive(Debug, Clone)]
pub enum Behavior {
    Data(Vec<Value>),
    Empty,
    Reject,
    Status(u16),
    Delayed(Duration, Vec<Value>),
    /// HTTP 500 for the first `n` calls, data afterwards
    FailFirst(usize, Vec<Value>),
}

#[derive(Default)]
pub struct MockState {
    behaviors: Mutex<HashMap<&'static str, Behavior>>,
    hits: Mutex<Vec<(String, HashMap<String, String>)>>,
    pairs: Mutex<Option<Value>>,
}

impl MockState {
    pub fn set(&self, path: &'static str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(path, behavior);
    }

    pub fn set_pairs(&self, body: Value) {
        *self.pairs.lock().unwrap() = Some(body);
    }

    /// Paths hit so far, in order
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|(p, _)| p == path).count()
    }

    /// Query parameters of the last request to `path`
    pub fn last_query(&self, path: &str) -> Option<HashMap<String, String>> {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
    }

    /// Query parameters of every request to `path`, in order
    pub fn queries(&self, path: &str) -> Vec<HashMap<String, String>> {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
            .collect()
    }

    fn record(&self, path: &str, query: HashMap<String, String>) {
        self.hits.lock().unwrap().push((path.to_string(), query));
    }

    fn behavior(&self, path: &str) -> Behavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Behavior::Status(500))
    }
}

async fn respond(state: &MockState, path: &'static str, query: HashMap<String, String>) -> (StatusCode, Json<Value>) {
    state.record(path, query);
    let calls = state.hit_count(path);
    match state.behavior(path) {
        Behavior::Data(transactions) => (
            StatusCode::OK,
            Json(json!({"success": true, "transactions": transactions, "source": "mock"})),
        ),
        Behavior::Empty => (StatusCode::OK, Json(json!({"success": true, "transactions": []}))),
        Behavior::Reject => (StatusCode::OK, Json(json!({"success": false, "error": "nope"}))),
        Behavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({"error": "mock failure"})),
        ),
        Behavior::FailFirst(n, _) if calls <= n => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "mock failure"})),
        ),
        Behavior::FailFirst(_, transactions) => (
            StatusCode::OK,
            Json(json!({"success": true, "transactions": transactions})),
        ),
        Behavior::Delayed(delay, transactions) => {
            tokio::time::sleep(delay).await;
            (
                StatusCode::OK,
                Json(json!({"success": true, "transactions": transactions})),
            )
        }
    }
}

async fn token_swaps(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    respond(&state, TOKEN_PATH, query).await
}

async fn pool_swaps(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    respond(&state, POOL_PATH, query).await
}

async fn aggregated(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    respond(&state, AGGREGATED_PATH, query).await
}

async fn discovery(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.record(DISCOVERY_PATH, query);
    match state.pairs.lock().unwrap().clone() {
        Some(body) => (StatusCode::OK, Json(body)),
        None => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "down"}))),
    }
}

/// Start the mock upstream; returns its state and base URL
pub async fn spawn_upstream() -> (Arc<MockState>, String) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route(TOKEN_PATH, get(token_swaps))
        .route(POOL_PATH, get(pool_swaps))
        .route(AGGREGATED_PATH, get(aggregated))
        .route(DISCOVERY_PATH, get(discovery))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("http://{}", addr))
}

/// Fast-polling config pointed at the mock
pub fn fast_config(base_url: &str) -> FeedConfig {
    FeedConfig {
        endpoints: EndpointConfig {
            http_timeout: Duration::from_secs(2),
            ..EndpointConfig::with_base_url(base_url)
        },
        poll: PollConfig {
            base_ms: 20,
            ceiling_ms: 200,
            backoff_factor: 2.0,
            recovery_factor: 0.5,
            initial_limit: 100,
            poll_limit: 50,
        },
        window_capacity: 60,
        highlight_ttl: Duration::from_secs(5),
    }
}

/// Raw swap in the snake_case shape
pub fn raw_swap(hash_byte: u8, timestamp_ms: i64, side: &str) -> Value {
    json!({
        "transaction_hash": format!("0x{}", hex_repeat(hash_byte, 32)),
        "block_timestamp": timestamp_ms,
        "transaction_type": side,
        "base_token_amount": "10",
        "total_value_usd": "100",
        "wallet_address": WALLET,
    })
}

pub fn hash_of(hash_byte: u8) -> String {
    format!("0x{}", hex_repeat(hash_byte, 32))
}

fn hex_repeat(byte: u8, count: usize) -> String {
    format!("{:02x}", byte).repeat(count)
}
