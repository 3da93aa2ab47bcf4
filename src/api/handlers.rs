//! API Request Handlers

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use super::types::*;
use crate::core::poller::{FeedHandle, FeedService};
use crate::models::errors::{AppError, ErrorCode};
use crate::models::types::{FeedEvent, PairContext};
use crate::utils::address::is_address;
use crate::utils::constants::{canonical_chain, get_chain_name};

/// Upper bound on concurrently running feeds
pub const MAX_ACTIVE_FEEDS: usize = 100;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// One running feed and the knobs the API can turn
pub struct FeedEntry {
    pub handle: FeedHandle,
    pub price_tx: watch::Sender<f64>,
    pub created_at: i64,
    pub updates: Arc<AtomicU64>,
}

/// Shared application state
pub struct AppState {
    pub service: FeedService,
    pub feeds: DashMap<Uuid, FeedEntry>,
    pub start_time: Instant,
    pub max_feeds: usize,
}

impl AppState {
    pub fn new(service: FeedService) -> Self {
        Self {
            service,
            feeds: DashMap::new(),
            start_time: Instant::now(),
            max_feeds: MAX_ACTIVE_FEEDS,
        }
    }

    pub fn with_max_feeds(mut self, max_feeds: usize) -> Self {
        self.max_feeds = max_feeds;
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Stop every running feed
    pub fn stop_all(&self) {
        for entry in self.feeds.iter() {
            entry.handle.stop();
        }
        self.feeds.clear();
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn reject(err: AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))))
}

fn parse_feed_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request(format!("Invalid feed id: {}", id)))
}

fn valid_price(price: f64) -> Result<f64, AppError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(AppError::bad_request("priceUsd must be a finite number >= 0"))
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_feeds: state.feeds.len(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Feeds
// ============================================

pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFeedRequest>,
) -> ApiResult<CreateFeedData> {
    let start = Instant::now();

    let chain = canonical_chain(&req.chain).ok_or_else(|| {
        reject(AppError::bad_request(format!("Unsupported chain: {}", req.chain)), start)
    })?;
    if !is_address(req.token_address.trim()) {
        return Err(reject(AppError::bad_request("Invalid token address format"), start));
    }
    if req.quote_symbol.trim().is_empty() {
        return Err(reject(AppError::bad_request("quoteSymbol is required"), start));
    }
    let price = valid_price(req.price_usd.unwrap_or(0.0)).map_err(|e| reject(e, start))?;

    if state.feeds.len() >= state.max_feeds {
        warn!("🚫 Feed limit reached ({})", state.max_feeds);
        return Err(reject(
            AppError::new(ErrorCode::ApiRateLimited, "Too many active feeds"),
            start,
        ));
    }

    let mut context = PairContext::new(chain, req.token_address.trim(), req.quote_symbol.trim());
    if let Some(stable) = req.quote_is_stable {
        context = context.with_stable_quote(stable);
    }
    if let Some(pool) = req.pair_address.as_deref().filter(|p| !p.trim().is_empty()) {
        context = context.with_candidate_pool(pool);
    }

    let feed_id = Uuid::new_v4();
    let (price_tx, price_rx) = watch::channel(price);
    let updates = Arc::new(AtomicU64::new(0));
    let counter = updates.clone();

    let data = CreateFeedData {
        feed_id: feed_id.to_string(),
        chain: context.chain.clone(),
        token_address: context.base_token.clone(),
        quote_symbol: context.quote_symbol.clone(),
        quote_is_stable: context.quote_is_stable,
    };

    let handle = state.service.start_feed(context, price_rx, move |event| {
        counter.fetch_add(1, Ordering::Relaxed);
        if let FeedEvent::Error { code, message, .. } = &event {
            warn!("⚠️ Feed {}: [{}] {}", feed_id, code.as_str(), message);
        }
    });

    state.feeds.insert(
        feed_id,
        FeedEntry {
            handle,
            price_tx,
            created_at: chrono::Utc::now().timestamp(),
            updates,
        },
    );
    info!(
        "📡 Feed {} created for {} on {}",
        feed_id,
        data.token_address,
        get_chain_name(&data.chain)
    );

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<FeedData> {
    let start = Instant::now();
    let feed_id = parse_feed_id(&id).map_err(|e| reject(e, start))?;

    let entry = state
        .feeds
        .get(&feed_id)
        .ok_or_else(|| reject(AppError::not_found(format!("Feed {} not found", id)), start))?;

    let handle = &entry.handle;
    let context = handle.context();
    let transactions = handle
        .snapshot()
        .into_iter()
        .map(|transaction| TransactionView {
            is_new: handle.is_highlighted(&transaction.hash),
            transaction,
        })
        .collect();

    let data = FeedData {
        feed_id: feed_id.to_string(),
        chain: context.chain.clone(),
        token_address: context.base_token.clone(),
        quote_symbol: context.quote_symbol.clone(),
        active: handle.is_active(),
        visible: handle.is_visible(),
        price_usd: *entry.price_tx.borrow(),
        created_at: entry.created_at,
        updates: entry.updates.load(Ordering::Relaxed),
        status: handle.status(),
        transactions,
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

pub async fn update_price(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePriceRequest>,
) -> ApiResult<FeedAck> {
    let start = Instant::now();
    let feed_id = parse_feed_id(&id).map_err(|e| reject(e, start))?;
    let price = valid_price(req.price_usd).map_err(|e| reject(e, start))?;

    let entry = state
        .feeds
        .get(&feed_id)
        .ok_or_else(|| reject(AppError::not_found(format!("Feed {} not found", id)), start))?;
    entry.price_tx.send_replace(price);

    Ok(Json(ApiResponse::success(
        FeedAck {
            feed_id: feed_id.to_string(),
            active: entry.handle.is_active(),
            visible: None,
            price_usd: Some(price),
        },
        elapsed_ms(start),
    )))
}

pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<VisibilityRequest>,
) -> ApiResult<FeedAck> {
    let start = Instant::now();
    let feed_id = parse_feed_id(&id).map_err(|e| reject(e, start))?;

    let entry = state
        .feeds
        .get(&feed_id)
        .ok_or_else(|| reject(AppError::not_found(format!("Feed {} not found", id)), start))?;
    entry.handle.set_visible(req.visible);

    Ok(Json(ApiResponse::success(
        FeedAck {
            feed_id: feed_id.to_string(),
            active: entry.handle.is_active(),
            visible: Some(req.visible),
            price_usd: None,
        },
        elapsed_ms(start),
    )))
}

pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<FeedAck> {
    let start = Instant::now();
    let feed_id = parse_feed_id(&id).map_err(|e| reject(e, start))?;

    let (_, entry) = state
        .feeds
        .remove(&feed_id)
        .ok_or_else(|| reject(AppError::not_found(format!("Feed {} not found", id)), start))?;
    entry.handle.stop();
    info!("🗑️ Feed {} deleted", feed_id);

    Ok(Json(ApiResponse::success(
        FeedAck {
            feed_id: feed_id.to_string(),
            active: entry.handle.is_active(),
            visible: None,
            price_usd: None,
        },
        elapsed_ms(start),
    )))
}
