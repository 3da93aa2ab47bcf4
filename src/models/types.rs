//! Type definitions for the swap feed
//! Core data structures shared by the cascade, normalizer, window and poller

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::errors::{AppError, ErrorCode};
use crate::utils::constants::{canonical_chain, is_usd_stable};

/// Direction of a swap relative to the base token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    /// Parse an upstream type label; anything but buy/sell is unclassified
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "buy" => Some(TradeSide::Buy),
            "sell" => Some(TradeSide::Sell),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TradeSide::Buy => "🟢",
            TradeSide::Sell => "🔴",
        }
    }
}

/// Upstream data-source tier, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Token-level swap history keyed by base-token address
    TokenSwaps,
    /// Pool-level swap history keyed by the resolved pool address
    PoolSwaps,
    /// Generic aggregated real-time source keyed by base-token address
    Aggregated,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::TokenSwaps => "token_swaps",
            SourceTier::PoolSwaps => "pool_swaps",
            SourceTier::Aggregated => "aggregated",
        }
    }
}

/// Per-session pair descriptor.
///
/// Everything except the resolved pool is fixed at construction. The pool is
/// written at most once; a pair change builds a fresh context instead of
/// mutating this one.
#[derive(Debug, Clone)]
pub struct PairContext {
    /// Upstream chain slug (e.g. "ethereum", "bsc", "base")
    pub chain: String,
    /// Base token contract address
    pub base_token: String,
    /// Declared quote symbol (e.g. "WETH", "USDC")
    pub quote_symbol: String,
    /// Quote is a USD-pegged stable asset
    pub quote_is_stable: bool,
    /// Pool address taken from upstream pair metadata, unvalidated
    pub candidate_pool: Option<String>,
    resolved_pool: OnceLock<String>,
}

impl PairContext {
    pub fn new(
        chain: impl Into<String>,
        base_token: impl Into<String>,
        quote_symbol: impl Into<String>,
    ) -> Self {
        let chain = chain.into();
        let quote_symbol = quote_symbol.into();
        let chain = canonical_chain(&chain)
            .map(String::from)
            .unwrap_or_else(|| chain.trim().to_lowercase());

        Self {
            chain,
            base_token: base_token.into().trim().to_string(),
            quote_is_stable: is_usd_stable(&quote_symbol),
            quote_symbol,
            candidate_pool: None,
            resolved_pool: OnceLock::new(),
        }
    }

    /// Override the stable-quote flag derived from the symbol
    pub fn with_stable_quote(mut self, stable: bool) -> Self {
        self.quote_is_stable = stable;
        self
    }

    /// Attach a candidate pool address from upstream pair metadata
    pub fn with_candidate_pool(mut self, pool: impl Into<String>) -> Self {
        self.candidate_pool = Some(pool.into().trim().to_string());
        self
    }

    /// Resolved pool address, if resolution already succeeded
    pub fn resolved_pool(&self) -> Option<&str> {
        self.resolved_pool.get().map(String::as_str)
    }

    /// Cache a resolved pool. The first write wins.
    pub fn cache_pool(&self, pool: String) -> &str {
        self.resolved_pool.get_or_init(|| pool).as_str()
    }

    /// Short label for logs
    pub fn label(&self) -> String {
        format!("{}/{} on {}", short(&self.base_token), self.quote_symbol, self.chain)
    }
}

fn short(address: &str) -> &str {
    address.get(..10).unwrap_or(address)
}

/// Normalizer output: canonical fields with a possibly unresolved side
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub hash: String,
    pub timestamp_ms: i64,
    pub side: Option<TradeSide>,
    pub base_amount: f64,
    pub quote_amount: f64,
    pub price_usd: f64,
    pub total_value_usd: f64,
    pub maker_wallet: Option<String>,
    pub source: String,
}

/// Canonical transaction kept in the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub hash: String,
    pub timestamp_ms: i64,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub base_amount: f64,
    pub quote_amount: f64,
    pub price_usd: f64,
    pub total_value_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maker_wallet: Option<String>,
    pub source: String,
}

impl NormalizedTransaction {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} {} {:.4} @ ${:.6} (${:.2}) TX: {}",
            self.side.emoji(),
            self.side.as_str().to_uppercase(),
            self.base_amount,
            self.price_usd,
            self.total_value_usd,
            short(&self.hash),
        )
    }
}

impl TryFrom<NormalizedRecord> for NormalizedTransaction {
    type Error = AppError;

    fn try_from(record: NormalizedRecord) -> Result<Self, Self::Error> {
        let side = record
            .side
            .ok_or_else(|| AppError::record_skipped(&record.hash))?;

        Ok(Self {
            hash: record.hash,
            timestamp_ms: record.timestamp_ms,
            side,
            base_amount: record.base_amount,
            quote_amount: record.quote_amount,
            price_usd: record.price_usd,
            total_value_usd: record.total_value_usd,
            maker_wallet: record.maker_wallet,
            source: record.source,
        })
    }
}

/// Lifecycle phase of a feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    Idle,
    Scheduled,
    InFlight,
    Stopped,
}

/// Observable state of a feed session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub phase: FeedPhase,
    pub interval_ms: u64,
    pub generation: u64,
    pub pool_address: Option<String>,
    pub seeded: bool,
    pub ticks: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_tier: Option<SourceTier>,
}

impl FeedStatus {
    pub fn new(interval_ms: u64, generation: u64) -> Self {
        Self {
            phase: FeedPhase::Idle,
            interval_ms,
            generation,
            pool_address: None,
            seeded: false,
            ticks: 0,
            successes: 0,
            failures: 0,
            last_error: None,
            last_tier: None,
        }
    }
}

/// Update delivered to a feed consumer
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Current window after an initial load or a merge that admitted records
    Snapshot {
        transactions: Vec<NormalizedTransaction>,
        new_hashes: Vec<String>,
        tier: Option<SourceTier>,
    },
    /// Cascade exhausted; the last good window stays valid
    Error {
        code: ErrorCode,
        message: String,
        retryable: bool,
    },
    /// Session ended
    Stopped,
}
