//! Configuration module for the swap feed
//!
//! Defaults come from utils/constants.rs; `from_env` layers environment
//! overrides on top and `validate` rejects inconsistent poll bounds.

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_AGGREGATED_PATH, DEFAULT_API_BASE_URL, DEFAULT_BACKOFF_FACTOR,
    DEFAULT_DISCOVERY_PATH, DEFAULT_HIGHLIGHT_TTL_SECS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_INITIAL_LIMIT, DEFAULT_POLL_BASE_MS, DEFAULT_POLL_CEILING_MS, DEFAULT_POLL_LIMIT,
    DEFAULT_POOL_SWAPS_PATH, DEFAULT_RECOVERY_FACTOR, DEFAULT_TOKEN_SWAPS_PATH,
    DEFAULT_WINDOW_CAPACITY,
};

/// Upstream endpoints
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL shared by every path below
    pub api_base_url: String,
    pub discovery_path: String,
    pub token_swaps_path: String,
    pub pool_swaps_path: String,
    pub aggregated_path: String,
    /// Timeout applied to each upstream request
    pub http_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            discovery_path: DEFAULT_DISCOVERY_PATH.to_string(),
            token_swaps_path: DEFAULT_TOKEN_SWAPS_PATH.to_string(),
            pool_swaps_path: DEFAULT_POOL_SWAPS_PATH.to_string(),
            aggregated_path: DEFAULT_AGGREGATED_PATH.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl EndpointConfig {
    /// Endpoints rooted at a different base URL (used by tests and local mocks)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Join base URL and path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

/// Adaptive poll bounds
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval floor (ms)
    pub base_ms: u64,
    /// Interval ceiling (ms)
    pub ceiling_ms: u64,
    /// Multiplier after an exhausted cascade (> 1)
    pub backoff_factor: f64,
    /// Multiplier after a successful tick (0..1)
    pub recovery_factor: f64,
    /// Page size for the initial load
    pub initial_limit: u32,
    /// Page size for steady-state ticks
    pub poll_limit: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_ms: DEFAULT_POLL_BASE_MS,
            ceiling_ms: DEFAULT_POLL_CEILING_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            recovery_factor: DEFAULT_RECOVERY_FACTOR,
            initial_limit: DEFAULT_INITIAL_LIMIT,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }
}

/// Complete feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub endpoints: EndpointConfig,
    pub poll: PollConfig,
    /// Maximum records kept in a window
    pub window_capacity: usize,
    /// How long new hashes stay highlighted
    pub highlight_ttl: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            poll: PollConfig::default(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            highlight_ttl: Duration::from_secs(DEFAULT_HIGHLIGHT_TTL_SECS),
        }
    }
}

impl FeedConfig {
    /// Defaults overridden by `FEED_*` environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FEED_API_BASE_URL") {
            if !url.is_empty() {
                config.endpoints.api_base_url = url;
            }
        }
        env_string("FEED_DISCOVERY_PATH", &mut config.endpoints.discovery_path);
        env_string("FEED_TOKEN_SWAPS_PATH", &mut config.endpoints.token_swaps_path);
        env_string("FEED_POOL_SWAPS_PATH", &mut config.endpoints.pool_swaps_path);
        env_string("FEED_AGGREGATED_PATH", &mut config.endpoints.aggregated_path);

        if let Some(secs) = env_parse::<u64>("FEED_HTTP_TIMEOUT_SECS") {
            config.endpoints.http_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse("FEED_POLL_BASE_MS") {
            config.poll.base_ms = v;
        }
        if let Some(v) = env_parse("FEED_POLL_CEILING_MS") {
            config.poll.ceiling_ms = v;
        }
        if let Some(v) = env_parse("FEED_BACKOFF_FACTOR") {
            config.poll.backoff_factor = v;
        }
        if let Some(v) = env_parse("FEED_RECOVERY_FACTOR") {
            config.poll.recovery_factor = v;
        }
        if let Some(v) = env_parse("FEED_INITIAL_LIMIT") {
            config.poll.initial_limit = v;
        }
        if let Some(v) = env_parse("FEED_POLL_LIMIT") {
            config.poll.poll_limit = v;
        }
        if let Some(v) = env_parse("FEED_WINDOW_CAPACITY") {
            config.window_capacity = v;
        }
        if let Some(secs) = env_parse::<u64>("FEED_HIGHLIGHT_TTL_SECS") {
            config.highlight_ttl = Duration::from_secs(secs);
        }

        config.validate()?;
        info!(
            "⚙️ Feed config: base={} poll={}..{}ms window={}",
            config.endpoints.api_base_url,
            config.poll.base_ms,
            config.poll.ceiling_ms,
            config.window_capacity
        );
        Ok(config)
    }

    /// Reject bounds the poller cannot honour
    pub fn validate(&self) -> AppResult<()> {
        let poll = &self.poll;
        if poll.base_ms == 0 {
            return Err(AppError::invalid_config("poll base_ms must be > 0"));
        }
        if poll.ceiling_ms < poll.base_ms {
            return Err(AppError::invalid_config(format!(
                "poll ceiling_ms ({}) below base_ms ({})",
                poll.ceiling_ms, poll.base_ms
            )));
        }
        if !(poll.backoff_factor.is_finite() && poll.backoff_factor > 1.0) {
            return Err(AppError::invalid_config("backoff_factor must be > 1"));
        }
        if !(poll.recovery_factor.is_finite()
            && poll.recovery_factor > 0.0
            && poll.recovery_factor < 1.0)
        {
            return Err(AppError::invalid_config("recovery_factor must be in (0, 1)"));
        }
        if self.window_capacity == 0 {
            return Err(AppError::invalid_config("window_capacity must be > 0"));
        }
        if poll.initial_limit == 0 || poll.poll_limit == 0 {
            return Err(AppError::invalid_config("page limits must be > 0"));
        }
        Ok(())
    }
}

fn env_string(key: &str, slot: &mut String) {
    if let Ok(value) = std::env::var(key) {
        if !value.is_empty() {
            *slot = value;
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("⚠️ Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}
