//! Swap History Client - one HTTP client for all three source tiers
//!
//! Every tier speaks the same envelope:
//!
//! ```text
//! GET {base}{path}?tokenAddress|pairAddress=..&chain=..&order=DESC&limit=..&offset=..
//! -> { "success": bool, "transactions": [RawTransaction], "source": "..." }
//! ```
//!
//! A non-2xx status, `success: false`, a transport error or an unparseable body
//! is a tier failure. An empty list with `success: true` is returned as-is;
//! the cascade decides what "empty" means for its mode.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::config::EndpointConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::SourceTier;
use crate::utils::constants::USER_AGENT as USER_AGENT_CONST;

/// Wire envelope shared by every tier
#[derive(Debug, Clone, Deserialize)]
pub struct SwapFeedResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transactions: Option<Vec<Value>>,
    #[serde(default)]
    pub source: Option<String>,
}

/// One tier request
#[derive(Debug, Clone)]
pub struct TierRequest<'a> {
    pub tier: SourceTier,
    /// Base-token address, or pool address for the pool tier
    pub address: &'a str,
    pub chain: &'a str,
    pub limit: u32,
    pub offset: u32,
}

/// Successful tier answer
#[derive(Debug, Clone)]
pub struct TierPage {
    pub tier: SourceTier,
    pub transactions: Vec<Value>,
    /// Upstream-declared source label
    pub source: Option<String>,
}

/// HTTP client for the swap tiers
#[derive(Clone)]
pub struct SwapFeedClient {
    client: reqwest::Client,
    endpoints: EndpointConfig,
}

impl SwapFeedClient {
    pub fn new(endpoints: &EndpointConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(endpoints.http_timeout)
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorCode::ConfigInvalidValue, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            endpoints: endpoints.clone(),
        })
    }

    fn tier_url(&self, tier: SourceTier) -> String {
        let path = match tier {
            SourceTier::TokenSwaps => &self.endpoints.token_swaps_path,
            SourceTier::PoolSwaps => &self.endpoints.pool_swaps_path,
            SourceTier::Aggregated => &self.endpoints.aggregated_path,
        };
        self.endpoints.url(path)
    }

    /// Query parameter that carries the address for a tier
    fn address_param(tier: SourceTier) -> &'static str {
        match tier {
            SourceTier::PoolSwaps => "pairAddress",
            SourceTier::TokenSwaps | SourceTier::Aggregated => "tokenAddress",
        }
    }

    /// Fetch one page from a tier
    pub async fn fetch(&self, request: &TierRequest<'_>) -> AppResult<TierPage> {
        let tier = request.tier;
        let limit = request.limit.to_string();
        let offset = request.offset.to_string();

        debug!(
            "📡 {} tier: {}={} chain={} limit={} offset={}",
            tier.as_str(),
            Self::address_param(tier),
            request.address,
            request.chain,
            limit,
            offset
        );

        let response = self
            .client
            .get(self.tier_url(tier))
            .query(&[
                (Self::address_param(tier), request.address),
                ("chain", request.chain),
                ("order", "DESC"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::tier_status(tier.as_str(), status.as_u16()));
        }

        let body: SwapFeedResponse = response.json().await?;
        if !body.success {
            return Err(AppError::tier_rejected(tier.as_str()));
        }

        Ok(TierPage {
            tier,
            transactions: body.transactions.unwrap_or_default(),
            source: body.source,
        })
    }
}
