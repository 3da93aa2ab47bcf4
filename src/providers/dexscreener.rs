//! DexScreener Pair Discovery Client
//!
//! Used to find the pool for a token when upstream pair metadata did not carry
//! a usable one. The discovery endpoint is queried with `tokenAddress` and
//! `chain` and answers either the wrapped `{ data: { pairs } }` shape or the
//! DexScreener-native `{ pairs }` shape.
//!
//! Discovery data is only a routing hint: it picks which pool to poll, it is
//! never used as a price source.

use eyre::{eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::config::EndpointConfig;
use crate::utils::constants::USER_AGENT as USER_AGENT_CONST;

/// Pair discovery response (both accepted shapes)
#[derive(Debug, Default, Deserialize)]
pub struct DexScreenerResponse {
    #[serde(default)]
    pub data: Option<DexPairList>,
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

impl DexScreenerResponse {
    /// Pairs from whichever shape the upstream used
    pub fn into_pairs(self) -> Vec<DexPair> {
        self.data
            .and_then(|d| d.pairs)
            .or(self.pairs)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DexPairList {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A trading pair from discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    /// Chain slug (e.g., "ethereum", "bsc", "base")
    #[serde(default)]
    pub chain_id: Option<String>,
    /// Pair address
    pub pair_address: String,
    /// Quote token info (usually WETH/WBNB/USDT)
    #[serde(default)]
    pub quote_token: Option<DexToken>,
    /// Liquidity info
    #[serde(default)]
    pub liquidity: Option<DexLiquidity>,
}

impl DexPair {
    /// Liquidity in USD, 0 when missing
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Quote token symbol, if reported
    pub fn quote_symbol(&self) -> Option<&str> {
        self.quote_token.as_ref().and_then(|t| t.symbol.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexToken {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

/// Pair discovery client
#[derive(Clone)]
pub struct DexScreenerClient {
    client: reqwest::Client,
    url: String,
}

impl DexScreenerClient {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(endpoints.http_timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            url: endpoints.url(&endpoints.discovery_path),
        })
    }

    /// Fetch all pairs for a token on a chain.
    /// Returns pairs sorted by liquidity (highest first).
    pub async fn get_token_pairs(&self, token_address: &str, chain: &str) -> Result<Vec<DexPair>> {
        debug!("🔍 Discovery: Fetching pairs for {} on {}", token_address, chain);

        let response = self
            .client
            .get(&self.url)
            .query(&[("tokenAddress", token_address), ("chain", chain)])
            .send()
            .await
            .map_err(|e| eyre!("Pair discovery request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("Pair discovery API error: {}", response.status()));
        }

        let data: DexScreenerResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse pair discovery response: {}", e))?;

        let mut pairs = data.into_pairs();

        // Sort by liquidity (highest first)
        pairs.sort_by(|a, b| {
            b.liquidity_usd()
                .partial_cmp(&a.liquidity_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!("📊 Discovery: Found {} pairs for {}", pairs.len(), token_address);

        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_shape() {
        let json = r#"{"data":{"pairs":[{"pairAddress":"0x01","quoteToken":{"symbol":"WETH"},"liquidity":{"usd":12.5}}]}}"#;
        let pairs = serde_json::from_str::<DexScreenerResponse>(json).unwrap().into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].quote_symbol(), Some("WETH"));
        assert_eq!(pairs[0].liquidity_usd(), 12.5);
    }

    #[test]
    fn test_native_shape() {
        let json = r#"{"schemaVersion":"1.0.0","pairs":[{"chainId":"base","dexId":"uniswap","pairAddress":"0x02"}]}"#;
        let pairs = serde_json::from_str::<DexScreenerResponse>(json).unwrap().into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].chain_id.as_deref(), Some("base"));
        assert_eq!(pairs[0].liquidity_usd(), 0.0);
    }

    #[test]
    fn test_null_pairs() {
        let pairs = serde_json::from_str::<DexScreenerResponse>(r#"{"pairs":null}"#)
            .unwrap()
            .into_pairs();
        assert!(pairs.is_empty());
    }
}
