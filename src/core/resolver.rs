//! Pool Resolver
//!
//! Picks the pool the pool-level tier should poll. Resolution never fails:
//! a discovery error is logged and treated exactly like "no pool", which only
//! disables the pool tier.

use tracing::{debug, info, warn};

use crate::models::types::PairContext;
use crate::providers::dexscreener::{DexPair, DexScreenerClient};
use crate::utils::address::is_address;

/// Resolves and caches the pool address of a pair
#[derive(Clone)]
pub struct PoolResolver {
    discovery: DexScreenerClient,
}

impl PoolResolver {
    pub fn new(discovery: DexScreenerClient) -> Self {
        Self { discovery }
    }

    /// Resolve the pool for `context`, preferring a valid `candidate`.
    ///
    /// The winner is cached on the context; later calls return it without I/O.
    pub async fn resolve(&self, context: &PairContext, candidate: Option<&str>) -> Option<String> {
        if let Some(pool) = context.resolved_pool() {
            debug!("✅ Pool cached for {}: {}", context.label(), pool);
            return Some(pool.to_string());
        }

        if let Some(candidate) = candidate.map(str::trim).filter(|c| is_address(c)) {
            info!("🎯 Using upstream pool {} for {}", candidate, context.label());
            return Some(context.cache_pool(candidate.to_string()).to_string());
        }

        let pairs = match self
            .discovery
            .get_token_pairs(&context.base_token, &context.chain)
            .await
        {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("⚠️ Pool discovery failed for {}: {}", context.label(), e);
                return None;
            }
        };

        match select_pool(&pairs, context) {
            Some(pool) => {
                info!("🎯 Discovered pool {} for {}", pool, context.label());
                Some(context.cache_pool(pool).to_string())
            }
            None => {
                warn!("⚠️ No pool found for {}, pool tier disabled", context.label());
                None
            }
        }
    }
}

/// Pick the highest-liquidity pool, preferring the declared quote symbol.
pub fn select_pool(pairs: &[DexPair], context: &PairContext) -> Option<String> {
    let eligible: Vec<&DexPair> = pairs
        .iter()
        .filter(|p| is_address(p.pair_address.trim()))
        .filter(|p| {
            p.chain_id
                .as_deref()
                .map_or(true, |chain| chain.eq_ignore_ascii_case(&context.chain))
        })
        .collect();

    let quote_matches: Vec<&DexPair> = eligible
        .iter()
        .copied()
        .filter(|p| {
            p.quote_symbol()
                .map_or(false, |s| s.trim().eq_ignore_ascii_case(context.quote_symbol.trim()))
        })
        .collect();

    let candidates = if quote_matches.is_empty() {
        eligible
    } else {
        quote_matches
    };

    candidates
        .into_iter()
        .fold(None::<&DexPair>, |best, pair| match best {
            Some(b) if b.liquidity_usd() >= pair.liquidity_usd() => Some(b),
            _ => Some(pair),
        })
        .map(|p| p.pair_address.trim().to_string())
}
