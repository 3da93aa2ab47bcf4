//! Constants Module - Single Source of Truth
//!
//! Chain identifiers, stable-quote symbols, upstream endpoint defaults and
//! polling limits used across the feed. Other modules read from here instead
//! of carrying their own literals.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "SwapFeed";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for upstream HTTP requests
pub const USER_AGENT: &str = "SwapFeed/0.1.0";

// ============================================
// UPSTREAM ENDPOINT DEFAULTS
// ============================================

/// Base URL of the swap data service
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";

/// Pair discovery path (`?tokenAddress=&chain=`)
pub const DEFAULT_DISCOVERY_PATH: &str = "/api/dex/pairs";

/// Token-level swap history (tier a)
pub const DEFAULT_TOKEN_SWAPS_PATH: &str = "/api/token-swaps";

/// Pool-level swap history (tier b)
pub const DEFAULT_POOL_SWAPS_PATH: &str = "/api/pool-swaps";

/// Generic aggregated real-time source (tier c)
pub const DEFAULT_AGGREGATED_PATH: &str = "/api/realtime-transactions";

/// Default timeout for upstream requests (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================
// POLLING & WINDOW DEFAULTS
// ============================================

/// Poll interval floor (ms)
pub const DEFAULT_POLL_BASE_MS: u64 = 5_000;

/// Poll interval ceiling (ms)
pub const DEFAULT_POLL_CEILING_MS: u64 = 60_000;

/// Interval multiplier applied after an exhausted cascade
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Interval multiplier applied after a successful tick
pub const DEFAULT_RECOVERY_FACTOR: f64 = 0.5;

/// Maximum records kept in a transaction window
pub const DEFAULT_WINDOW_CAPACITY: usize = 60;

/// Page size for the initial load
pub const DEFAULT_INITIAL_LIMIT: u32 = 100;

/// Page size for steady-state poll ticks
pub const DEFAULT_POLL_LIMIT: u32 = 50;

/// How long a freshly admitted hash stays highlighted (seconds)
pub const DEFAULT_HIGHLIGHT_TTL_SECS: u64 = 5;

/// Width of a reconciliation bucket (ms)
pub const BUCKET_WIDTH_MS: i64 = 60_000;

/// Timestamps below this are treated as seconds, not milliseconds
pub const SECONDS_TIMESTAMP_THRESHOLD: i64 = 1_000_000_000_000;

// ============================================
// CHAIN IDS
// ============================================

pub const CHAIN_ID_ETHEREUM: u64 = 1;
pub const CHAIN_ID_BSC: u64 = 56;
pub const CHAIN_ID_POLYGON: u64 = 137;
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
pub const CHAIN_ID_OPTIMISM: u64 = 10;
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
pub const CHAIN_ID_BASE: u64 = 8453;

/// All supported EVM chain IDs
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_AVALANCHE,
    CHAIN_ID_BASE,
];

// ============================================
// STABLE QUOTE SYMBOLS
// ============================================

/// Quote symbols pegged ~1:1 to USD (upper-case)
pub const USD_STABLE_SYMBOLS: [&str; 13] = [
    "USDT", "USDC", "DAI", "BUSD", "TUSD", "USDP", "FDUSD", "USDE", "PYUSD", "FRAX", "USDC.E",
    "USDBC", "USDT.E",
];

/// Check whether a quote symbol is a USD-pegged stable asset
pub fn is_usd_stable(symbol: &str) -> bool {
    let upper = symbol.trim().to_uppercase();
    USD_STABLE_SYMBOLS.contains(&upper.as_str())
}

// ============================================
// CHAIN NAME MAPPING
// ============================================

/// Convert numeric chain ID to the upstream chain slug
pub fn chain_id_to_slug(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("ethereum"),
        CHAIN_ID_BSC => Some("bsc"),
        CHAIN_ID_POLYGON => Some("polygon"),
        CHAIN_ID_ARBITRUM => Some("arbitrum"),
        CHAIN_ID_OPTIMISM => Some("optimism"),
        CHAIN_ID_AVALANCHE => Some("avalanche"),
        CHAIN_ID_BASE => Some("base"),
        _ => None,
    }
}

/// Canonicalize a chain identifier (slug, alias, or numeric id) to the upstream slug
pub fn canonical_chain(chain: &str) -> Option<&'static str> {
    let lowered = chain.trim().to_lowercase();
    if let Ok(id) = lowered.parse::<u64>() {
        return chain_id_to_slug(id);
    }
    match lowered.as_str() {
        "ethereum" | "eth" | "mainnet" => Some("ethereum"),
        "bsc" | "bnb" | "binance" => Some("bsc"),
        "polygon" | "matic" => Some("polygon"),
        "arbitrum" | "arb" => Some("arbitrum"),
        "optimism" | "op" => Some("optimism"),
        "avalanche" | "avax" => Some("avalanche"),
        "base" => Some("base"),
        _ => None,
    }
}

/// Human-readable chain name for logs
pub fn get_chain_name(slug: &str) -> &'static str {
    match canonical_chain(slug) {
        Some("ethereum") => "Ethereum",
        Some("bsc") => "BNB Smart Chain",
        Some("polygon") => "Polygon",
        Some("arbitrum") => "Arbitrum One",
        Some("optimism") => "Optimism",
        Some("avalanche") => "Avalanche C-Chain",
        Some("base") => "Base",
        _ => "Unknown",
    }
}
