//! Swap Feed CLI - follow one pair's live swaps in the terminal
//!
//! Environment:
//!   FEED_CHAIN          - chain slug or id (default: ethereum)
//!   FEED_TOKEN_ADDRESS  - base token address (required)
//!   FEED_QUOTE_SYMBOL   - quote symbol (default: WETH)
//!   FEED_PAIR_ADDRESS   - known pool address (optional)
//!   FEED_PRICE_USD      - reference price for records without one (optional)
//!   FEED_*              - feed configuration (see FeedConfig::from_env)

use std::collections::HashSet;
use std::sync::Mutex;

use eyre::{eyre, Result};
use swap_feed::utils::address::is_address;
use swap_feed::utils::constants::{get_chain_name, APP_NAME, APP_VERSION};
use swap_feed::{FeedConfig, FeedEvent, FeedService, PairContext};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("🔭 {} v{}", APP_NAME, APP_VERSION);

    let token = std::env::var("FEED_TOKEN_ADDRESS")
        .map_err(|_| eyre!("FEED_TOKEN_ADDRESS is required"))?;
    if !is_address(token.trim()) {
        return Err(eyre!("FEED_TOKEN_ADDRESS is not a valid address: {}", token));
    }
    let chain = std::env::var("FEED_CHAIN").unwrap_or_else(|_| "ethereum".to_string());
    let quote = std::env::var("FEED_QUOTE_SYMBOL").unwrap_or_else(|_| "WETH".to_string());
    let price: f64 = std::env::var("FEED_PRICE_USD")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0.0);

    let mut context = PairContext::new(chain, token.trim(), quote);
    if let Ok(pool) = std::env::var("FEED_PAIR_ADDRESS") {
        context = context.with_candidate_pool(pool);
    }

    let config = FeedConfig::from_env()?;
    let service = FeedService::new(config)?;

    info!(
        "📡 Following {} on {}",
        context.label(),
        get_chain_name(&context.chain)
    );

    // Print each transaction once, newest last within a batch
    let printed = Mutex::new(HashSet::<String>::new());
    let (_price_tx, price_rx) = watch::channel(price);

    let handle = service.start_feed(context, price_rx, move |event| match event {
        FeedEvent::Snapshot { transactions, .. } => {
            let mut printed = printed.lock().unwrap_or_else(|e| e.into_inner());
            for tx in transactions.iter().rev() {
                if printed.insert(tx.hash.clone()) {
                    info!("{}", tx.summary());
                }
            }
        }
        FeedEvent::Error { message, retryable, .. } => {
            if retryable {
                warn!("⏳ {} (retrying)", message);
            } else {
                error!("❌ {}", message);
            }
        }
        FeedEvent::Stopped => info!("🏁 Feed stopped"),
    });

    let _ = tokio::signal::ctrl_c().await;
    info!("🛑 Shutting down gracefully...");

    let status = handle.status();
    info!("📊 Final Statistics:");
    info!("   Ticks:     {}", status.ticks);
    info!("   Successes: {}", status.successes);
    info!("   Failures:  {}", status.failures);
    info!("   Interval:  {}ms", status.interval_ms);
    info!("   Window:    {} transactions", handle.snapshot().len());

    handle.shutdown().await;
    Ok(())
}
