//! Swap Feed API Server
//!
//! REST API for starting and steering live swap feeds
//!
//! Usage:
//!   cargo run --bin swap_feed_api
//!
//! Environment:
//!   PORT / SWAP_FEED_PORT - Server port (default: 8080)
//!   SWAP_FEED_HOST        - Server host (default: 0.0.0.0)
//!   FEED_*                - Feed configuration (see FeedConfig::from_env)
//!   RUST_LOG              - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use swap_feed::api::{create_router, start_cleanup_task, AppState};
use swap_feed::utils::constants::{APP_NAME, APP_VERSION};
use swap_feed::{FeedConfig, FeedService};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = FeedConfig::from_env()?;
    let service = FeedService::new(config)?;
    let state = Arc::new(AppState::new(service));

    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    let app = create_router(state.clone());

    let host = std::env::var("SWAP_FEED_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("SWAP_FEED_PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("🚀 {} API v{} starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("");
    info!("Endpoints:");
    info!("  POST   /v1/feeds                 - Start a feed");
    info!("  GET    /v1/feeds/:id             - Window + status");
    info!("  PUT    /v1/feeds/:id/price       - Update reference price");
    info!("  POST   /v1/feeds/:id/visibility  - Report host visibility");
    info!("  DELETE /v1/feeds/:id             - Stop a feed");
    info!("  GET    /v1/health                - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("");
    info!("🛑 Shutdown signal received, stopping {} feeds...", state.feeds.len());
    state.stop_all();
    info!("👋 {} API shutdown complete", APP_NAME);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════╗
    ║                                              ║
    ║        S W A P   F E E D   A P I             ║
    ║     real-time on-chain swap activity         ║
    ║                                              ║
    ╚══════════════════════════════════════════════╝
    "#
    );
}
