//! Swap Feed Library
//!
//! Real-time on-chain swap feed for a single token pair:
//! - Pool resolution via pair discovery
//! - Tiered upstream fallback (token → pool → aggregated)
//! - Normalization of inconsistent swap records
//! - Deduplicated, minute-bucketed transaction window
//! - Adaptive polling with backoff and recovery

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    FeedHandle, FeedService, FeedSupervisor, PoolResolver, SourceCascade, TransactionWindow,
};
pub use models::{
    AppError, AppResult, ErrorCode, FeedConfig, FeedEvent, FeedStatus, NormalizedTransaction,
    PairContext, TradeSide,
};
