//! Providers Module - External Data Sources
//!
//! HTTP clients for pair discovery and the swap-history tiers.

pub mod dexscreener;
pub mod swaps;

pub use dexscreener::*;
pub use swaps::*;
