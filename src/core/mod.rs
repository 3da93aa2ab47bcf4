//! Core Module - Feed Pipeline
//!
//! Pool resolution, tier cascade, normalization, reconciliation and the
//! adaptive poller that drives them.

pub mod cascade;
pub mod normalizer;
pub mod poller;
pub mod reconcile;
pub mod resolver;

pub use cascade::*;
pub use normalizer::*;
pub use poller::*;
pub use reconcile::*;
pub use resolver::*;
