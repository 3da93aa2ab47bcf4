//! Utils Module - Helper Functions & Shared Utilities

pub mod address;
pub mod cache;
pub mod constants;

pub use address::*;
pub use cache::*;
pub use constants::*;
