//! Source Cascade
//!
//! Tries the swap tiers strictly in order until one answers with data:
//! token-level → pool-level (only when a pool is resolved) → aggregated.
//! Every per-tier failure collapses into "try the next tier"; only when all
//! tiers fail does the caller see `CascadeExhausted`.

use tracing::{debug, error, info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{PairContext, SourceTier};
use crate::providers::swaps::{SwapFeedClient, TierPage, TierRequest};

/// Which tiers run and how an empty answer is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeMode {
    /// Initial load: all tiers, only a non-empty list counts as success
    Initial,
    /// Steady-state tick: pool + aggregated, an empty `success: true` answer
    /// means "nothing new" rather than failure
    Poll,
}

impl CascadeMode {
    pub fn tiers(&self) -> &'static [SourceTier] {
        match self {
            CascadeMode::Initial => &[
                SourceTier::TokenSwaps,
                SourceTier::PoolSwaps,
                SourceTier::Aggregated,
            ],
            CascadeMode::Poll => &[SourceTier::PoolSwaps, SourceTier::Aggregated],
        }
    }
}

/// Result of one cascade run
#[derive(Debug)]
pub enum CascadeOutcome {
    /// A tier produced transactions
    Data(TierPage),
    /// Poll mode only: a tier answered successfully with nothing new
    Quiet { tier: SourceTier },
    /// Every attempted tier failed
    Exhausted(AppError),
}

impl CascadeOutcome {
    /// Whether the run counts as a successful response
    pub fn is_success(&self) -> bool {
        !matches!(self, CascadeOutcome::Exhausted(_))
    }
}

/// Ordered tier fallback over one swap client
#[derive(Clone)]
pub struct SourceCascade {
    client: SwapFeedClient,
}

impl SourceCascade {
    pub fn new(client: SwapFeedClient) -> Self {
        Self { client }
    }

    /// Fetch one tier for a context. The pool tier fails with
    /// `POOL_NOT_FOUND` when no pool is resolved.
    pub async fn fetch_tier(
        &self,
        context: &PairContext,
        tier: SourceTier,
        limit: u32,
    ) -> AppResult<TierPage> {
        let address = match tier {
            SourceTier::PoolSwaps => context
                .resolved_pool()
                .ok_or_else(|| AppError::pool_not_found(&context.base_token))?,
            SourceTier::TokenSwaps | SourceTier::Aggregated => context.base_token.as_str(),
        };

        self.client
            .fetch(&TierRequest {
                tier,
                address,
                chain: &context.chain,
                limit,
                offset: 0,
            })
            .await
    }

    /// Run the cascade for `mode`
    pub async fn run(&self, context: &PairContext, mode: CascadeMode, limit: u32) -> CascadeOutcome {
        let mut attempted = 0usize;
        let mut quiet_tier = None;

        for &tier in mode.tiers() {
            if tier == SourceTier::PoolSwaps && context.resolved_pool().is_none() {
                debug!("⏭️ Skipping pool tier for {} (no pool)", context.label());
                continue;
            }
            attempted += 1;

            match self.fetch_tier(context, tier, limit).await {
                Ok(page) if !page.transactions.is_empty() => {
                    info!(
                        "📥 {} tier answered {} records for {}",
                        tier.as_str(),
                        page.transactions.len(),
                        context.label()
                    );
                    return CascadeOutcome::Data(page);
                }
                Ok(_) => {
                    debug!("📭 {}", AppError::tier_empty(tier.as_str()));
                    if mode == CascadeMode::Poll && quiet_tier.is_none() {
                        quiet_tier = Some(tier);
                    }
                }
                Err(e) if e.code.is_tier_failure() => {
                    warn!("⚠️ {} tier failed for {}: {}", tier.as_str(), context.label(), e);
                }
                Err(e) => {
                    error!("❌ {} tier error for {}: {}", tier.as_str(), context.label(), e);
                }
            }
        }

        match quiet_tier {
            Some(tier) => CascadeOutcome::Quiet { tier },
            None => {
                warn!("🚫 All source tiers failed for {}", context.label());
                CascadeOutcome::Exhausted(AppError::cascade_exhausted(attempted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order() {
        assert_eq!(
            CascadeMode::Initial.tiers(),
            &[SourceTier::TokenSwaps, SourceTier::PoolSwaps, SourceTier::Aggregated]
        );
        assert_eq!(
            CascadeMode::Poll.tiers(),
            &[SourceTier::PoolSwaps, SourceTier::Aggregated]
        );
    }

    #[test]
    fn test_outcome_success() {
        assert!(CascadeOutcome::Quiet { tier: SourceTier::Aggregated }.is_success());
        assert!(!CascadeOutcome::Exhausted(AppError::cascade_exhausted(2)).is_success());
    }
}
