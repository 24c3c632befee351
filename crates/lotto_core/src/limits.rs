//! Betting limits port.

use serde::{Deserialize, Serialize};

/// Configured bounds for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingLimits {
    pub min_dezena_count: u8,
    pub max_dezena_count: u8,
    pub default_dezena_count: u8,
    pub max_tickets_per_batch: u32,
    pub min_budget_cents: u64,
    pub max_budget_cents: u64,
}

impl BettingLimits {
    /// Whether `k` lies within `[min_dezena_count, max_dezena_count]`.
    pub fn allows_k(&self, k: u8) -> bool {
        (self.min_dezena_count..=self.max_dezena_count).contains(&k)
    }
}

/// Source of betting limits. Read once per batch.
pub trait LimitsProvider {
    fn betting_limits(&self) -> BettingLimits;
}
