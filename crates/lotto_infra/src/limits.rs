//! Static limits provider.

use lotto_core::limits::{BettingLimits, LimitsProvider};

use crate::config::EngineConfig;

/// Serves one fixed `BettingLimits` snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLimitsProvider {
    limits: BettingLimits,
}

impl StaticLimitsProvider {
    pub fn new(limits: BettingLimits) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.limits.clone())
    }
}

impl LimitsProvider for StaticLimitsProvider {
    fn betting_limits(&self) -> BettingLimits {
        self.limits.clone()
    }
}
