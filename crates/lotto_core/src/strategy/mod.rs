//! Strategy contracts.
//!
//! The strategy set is closed: every `StrategyName` variant resolves to a
//! handler through [`StrategyRegistry::handler`], so a lookup cannot miss at
//! runtime. Adding a strategy means adding a variant.

pub mod builtin;
pub mod selector;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::TicketMetadata;

pub use builtin::{
    BalancedStrategy, BuiltinStrategies, FrequencyBias, FrequencyStrategy, UniformStrategy,
};
pub use selector::{NormalizedStrategy, StrategySelector, normalize_strategies, select_strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyName {
    Uniform,
    Balanced,
    HotStreak,
    ColdSurge,
}

impl StrategyName {
    pub const ALL: [StrategyName; 4] = [
        StrategyName::Uniform,
        StrategyName::Balanced,
        StrategyName::HotStreak,
        StrategyName::ColdSurge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Balanced => "balanced",
            Self::HotStreak => "hot-streak",
            Self::ColdSurge => "cold-surge",
        }
    }

    /// Parse a request name. Accepts `_` in place of `-` and ignores case.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs handed to a handler for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyContext<'a> {
    /// Per-attempt derived seed label.
    pub seed: &'a str,
    pub k: u8,
    /// Historical window (draw count) for frequency-driven strategies.
    pub window: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub numbers: Vec<u8>,
    pub metadata: TicketMetadata,
}

/// Expected, recoverable handler failure. Absorbed by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("no draw history available for window {window}")]
    InsufficientHistory { window: u32 },

    #[error("invalid strategy output: {reason}")]
    InvalidOutput { reason: String },

    #[error("strategy failed: {reason}")]
    Failed { reason: String },
}

/// A number-selection algorithm. Must be deterministic given its seed.
pub trait StrategyHandler {
    fn generate(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError>;
}

/// Total mapping from strategy name to handler.
pub trait StrategyRegistry {
    fn handler(&self, name: StrategyName) -> &dyn StrategyHandler;
}

/// Historical hit counts supplied by the analytics layer.
///
/// `frequencies(window)[i]` is the number of times `i + 1` was drawn in the
/// last `window` draws. An empty vector means no history is available.
pub trait DrawHistory {
    fn frequencies(&self, window: u32) -> Vec<u32>;
}

/// History source with no data. Frequency strategies fail against it and the
/// batch recovers through the uniform fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHistory;

impl DrawHistory for EmptyHistory {
    fn frequencies(&self, _window: u32) -> Vec<u32> {
        Vec::new()
    }
}
