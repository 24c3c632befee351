//! Batch generation: planning, selection, affordability, the generation
//! loop, metrics and payload assembly.
//!
//! Error policy:
//! - budget / configuration problems fail before any ticket exists;
//! - deadline overrun fails mid-loop with a schema-valid partial result;
//! - strategy misses and duplicates never leave the loop.

pub mod engine;
pub mod metrics;
pub mod payload;
pub mod planner;
pub mod resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::PricingError;
use crate::ticket::StrategyTicket;

pub use engine::{BatchEngine, EngineOptions, GenerationStats, MAX_ATTEMPTS_PER_TICKET};
pub use metrics::{BatchMetrics, MetricsAccumulator, QuadrantCoverage};
pub use payload::{
    BudgetSummary, EffectiveConfig, PAYLOAD_VERSION, PayloadSchemaError,
    StrategyExecutionSummary, StrategyPayload, TicketCostBreakdownEntry, validate_payload,
};
pub use planner::{BudgetPlan, PlanningMode, TicketSlot, plan_budget};
pub use resolver::{ResolvedSize, SizeRequest, SizeSource, resolve_affordable_size};

// ─── Request ────────────────────────────────────────────────────────────

/// One requested strategy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRequest {
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_override: Option<u8>,
}

impl StrategyRequest {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            window: None,
            k_override: None,
        }
    }
}

/// Input to [`BatchEngine::generate_batch`]. Read-only during the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBatchRequest {
    pub budget_cents: u64,
    pub seed: String,
    pub strategies: Vec<StrategyRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread_budget: Option<bool>,
}

impl GenerateBatchRequest {
    pub fn new(budget_cents: u64, seed: impl Into<String>, strategies: Vec<StrategyRequest>) -> Self {
        Self {
            budget_cents,
            seed: seed.into(),
            strategies,
            k: None,
            window: None,
            timeout_ms: None,
            spread_budget: None,
        }
    }
}

// ─── Result ─────────────────────────────────────────────────────────────

/// Outcome of a batch (or the partial outcome carried by a timeout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerationResult {
    pub tickets: Vec<StrategyTicket>,
    /// Planning baseline: cost of one ticket at the batch `k`.
    pub ticket_cost_cents: u64,
    pub average_ticket_cost_cents: u64,
    pub ticket_cost_breakdown: Vec<TicketCostBreakdownEntry>,
    pub total_cost_cents: u64,
    pub budget_cents: u64,
    pub leftover_cents: u64,
    pub payload: StrategyPayload,
    pub warnings: Vec<String>,
    pub stats: GenerationStats,
}

// ─── Errors ─────────────────────────────────────────────────────────────

/// Generation-level failure.
#[derive(Debug, Error)]
pub enum BatchGenerationError {
    /// Deadline exceeded. `partial` holds everything generated so far.
    #[error(
        "GENERATION_TIMEOUT: batch exceeded {timeout_ms}ms after {} tickets",
        .partial.tickets.len()
    )]
    Timeout {
        timeout_ms: u64,
        partial: Box<BatchGenerationResult>,
    },

    #[error("NO_STRATEGY_AVAILABLE: no strategy with positive weight")]
    NoStrategyAvailable,

    #[error("UNKNOWN_STRATEGY: {name}")]
    UnknownStrategy { name: String },

    #[error("INVALID_REQUEST: {field}: {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    /// Internal defect in payload assembly, not a caller error.
    #[error("PAYLOAD_SCHEMA_VIOLATION: {0}")]
    PayloadSchemaViolation(#[from] PayloadSchemaError),
}

impl BatchGenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "GENERATION_TIMEOUT",
            Self::NoStrategyAvailable => "NO_STRATEGY_AVAILABLE",
            Self::UnknownStrategy { .. } => "UNKNOWN_STRATEGY",
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::PayloadSchemaViolation(_) => "PAYLOAD_SCHEMA_VIOLATION",
        }
    }

    /// Partial result for a timeout, if any.
    pub fn partial(&self) -> Option<&BatchGenerationResult> {
        match self {
            Self::Timeout { partial, .. } => Some(&**partial),
            _ => None,
        }
    }
}

/// Top-level error of `generate_batch`.
#[derive(Debug, Error)]
pub enum GenerateBatchError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Batch(#[from] BatchGenerationError),
}

impl GenerateBatchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pricing(e) => e.code(),
            Self::Batch(e) => e.code(),
        }
    }
}
