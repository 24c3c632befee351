//! Pricing port consumed by the planner and the affordability resolver.
//!
//! The pricing table itself lives outside the engine; only its contract is
//! used here. All amounts are integer cents.

pub mod cost_cache;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cost_cache::TicketCostCache;

/// How many tickets of one size a budget buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub max_tickets: u32,
    pub ticket_cost_cents: u64,
    pub leftover_cents: u64,
}

/// Ticket pricing contract.
///
/// Implementations must be deterministic for the duration of one batch.
pub trait PricingGateway {
    /// Cost in cents of one ticket with `k` numbers.
    fn ticket_cost(&self, k: u8) -> Result<u64, PricingError>;

    /// Split `budget_cents` into homogeneous tickets of size `k`.
    fn calculate_budget_allocation(
        &self,
        budget_cents: u64,
        k: u8,
    ) -> Result<BudgetAllocation, PricingError>;
}

/// Stable machine code for a pricing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PricingErrorCode {
    BudgetBelowMin,
    BudgetAboveMax,
    TicketSizeOutOfRange,
    KOverrideUnaffordable,
    PricingUnavailable,
}

impl PricingErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetBelowMin => "BUDGET_BELOW_MIN",
            Self::BudgetAboveMax => "BUDGET_ABOVE_MAX",
            Self::TicketSizeOutOfRange => "TICKET_SIZE_OUT_OF_RANGE",
            Self::KOverrideUnaffordable => "K_OVERRIDE_UNAFFORDABLE",
            Self::PricingUnavailable => "PRICING_UNAVAILABLE",
        }
    }
}

impl fmt::Display for PricingErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget-level failure. Raised before any ticket exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct PricingError {
    pub code: PricingErrorCode,
    pub message: String,
}

impl PricingError {
    pub fn new(code: PricingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn budget_below_min(budget_cents: u64, min_cents: u64) -> Self {
        Self::new(
            PricingErrorCode::BudgetBelowMin,
            format!("budget {budget_cents} cents is below the minimum of {min_cents} cents"),
        )
    }

    pub fn budget_above_max(budget_cents: u64, max_cents: u64) -> Self {
        Self::new(
            PricingErrorCode::BudgetAboveMax,
            format!("budget {budget_cents} cents exceeds the maximum of {max_cents} cents"),
        )
    }

    pub fn ticket_size_out_of_range(k: u8, min: u8, max: u8) -> Self {
        Self::new(
            PricingErrorCode::TicketSizeOutOfRange,
            format!("ticket size {k} outside allowed range {min}..={max}"),
        )
    }

    pub fn k_override_unaffordable(k: u8, cost_cents: u64, budget_cents: u64) -> Self {
        Self::new(
            PricingErrorCode::KOverrideUnaffordable,
            format!(
                "kOverride {k} costs {cost_cents} cents which exceeds the budget of {budget_cents} cents"
            ),
        )
    }

    /// Stable code string (e.g. `BUDGET_BELOW_MIN`).
    pub fn code(&self) -> &'static str {
        self.code.as_str()
    }
}
