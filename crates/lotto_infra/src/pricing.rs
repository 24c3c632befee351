//! Combinatorial ticket pricing.
//!
//! A k-number ticket plays every 6-number combination it contains, so it
//! costs `C(k, 6)` base tickets.

use lotto_core::limits::BettingLimits;
use lotto_core::pricing::{BudgetAllocation, PricingError, PricingErrorCode, PricingGateway};

use crate::config::EngineConfig;

/// Numbers drawn per contest; the base ticket size.
pub const DRAWN_NUMBERS: u8 = 6;

/// `C(n, r)`, or `None` on overflow.
pub fn binomial(n: u64, r: u64) -> Option<u64> {
    if r > n {
        return Some(0);
    }
    let r = r.min(n - r);
    let mut acc: u64 = 1;
    for i in 0..r {
        // acc * (n - i) is always divisible by (i + 1) at this step.
        acc = acc.checked_mul(n - i)? / (i + 1);
    }
    Some(acc)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinatorialPricing {
    base_ticket_cost_cents: u64,
    min_dezena_count: u8,
    max_dezena_count: u8,
}

impl CombinatorialPricing {
    pub fn new(base_ticket_cost_cents: u64, limits: &BettingLimits) -> Self {
        Self {
            base_ticket_cost_cents,
            min_dezena_count: limits.min_dezena_count,
            max_dezena_count: limits.max_dezena_count,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.base_ticket_cost_cents, &config.limits)
    }

    pub fn base_ticket_cost_cents(&self) -> u64 {
        self.base_ticket_cost_cents
    }
}

impl PricingGateway for CombinatorialPricing {
    fn ticket_cost(&self, k: u8) -> Result<u64, PricingError> {
        if !(self.min_dezena_count..=self.max_dezena_count).contains(&k) {
            return Err(PricingError::ticket_size_out_of_range(
                k,
                self.min_dezena_count,
                self.max_dezena_count,
            ));
        }
        binomial(u64::from(k), u64::from(DRAWN_NUMBERS))
            .and_then(|combos| combos.checked_mul(self.base_ticket_cost_cents))
            .ok_or_else(|| {
                PricingError::new(
                    PricingErrorCode::PricingUnavailable,
                    format!("cost of k={k} overflows"),
                )
            })
    }

    fn calculate_budget_allocation(
        &self,
        budget_cents: u64,
        k: u8,
    ) -> Result<BudgetAllocation, PricingError> {
        let ticket_cost_cents = self.ticket_cost(k)?;
        if ticket_cost_cents == 0 {
            return Err(PricingError::new(
                PricingErrorCode::PricingUnavailable,
                format!("zero cost for k={k}"),
            ));
        }
        let max_tickets = u32::try_from(budget_cents / ticket_cost_cents).unwrap_or(u32::MAX);
        Ok(BudgetAllocation {
            max_tickets,
            ticket_cost_cents,
            leftover_cents: budget_cents - ticket_cost_cents * u64::from(max_tickets),
        })
    }
}
