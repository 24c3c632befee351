//! Budget → ticket slot planning.
//!
//! **Concentrated:** `calculate_budget_allocation(budget, k)` homogeneous
//! slots, clamped to `max_tickets_per_batch`.
//!
//! **Spread:** candidate sizes `{k-1, k, k+1, k+2}` clipped to the limits.
//! Each pass walks the candidates in descending cost order and allocates
//! every one that still fits, once. Planning stops when the remaining budget
//! is below the cheapest candidate, the batch cap is reached, or a whole pass
//! allocates nothing. Zero spread slots falls back to concentrated.
//!
//! The spread allocator is greedy and must stay that way: its preference
//! order is observable in the emitted breakdown.

use serde::{Deserialize, Serialize};

use crate::limits::BettingLimits;
use crate::pricing::{PricingError, TicketCostCache};

/// A planned-but-unfilled ticket position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSlot {
    pub index: usize,
    pub k: u8,
    pub cost_cents: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanningMode {
    Concentrated,
    Spread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPlan {
    pub slots: Vec<TicketSlot>,
    pub planned_leftover_cents: u64,
    /// Cost of one ticket at the batch `k`.
    pub base_ticket_cost_cents: u64,
    pub planned_tickets: usize,
    pub mode: PlanningMode,
}

impl BudgetPlan {
    /// Cheapest planned slot, or the baseline when there are no slots.
    pub fn min_slot_cost(&self) -> u64 {
        self.slots
            .iter()
            .map(|s| s.cost_cents)
            .min()
            .unwrap_or(self.base_ticket_cost_cents)
    }
}

/// Plan the slots for one batch.
///
/// Fails with `BUDGET_BELOW_MIN` when no slot can be planned.
pub fn plan_budget(
    budget_cents: u64,
    k: u8,
    spread_budget: bool,
    limits: &BettingLimits,
    costs: &mut TicketCostCache<'_>,
) -> Result<BudgetPlan, PricingError> {
    let base_ticket_cost_cents = costs.cost(k)?;

    if spread_budget {
        let plan = plan_spread(budget_cents, k, limits, costs, base_ticket_cost_cents)?;
        if plan.planned_tickets > 0 {
            return Ok(plan);
        }
        tracing::debug!(budget_cents, k, "spread planning produced no slots; falling back");
    }

    let plan = plan_concentrated(budget_cents, k, limits, costs, base_ticket_cost_cents)?;
    if plan.planned_tickets == 0 {
        return Err(PricingError::budget_below_min(
            budget_cents,
            base_ticket_cost_cents,
        ));
    }
    Ok(plan)
}

fn plan_concentrated(
    budget_cents: u64,
    k: u8,
    limits: &BettingLimits,
    costs: &mut TicketCostCache<'_>,
    base_ticket_cost_cents: u64,
) -> Result<BudgetPlan, PricingError> {
    let allocation = costs.allocation(budget_cents, k)?;
    let count = allocation.max_tickets.min(limits.max_tickets_per_batch) as usize;
    let slots: Vec<TicketSlot> = (0..count)
        .map(|index| TicketSlot {
            index,
            k,
            cost_cents: base_ticket_cost_cents,
        })
        .collect();
    let spent = base_ticket_cost_cents.saturating_mul(count as u64);

    Ok(BudgetPlan {
        planned_tickets: slots.len(),
        slots,
        planned_leftover_cents: budget_cents.saturating_sub(spent),
        base_ticket_cost_cents,
        mode: PlanningMode::Concentrated,
    })
}

fn plan_spread(
    budget_cents: u64,
    k: u8,
    limits: &BettingLimits,
    costs: &mut TicketCostCache<'_>,
    base_ticket_cost_cents: u64,
) -> Result<BudgetPlan, PricingError> {
    let mut candidates: Vec<(u8, u64)> = Vec::with_capacity(4);
    for offset in [-1i16, 0, 1, 2] {
        let size = i16::from(k) + offset;
        let Ok(size) = u8::try_from(size) else {
            continue;
        };
        if !limits.allows_k(size) || candidates.iter().any(|(c, _)| *c == size) {
            continue;
        }
        candidates.push((size, costs.cost(size)?));
    }
    // Most expensive first; ties broken toward the larger size.
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let cap = limits.max_tickets_per_batch as usize;
    let mut slots: Vec<TicketSlot> = Vec::new();
    let mut remaining = budget_cents;

    if let Some(cheapest) = candidates.iter().map(|(_, c)| *c).min() {
        while remaining >= cheapest && slots.len() < cap {
            let mut allocated = false;
            for &(size, cost) in &candidates {
                if slots.len() >= cap {
                    break;
                }
                if cost <= remaining {
                    slots.push(TicketSlot {
                        index: slots.len(),
                        k: size,
                        cost_cents: cost,
                    });
                    remaining -= cost;
                    allocated = true;
                }
            }
            if !allocated {
                break;
            }
        }
    }

    Ok(BudgetPlan {
        planned_tickets: slots.len(),
        slots,
        planned_leftover_cents: remaining,
        base_ticket_cost_cents,
        mode: PlanningMode::Spread,
    })
}
