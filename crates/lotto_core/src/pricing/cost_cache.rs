//! Per-batch memo of ticket costs.
//!
//! Scoped to one `generate_batch` call. Never shared across requests, since
//! two requests may run against different limits or pricing snapshots.

use std::collections::BTreeMap;

use super::{BudgetAllocation, PricingError, PricingGateway};

pub struct TicketCostCache<'a> {
    gateway: &'a dyn PricingGateway,
    costs: BTreeMap<u8, u64>,
    hits_total: u64,
    misses_total: u64,
}

impl<'a> TicketCostCache<'a> {
    pub fn new(gateway: &'a dyn PricingGateway) -> Self {
        Self {
            gateway,
            costs: BTreeMap::new(),
            hits_total: 0,
            misses_total: 0,
        }
    }

    /// Memoized `ticket_cost(k)`. Errors are not cached.
    pub fn cost(&mut self, k: u8) -> Result<u64, PricingError> {
        if let Some(&cost) = self.costs.get(&k) {
            self.hits_total += 1;
            return Ok(cost);
        }
        self.misses_total += 1;
        let cost = self.gateway.ticket_cost(k)?;
        self.costs.insert(k, cost);
        Ok(cost)
    }

    /// Pass-through to the gateway; allocations depend on the budget and are
    /// not memoized.
    pub fn allocation(&self, budget_cents: u64, k: u8) -> Result<BudgetAllocation, PricingError> {
        self.gateway.calculate_budget_allocation(budget_cents, k)
    }

    /// Cost already resolved during this batch, if any.
    pub fn cached(&self, k: u8) -> Option<u64> {
        self.costs.get(&k).copied()
    }

    pub fn hits_total(&self) -> u64 {
        self.hits_total
    }

    pub fn misses_total(&self) -> u64 {
        self.misses_total
    }
}
