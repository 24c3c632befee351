//! Budget planning tests.
//!
//! Covers:
//! - concentrated plans are homogeneous and clamped to the batch cap
//! - spread plans allocate greedily in descending cost order
//! - a budget that plans zero slots fails with BUDGET_BELOW_MIN

mod common;

use common::{TablePricing, default_limits, table_cost};
use lotto_core::batch::{PlanningMode, plan_budget};
use lotto_core::limits::BettingLimits;
use lotto_core::pricing::{PricingErrorCode, TicketCostCache};

fn slot_sizes(plan: &lotto_core::batch::BudgetPlan) -> Vec<u8> {
    plan.slots.iter().map(|s| s.k).collect()
}

#[test]
fn test_concentrated_single_ticket_exact_budget() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);

    let plan = plan_budget(600, 6, false, &default_limits(), &mut costs).unwrap();

    assert_eq!(plan.mode, PlanningMode::Concentrated);
    assert_eq!(plan.planned_tickets, 1);
    assert_eq!(plan.planned_leftover_cents, 0);
    assert_eq!(plan.base_ticket_cost_cents, 600);
    assert_eq!(plan.slots[0].index, 0);
}

#[test]
fn test_concentrated_keeps_remainder_as_leftover() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);

    let plan = plan_budget(2000, 6, false, &default_limits(), &mut costs).unwrap();

    assert_eq!(plan.planned_tickets, 3);
    assert_eq!(plan.planned_leftover_cents, 200);
    assert!(plan.slots.iter().all(|s| s.k == 6 && s.cost_cents == 600));
    let indices: Vec<usize> = plan.slots.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_concentrated_clamped_to_batch_cap() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);
    let limits = BettingLimits {
        max_tickets_per_batch: 5,
        ..default_limits()
    };

    let plan = plan_budget(6000, 6, false, &limits, &mut costs).unwrap();

    assert_eq!(plan.planned_tickets, 5);
    assert_eq!(plan.planned_leftover_cents, 3000);
}

#[test]
fn test_spread_prefers_expensive_sizes_first() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);

    let plan = plan_budget(5000, 6, true, &default_limits(), &mut costs).unwrap();

    assert_eq!(plan.mode, PlanningMode::Spread);
    assert_eq!(slot_sizes(&plan), vec![7, 6]);
    assert_eq!(plan.planned_leftover_cents, 200);
    assert_eq!(plan.base_ticket_cost_cents, 600);
}

#[test]
fn test_spread_runs_repeated_passes() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);

    let plan = plan_budget(50_000, 6, true, &default_limits(), &mut costs).unwrap();

    assert_eq!(slot_sizes(&plan), vec![8, 7, 6, 8, 7, 6, 7, 6, 6, 6, 6]);
    let spent: u64 = plan.slots.iter().map(|s| s.cost_cents).sum();
    assert_eq!(spent, 49_800);
    assert_eq!(plan.planned_leftover_cents, 200);
    for slot in &plan.slots {
        assert_eq!(slot.cost_cents, table_cost(slot.k));
    }
}

#[test]
fn test_spread_respects_batch_cap() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);
    let limits = BettingLimits {
        max_tickets_per_batch: 2,
        ..default_limits()
    };

    let plan = plan_budget(50_000, 6, true, &limits, &mut costs).unwrap();

    assert_eq!(slot_sizes(&plan), vec![8, 7]);
    assert_eq!(plan.planned_leftover_cents, 50_000 - 16_800 - 4_200);
}

#[test]
fn test_spread_candidates_clipped_to_limits() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);
    let limits = BettingLimits {
        max_dezena_count: 7,
        ..default_limits()
    };

    let plan = plan_budget(10_000, 7, true, &limits, &mut costs).unwrap();

    // Candidates are {6, 7}; 8 and 9 are outside the limits.
    assert!(plan.slots.iter().all(|s| s.k == 6 || s.k == 7));
    assert_eq!(slot_sizes(&plan), vec![7, 6, 7, 6]);
    assert!(costs.cached(8).is_none());
}

#[test]
fn test_budget_below_cheapest_ticket_fails() {
    let pricing = TablePricing::new();

    for spread in [false, true] {
        let mut costs = TicketCostCache::new(&pricing);
        let err = plan_budget(500, 6, spread, &default_limits(), &mut costs).unwrap_err();
        assert_eq!(err.code, PricingErrorCode::BudgetBelowMin);
    }
}

#[test]
fn test_plan_memoizes_cost_lookups() {
    let pricing = TablePricing::new();
    let mut costs = TicketCostCache::new(&pricing);

    plan_budget(50_000, 6, true, &default_limits(), &mut costs).unwrap();
    plan_budget(50_000, 6, true, &default_limits(), &mut costs).unwrap();

    // k=5 is below the limits and never priced; 6, 7 and 8 are looked up
    // once each and every later lookup hits the memo.
    assert_eq!(pricing.calls(), 3);
    assert_eq!(costs.misses_total(), 3);
    assert!(costs.hits_total() >= 4);
}
