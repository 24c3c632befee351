#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use lotto_core::limits::{BettingLimits, LimitsProvider};
use lotto_core::observability::{Clock, MetricFields, MetricSink};
use lotto_core::pricing::{BudgetAllocation, PricingError, PricingErrorCode, PricingGateway};
use lotto_core::strategy::{
    StrategyContext, StrategyError, StrategyHandler, StrategyName, StrategyOutput,
    StrategyRegistry, UniformStrategy,
};
use lotto_core::ticket::TicketMetadata;

pub const BASE_COST_CENTS: u64 = 600;

pub fn binomial(n: u64, r: u64) -> u64 {
    if r > n {
        return 0;
    }
    let r = r.min(n - r);
    (0..r).fold(1u64, |acc, i| acc * (n - i) / (i + 1))
}

/// `C(k, 6) * 600` within `[6, 20]`.
pub fn table_cost(k: u8) -> u64 {
    binomial(u64::from(k), 6) * BASE_COST_CENTS
}

/// Test helper: combinatorial price table without touching the infra crate.
#[derive(Debug, Default)]
pub struct TablePricing {
    calls: Cell<u32>,
}

impl TablePricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl PricingGateway for TablePricing {
    fn ticket_cost(&self, k: u8) -> Result<u64, PricingError> {
        self.calls.set(self.calls.get() + 1);
        if !(6..=20).contains(&k) {
            return Err(PricingError::ticket_size_out_of_range(k, 6, 20));
        }
        Ok(table_cost(k))
    }

    fn calculate_budget_allocation(
        &self,
        budget_cents: u64,
        k: u8,
    ) -> Result<BudgetAllocation, PricingError> {
        let cost = self.ticket_cost(k)?;
        let max_tickets = u32::try_from(budget_cents / cost).unwrap_or(u32::MAX);
        Ok(BudgetAllocation {
            max_tickets,
            ticket_cost_cents: cost,
            leftover_cents: budget_cents - cost * u64::from(max_tickets),
        })
    }
}

/// Pricing backend that is always down.
#[derive(Debug, Default)]
pub struct UnavailablePricing;

impl PricingGateway for UnavailablePricing {
    fn ticket_cost(&self, _k: u8) -> Result<u64, PricingError> {
        Err(PricingError::new(
            PricingErrorCode::PricingUnavailable,
            "price table offline",
        ))
    }

    fn calculate_budget_allocation(
        &self,
        _budget_cents: u64,
        _k: u8,
    ) -> Result<BudgetAllocation, PricingError> {
        Err(PricingError::new(
            PricingErrorCode::PricingUnavailable,
            "price table offline",
        ))
    }
}

pub fn default_limits() -> BettingLimits {
    BettingLimits {
        min_dezena_count: 6,
        max_dezena_count: 20,
        default_dezena_count: 6,
        max_tickets_per_batch: 100,
        min_budget_cents: 600,
        max_budget_cents: 5_000_000,
    }
}

#[derive(Debug, Clone)]
pub struct FixedLimits(pub BettingLimits);

impl Default for FixedLimits {
    fn default() -> Self {
        Self(default_limits())
    }
}

impl LimitsProvider for FixedLimits {
    fn betting_limits(&self) -> BettingLimits {
        self.0.clone()
    }
}

/// Clock that advances by `step` on every read.
pub struct StepClock {
    now: Cell<Instant>,
    step: Duration,
    reads: Cell<u32>,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Instant::now()),
            step,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        let current = self.now.get();
        self.now.set(current + self.step);
        self.reads.set(self.reads.get() + 1);
        current
    }
}

/// Sink that keeps every reported metric.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<(String, Vec<(&'static str, String)>)>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|(n, _)| n == name).count()
    }

    pub fn field(&self, name: &str, key: &str) -> Option<String> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .and_then(|(_, fields)| fields.iter().find(|(k, _)| *k == key))
            .map(|(_, v)| v.clone())
    }
}

impl MetricSink for RecordingSink {
    fn report(&self, name: &str, fields: MetricFields<'_>) {
        self.events
            .borrow_mut()
            .push((name.to_string(), fields.to_vec()));
    }
}

/// Handler that always fails.
pub struct FailingHandler;

impl StrategyHandler for FailingHandler {
    fn generate(&self, _ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        Err(StrategyError::Failed {
            reason: "scripted failure".to_string(),
        })
    }
}

/// Handler that always returns the same numbers, ignoring the seed.
pub struct ConstantHandler(pub Vec<u8>);

impl StrategyHandler for ConstantHandler {
    fn generate(&self, _ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput {
            numbers: self.0.clone(),
            metadata: TicketMetadata::describe(&self.0, 0.5),
        })
    }
}

/// Registry whose non-uniform handlers are all replaced by `other`.
pub struct OverrideRegistry<H: StrategyHandler, U: StrategyHandler = UniformStrategy> {
    pub uniform: U,
    pub other: H,
}

impl<H: StrategyHandler> OverrideRegistry<H> {
    pub fn new(other: H) -> Self {
        Self {
            uniform: UniformStrategy,
            other,
        }
    }
}

impl<H: StrategyHandler, U: StrategyHandler> StrategyRegistry for OverrideRegistry<H, U> {
    fn handler(&self, name: StrategyName) -> &dyn StrategyHandler {
        match name {
            StrategyName::Uniform => &self.uniform,
            _ => &self.other,
        }
    }
}
