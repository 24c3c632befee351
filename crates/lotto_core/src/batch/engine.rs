//! Batch generation engine.
//!
//! **Order of checks (deterministic):**
//! 1. Request shape (budget > 0, non-empty seed, positive timeout/window)
//! 2. Strategy normalization (`NO_STRATEGY_AVAILABLE`, `UNKNOWN_STRATEGY`)
//! 3. Budget bounds (`BUDGET_BELOW_MIN`, `BUDGET_ABOVE_MAX`)
//! 4. Ticket size bounds and `kOverride` affordability
//! 5. Slot planning
//! 6. Slot loop
//! 7. Payload assembly + schema validation
//!
//! Steps 1-5 fail before any ticket exists. Inside the slot loop each
//! ticket goes `selecting → resolving-size → generating → deduping →
//! (success | retry | fallback)`. Strategy failures and duplicates are
//! retried up to `max_attempts_per_ticket`; a failed non-uniform attempt
//! gets one nested uniform fallback loop. An exhausted slot is abandoned
//! with a warning and the batch moves on.
//!
//! Tickets are strictly sequential: affordability and duplicate status of
//! each ticket depend on every ticket before it.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::metrics::MetricsAccumulator;
use super::payload::{EffectiveConfig, PayloadInput, StrategySummaries, assemble_payload};
use super::planner::{BudgetPlan, TicketSlot, plan_budget};
use super::resolver::{ResolvedSize, SizeRequest, resolve_affordable_size};
use super::{BatchGenerationError, BatchGenerationResult, GenerateBatchError, GenerateBatchRequest};
use crate::limits::LimitsProvider;
use crate::observability::{Clock, MetricSink, SystemClock, TracingMetricSink};
use crate::pricing::{PricingError, PricingGateway, TicketCostCache};
use crate::seed::{attempt_seed_label, fallback_seed_label};
use crate::strategy::{
    StrategyContext, StrategyError, StrategyName, StrategyRegistry, StrategySelector,
    normalize_strategies,
};
use crate::ticket::{StrategyTicket, TicketMetadata, canonicalize_numbers, ticket_key};

pub const MAX_ATTEMPTS_PER_TICKET: u32 = 100;

static DEFAULT_METRIC_SINK: TracingMetricSink = TracingMetricSink;
static DEFAULT_CLOCK: SystemClock = SystemClock;

// ─── Options ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Deadline applied when the request has no `timeoutMs`.
    pub default_timeout_ms: u64,
    /// History window applied when neither request nor strategy sets one.
    pub default_window: u32,
    pub max_attempts_per_ticket: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            default_window: 100,
            max_attempts_per_ticket: MAX_ATTEMPTS_PER_TICKET,
        }
    }
}

// ─── Stats ──────────────────────────────────────────────────────────────

/// Loop counters for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub attempts_total: u64,
    pub duplicates_total: u64,
    pub strategy_failures_total: u64,
    pub fallbacks_total: u64,
    pub fallback_successes_total: u64,
    pub slots_skipped_total: u64,
    pub slots_abandoned_total: u64,
    pub cost_cache_hits: u64,
    pub cost_cache_misses: u64,
}

// ─── Per-call state ─────────────────────────────────────────────────────

struct BatchContext<'r> {
    request: &'r GenerateBatchRequest,
    default_k: u8,
    window: u32,
    plan: BudgetPlan,
    config: EffectiveConfig,
}

/// Accumulators owned by one `generate_batch` call.
struct BatchState<'a> {
    costs: TicketCostCache<'a>,
    selector: StrategySelector,
    slots: Vec<TicketSlot>,
    tickets: Vec<StrategyTicket>,
    seen: HashSet<String>,
    metrics: MetricsAccumulator,
    summaries: StrategySummaries,
    warnings: Vec<String>,
    stats: GenerationStats,
    budget_consumed: u64,
    min_ticket_cost_observed: u64,
}

impl BatchState<'_> {
    fn push_warning(&mut self, warning: String) {
        if self.warnings.contains(&warning) {
            return;
        }
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn observe_cost(&mut self, cost_cents: u64) {
        self.min_ticket_cost_observed = self.min_ticket_cost_observed.min(cost_cents);
    }

    fn accept(&mut self, slot_pos: usize, candidate: Candidate) {
        let slot = &mut self.slots[slot_pos];
        slot.k = candidate.size.k;
        slot.cost_cents = candidate.size.cost_cents;

        self.seen.insert(ticket_key(&candidate.numbers));
        self.metrics.add(&candidate.metadata);
        self.budget_consumed += candidate.size.cost_cents;
        self.summaries.record_generated(candidate.strategy);
        self.tickets.push(StrategyTicket {
            strategy: candidate.strategy,
            numbers: candidate.numbers,
            metadata: candidate.metadata,
            cost_cents: candidate.size.cost_cents,
            seed: candidate.seed,
        });
    }
}

struct Candidate {
    strategy: StrategyName,
    numbers: Vec<u8>,
    metadata: TicketMetadata,
    size: ResolvedSize,
    seed: String,
}

enum AttemptOutcome {
    Accepted(Candidate),
    Duplicate,
    Failed(StrategyError),
}

enum SlotOutcome {
    Filled,
    NoAffordableSize { remaining_cents: u64 },
    Abandoned,
}

// ─── Engine ─────────────────────────────────────────────────────────────

/// Batch generator over injected collaborators.
///
/// Holds no per-batch state: concurrent calls on one engine are independent.
pub struct BatchEngine<'a> {
    pricing: &'a dyn PricingGateway,
    limits: &'a dyn LimitsProvider,
    strategies: &'a dyn StrategyRegistry,
    metric_sink: &'a dyn MetricSink,
    clock: &'a dyn Clock,
    options: EngineOptions,
}

impl<'a> BatchEngine<'a> {
    pub fn new(
        pricing: &'a dyn PricingGateway,
        limits: &'a dyn LimitsProvider,
        strategies: &'a dyn StrategyRegistry,
    ) -> Self {
        Self {
            pricing,
            limits,
            strategies,
            metric_sink: &DEFAULT_METRIC_SINK,
            clock: &DEFAULT_CLOCK,
            options: EngineOptions::default(),
        }
    }

    pub fn with_metric_sink(mut self, metric_sink: &'a dyn MetricSink) -> Self {
        self.metric_sink = metric_sink;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate one batch of tickets for `request`.
    pub fn generate_batch(
        &self,
        request: &GenerateBatchRequest,
    ) -> Result<BatchGenerationResult, GenerateBatchError> {
        validate_request(request)?;
        let strategies = normalize_strategies(&request.strategies)?;

        let limits = self.limits.betting_limits();
        let budget_cents = request.budget_cents;
        if budget_cents < limits.min_budget_cents {
            return Err(PricingError::budget_below_min(budget_cents, limits.min_budget_cents).into());
        }
        if budget_cents > limits.max_budget_cents {
            return Err(PricingError::budget_above_max(budget_cents, limits.max_budget_cents).into());
        }

        let default_k = request.k.unwrap_or(limits.default_dezena_count);
        let check_k = |k: u8| {
            if limits.allows_k(k) {
                Ok(())
            } else {
                Err(PricingError::ticket_size_out_of_range(
                    k,
                    limits.min_dezena_count,
                    limits.max_dezena_count,
                ))
            }
        };
        check_k(default_k)?;

        let mut costs = TicketCostCache::new(self.pricing);
        for strategy in &strategies {
            let Some(k) = strategy.k_override else {
                continue;
            };
            check_k(k)?;
            let cost = costs.cost(k)?;
            if cost > budget_cents {
                return Err(PricingError::k_override_unaffordable(k, cost, budget_cents).into());
            }
        }

        let spread_budget = request.spread_budget.unwrap_or(false);
        let plan = plan_budget(budget_cents, default_k, spread_budget, &limits, &mut costs)?;

        let window = request.window.unwrap_or(self.options.default_window);
        let timeout_ms = request.timeout_ms.unwrap_or(self.options.default_timeout_ms);
        let ctx = BatchContext {
            request,
            default_k,
            window,
            config: EffectiveConfig {
                seed: request.seed.clone(),
                k: default_k,
                window,
                timeout_ms,
                spread_budget,
                planning_mode: plan.mode,
                strategies: strategies.clone(),
            },
            plan,
        };

        tracing::info!(
            budget_cents,
            seed = %request.seed,
            k = default_k,
            planned_tickets = ctx.plan.planned_tickets,
            mode = ?ctx.plan.mode,
            "batch generation started"
        );

        let started = self.clock.now();
        let deadline = started + Duration::from_millis(timeout_ms);
        let mut state = BatchState {
            costs,
            summaries: StrategySummaries::new(&strategies),
            selector: StrategySelector::new(strategies, &request.seed),
            slots: ctx.plan.slots.clone(),
            tickets: Vec::with_capacity(ctx.plan.planned_tickets),
            seen: HashSet::with_capacity(ctx.plan.planned_tickets),
            metrics: MetricsAccumulator::new(),
            warnings: Vec::new(),
            stats: GenerationStats::default(),
            budget_consumed: 0,
            min_ticket_cost_observed: ctx.plan.min_slot_cost(),
        };

        for slot_pos in 0..state.slots.len() {
            let remaining_cents = budget_cents - state.budget_consumed;
            if remaining_cents < state.min_ticket_cost_observed {
                let warning = format!(
                    "Remaining budget {remaining_cents} cents is below the cheapest ticket cost {} cents; stopped after {} tickets",
                    state.min_ticket_cost_observed,
                    state.tickets.len()
                );
                state.push_warning(warning);
                break;
            }

            if self.clock.now() > deadline {
                let generated = state.tickets.len();
                state.push_warning(format!(
                    "Generation timed out after {timeout_ms}ms with {generated} of {} planned tickets",
                    ctx.plan.planned_tickets
                ));
                let partial = self.finish(&ctx, state)?;
                self.metric_sink.report(
                    "batch_timeout",
                    &[
                        ("timeout_ms", timeout_ms.to_string()),
                        ("tickets", generated.to_string()),
                        ("planned", ctx.plan.planned_tickets.to_string()),
                    ],
                );
                return Err(BatchGenerationError::Timeout {
                    timeout_ms,
                    partial: Box::new(partial),
                }
                .into());
            }

            let index = state.slots[slot_pos].index;
            match self.fill_slot(&ctx, &mut state, slot_pos)? {
                SlotOutcome::Filled => {}
                SlotOutcome::NoAffordableSize { remaining_cents } => {
                    state.stats.slots_skipped_total += 1;
                    state.push_warning(format!(
                        "Slot {index} skipped: no affordable ticket size with {remaining_cents} cents remaining"
                    ));
                }
                SlotOutcome::Abandoned => {
                    state.stats.slots_abandoned_total += 1;
                    state.push_warning(format!(
                        "Slot {index} abandoned after {} attempts",
                        self.options.max_attempts_per_ticket
                    ));
                }
            }
        }

        let result = self.finish(&ctx, state)?;
        let elapsed_ms = self.clock.now().saturating_duration_since(started).as_millis();
        self.metric_sink.report(
            "batch_generated",
            &[
                ("tickets", result.tickets.len().to_string()),
                ("planned", ctx.plan.planned_tickets.to_string()),
                ("total_cost_cents", result.total_cost_cents.to_string()),
                ("leftover_cents", result.leftover_cents.to_string()),
                ("elapsed_ms", elapsed_ms.to_string()),
            ],
        );
        tracing::info!(
            tickets = result.tickets.len(),
            total_cost_cents = result.total_cost_cents,
            leftover_cents = result.leftover_cents,
            warnings = result.warnings.len(),
            "batch generation finished"
        );
        Ok(result)
    }

    fn fill_slot(
        &self,
        ctx: &BatchContext<'_>,
        state: &mut BatchState<'a>,
        slot_pos: usize,
    ) -> Result<SlotOutcome, PricingError> {
        let slot = state.slots[slot_pos];

        for attempt in 0..self.options.max_attempts_per_ticket {
            let Some(strategy) = state.selector.next_strategy() else {
                break;
            };
            state.stats.attempts_total += 1;
            state.summaries.record_attempt(strategy.name);

            let remaining_cents = ctx.remaining_cents(state);
            let size_request = SizeRequest {
                desired_k: strategy.k_override,
                fallback_k: slot.k,
                default_k: ctx.default_k,
                budget_remaining: remaining_cents,
            };
            let Some(size) = resolve_affordable_size(&size_request, &mut state.costs)? else {
                return Ok(SlotOutcome::NoAffordableSize { remaining_cents });
            };
            state.observe_cost(size.cost_cents);
            if let Some(warning) = &size.warning {
                state.push_warning(format!("Slot {}: {warning}", slot.index));
            }

            let seed = attempt_seed_label(&ctx.request.seed, slot.index, strategy.name, attempt);
            let window = strategy.window.unwrap_or(ctx.window);
            match self.attempt(&state.seen, strategy.name, size, seed, window) {
                AttemptOutcome::Accepted(candidate) => {
                    state.accept(slot_pos, candidate);
                    return Ok(SlotOutcome::Filled);
                }
                AttemptOutcome::Duplicate => {
                    state.stats.duplicates_total += 1;
                    tracing::debug!(slot = slot.index, attempt, strategy = %strategy.name, "duplicate ticket; retrying");
                }
                AttemptOutcome::Failed(err) => {
                    state.stats.strategy_failures_total += 1;
                    state.summaries.record_failure(strategy.name);
                    tracing::debug!(slot = slot.index, attempt, strategy = %strategy.name, error = %err, "strategy failed");
                    if strategy.name != StrategyName::Uniform {
                        if let Some(candidate) = self.uniform_fallback(ctx, state, slot, attempt)? {
                            state.accept(slot_pos, candidate);
                            return Ok(SlotOutcome::Filled);
                        }
                    }
                }
            }
        }

        Ok(SlotOutcome::Abandoned)
    }

    /// Nested uniform loop run after a non-uniform strategy failure.
    fn uniform_fallback(
        &self,
        ctx: &BatchContext<'_>,
        state: &mut BatchState<'a>,
        slot: TicketSlot,
        outer_attempt: u32,
    ) -> Result<Option<Candidate>, PricingError> {
        state.stats.fallbacks_total += 1;
        self.metric_sink.report(
            "strategy_fallback",
            &[
                ("slot", slot.index.to_string()),
                ("attempt", outer_attempt.to_string()),
            ],
        );

        for inner in 0..self.options.max_attempts_per_ticket {
            state.stats.attempts_total += 1;
            state.summaries.record_attempt(StrategyName::Uniform);

            let size_request = SizeRequest {
                desired_k: None,
                fallback_k: slot.k,
                default_k: ctx.default_k,
                budget_remaining: ctx.remaining_cents(state),
            };
            let Some(size) = resolve_affordable_size(&size_request, &mut state.costs)? else {
                return Ok(None);
            };
            state.observe_cost(size.cost_cents);

            let seed = fallback_seed_label(&ctx.request.seed, slot.index, outer_attempt, inner);
            match self.attempt(&state.seen, StrategyName::Uniform, size, seed, ctx.window) {
                AttemptOutcome::Accepted(candidate) => {
                    state.stats.fallback_successes_total += 1;
                    return Ok(Some(candidate));
                }
                AttemptOutcome::Duplicate => state.stats.duplicates_total += 1,
                AttemptOutcome::Failed(err) => {
                    state.stats.strategy_failures_total += 1;
                    state.summaries.record_failure(StrategyName::Uniform);
                    tracing::debug!(slot = slot.index, inner, error = %err, "uniform fallback failed");
                }
            }
        }

        Ok(None)
    }

    fn attempt(
        &self,
        seen: &HashSet<String>,
        strategy: StrategyName,
        size: ResolvedSize,
        seed: String,
        window: u32,
    ) -> AttemptOutcome {
        let ctx = StrategyContext {
            seed: &seed,
            k: size.k,
            window,
        };
        let generated = self
            .strategies
            .handler(strategy)
            .generate(&ctx)
            .and_then(|out| Ok((canonicalize_numbers(out.numbers, size.k)?, out.metadata.score)));

        match generated {
            Ok((numbers, score)) => {
                if seen.contains(&ticket_key(&numbers)) {
                    return AttemptOutcome::Duplicate;
                }
                // Handler metadata is untrusted: recompute from the numbers
                // and clamp the score.
                let metadata = TicketMetadata::describe(&numbers, score);
                AttemptOutcome::Accepted(Candidate {
                    strategy,
                    numbers,
                    metadata,
                    size,
                    seed,
                })
            }
            Err(err) => AttemptOutcome::Failed(err),
        }
    }

    fn finish(
        &self,
        ctx: &BatchContext<'_>,
        state: BatchState<'a>,
    ) -> Result<BatchGenerationResult, BatchGenerationError> {
        let mut stats = state.stats;
        stats.cost_cache_hits = state.costs.hits_total();
        stats.cost_cache_misses = state.costs.misses_total();

        let assembled = assemble_payload(PayloadInput {
            budget_cents: ctx.request.budget_cents,
            plan: &ctx.plan,
            tickets: &state.tickets,
            summaries: &state.summaries,
            metrics: state.metrics.build(),
            config: ctx.config.clone(),
            warnings: state.warnings,
        })
        .inspect_err(|e| tracing::error!(error = %e, "payload failed schema validation"))?;

        Ok(BatchGenerationResult {
            tickets: state.tickets,
            ticket_cost_cents: ctx.plan.base_ticket_cost_cents,
            average_ticket_cost_cents: assembled.average_ticket_cost_cents,
            ticket_cost_breakdown: assembled.ticket_cost_breakdown,
            total_cost_cents: assembled.total_cost_cents,
            budget_cents: ctx.request.budget_cents,
            leftover_cents: assembled.leftover_cents,
            payload: assembled.payload,
            warnings: assembled.warnings,
            stats,
        })
    }
}

impl BatchContext<'_> {
    fn remaining_cents(&self, state: &BatchState<'_>) -> u64 {
        self.request.budget_cents - state.budget_consumed
    }
}

fn validate_request(request: &GenerateBatchRequest) -> Result<(), BatchGenerationError> {
    if request.budget_cents == 0 {
        return Err(BatchGenerationError::InvalidRequest {
            field: "budgetCents",
            reason: "must be greater than zero".to_string(),
        });
    }
    if request.seed.trim().is_empty() {
        return Err(BatchGenerationError::InvalidRequest {
            field: "seed",
            reason: "must be a non-empty string".to_string(),
        });
    }
    if request.timeout_ms == Some(0) {
        return Err(BatchGenerationError::InvalidRequest {
            field: "timeoutMs",
            reason: "must be greater than zero".to_string(),
        });
    }
    if request.window == Some(0) {
        return Err(BatchGenerationError::InvalidRequest {
            field: "window",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
