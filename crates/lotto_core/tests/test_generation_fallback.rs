//! Retry, duplicate and uniform-fallback behavior of the generation loop.
//!
//! Covers:
//! - a failing non-uniform strategy recovers through the uniform fallback
//! - invalid handler output counts as a strategy failure
//! - handler metadata is recomputed from the accepted numbers
//! - duplicates are retried, never accepted, and exhaust into an abandoned slot
//! - a batch with every handler failing still returns a valid empty payload

mod common;

use common::{
    ConstantHandler, FailingHandler, FixedLimits, OverrideRegistry, RecordingSink, TablePricing,
};
use lotto_core::batch::{EngineOptions, validate_payload};
use lotto_core::strategy::{
    BuiltinStrategies, StrategyContext, StrategyError, StrategyHandler, StrategyName,
    StrategyOutput,
};
use lotto_core::ticket::{Parity, TicketMetadata};
use lotto_core::{BatchEngine, GenerateBatchRequest, StrategyRequest};

fn request(budget_cents: u64, strategy: &str) -> GenerateBatchRequest {
    GenerateBatchRequest::new(budget_cents, "fallback", vec![StrategyRequest::new(strategy, 1.0)])
}

#[test]
fn test_missing_history_falls_back_to_uniform() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = BuiltinStrategies::without_history();
    let sink = RecordingSink::default();
    let engine = BatchEngine::new(&pricing, &limits, &strategies).with_metric_sink(&sink);

    let result = engine.generate_batch(&request(1800, "hot-streak")).unwrap();

    assert_eq!(result.tickets.len(), 3);
    assert!(result.tickets.iter().all(|t| t.strategy == StrategyName::Uniform));
    assert!(result.tickets.iter().all(|t| t.seed.contains(":fallback:")));
    assert_eq!(result.stats.fallbacks_total, 3);
    assert_eq!(result.stats.fallback_successes_total, 3);
    assert_eq!(result.stats.strategy_failures_total, 3);
    assert_eq!(sink.count("strategy_fallback"), 3);
    assert_eq!(sink.count("batch_generated"), 1);

    let hot = result
        .payload
        .strategies
        .iter()
        .find(|s| s.name == StrategyName::HotStreak)
        .unwrap();
    assert_eq!((hot.generated, hot.attempts, hot.failures), (0, 3, 3));
    let uniform = result
        .payload
        .strategies
        .iter()
        .find(|s| s.name == StrategyName::Uniform)
        .unwrap();
    assert_eq!((uniform.generated, uniform.weight), (3, 0.0));
    validate_payload(&result.payload).unwrap();
}

#[test]
fn test_invalid_output_is_a_strategy_failure() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = OverrideRegistry::new(ConstantHandler(vec![1, 2, 3]));
    let engine = BatchEngine::new(&pricing, &limits, &strategies)
        .with_metric_sink(&lotto_core::observability::NoopMetricSink);

    let result = engine.generate_batch(&request(600, "balanced")).unwrap();

    assert_eq!(result.tickets.len(), 1);
    assert_eq!(result.tickets[0].strategy, StrategyName::Uniform);
    assert_eq!(result.tickets[0].k(), 6);
    assert_eq!(result.stats.strategy_failures_total, 1);
}

/// Valid numbers with metadata that matches none of them.
struct InconsistentMetadataHandler;

impl StrategyHandler for InconsistentMetadataHandler {
    fn generate(&self, _ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput {
            numbers: vec![6, 5, 4, 3, 2, 1],
            metadata: TicketMetadata {
                sum: 999,
                score: f64::NAN,
                parity: Parity { even: 6, odd: 0 },
                quadrants: Vec::new(),
            },
        })
    }
}

#[test]
fn test_handler_metadata_is_recomputed() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = OverrideRegistry::new(InconsistentMetadataHandler);
    let engine = BatchEngine::new(&pricing, &limits, &strategies)
        .with_metric_sink(&lotto_core::observability::NoopMetricSink);

    let result = engine.generate_batch(&request(600, "balanced")).unwrap();

    assert_eq!(result.tickets.len(), 1);
    let ticket = &result.tickets[0];
    assert_eq!(ticket.strategy, StrategyName::Balanced);
    assert_eq!(ticket.numbers, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ticket.metadata.sum, 21);
    assert_eq!(ticket.metadata.score, 0.0);
    assert_eq!(ticket.metadata.parity, Parity { even: 3, odd: 3 });
    assert_eq!(ticket.metadata.quadrants_covered(), 1);
    assert_eq!(result.payload.metrics.average_score, 0.0);
    assert_eq!(result.payload.metrics.average_sum, 21.0);
    validate_payload(&result.payload).unwrap();
}

#[test]
fn test_duplicates_exhaust_into_abandoned_slot() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = OverrideRegistry::new(ConstantHandler(vec![5, 10, 15, 20, 25, 30]));
    let engine = BatchEngine::new(&pricing, &limits, &strategies)
        .with_metric_sink(&lotto_core::observability::NoopMetricSink)
        .with_options(EngineOptions {
            max_attempts_per_ticket: 5,
            ..EngineOptions::default()
        });

    let result = engine.generate_batch(&request(1200, "balanced")).unwrap();

    assert_eq!(result.tickets.len(), 1);
    assert_eq!(result.tickets[0].numbers, vec![5, 10, 15, 20, 25, 30]);
    assert_eq!(result.stats.duplicates_total, 5);
    assert_eq!(result.stats.slots_abandoned_total, 1);
    assert_eq!(result.stats.fallbacks_total, 0, "duplicates never trigger fallback");
    assert!(
        result.warnings.iter().any(|w| w == "Slot 1 abandoned after 5 attempts"),
        "{:?}",
        result.warnings
    );
    assert!(
        result.warnings.iter().any(|w| w == "Generated 1 of 2 planned tickets"),
        "{:?}",
        result.warnings
    );
    assert_eq!(result.total_cost_cents, 600);
    assert_eq!(result.leftover_cents, 600);
}

#[test]
fn test_every_handler_failing_yields_empty_valid_batch() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = OverrideRegistry {
        uniform: FailingHandler,
        other: FailingHandler,
    };
    let engine = BatchEngine::new(&pricing, &limits, &strategies)
        .with_metric_sink(&lotto_core::observability::NoopMetricSink)
        .with_options(EngineOptions {
            max_attempts_per_ticket: 3,
            ..EngineOptions::default()
        });

    let result = engine.generate_batch(&request(600, "balanced")).unwrap();

    assert!(result.tickets.is_empty());
    assert_eq!(result.total_cost_cents, 0);
    assert_eq!(result.leftover_cents, 600);
    // No tickets: the average falls back to the planning baseline.
    assert_eq!(result.average_ticket_cost_cents, 600);
    // 3 outer attempts, each followed by a 3-attempt uniform loop.
    assert_eq!(result.stats.attempts_total, 12);
    assert_eq!(result.stats.fallbacks_total, 3);
    assert_eq!(result.stats.fallback_successes_total, 0);
    assert_eq!(result.payload.metrics.average_sum, 0.0);
    assert_eq!(result.payload.metrics.quadrant_coverage.max, 0);
    validate_payload(&result.payload).unwrap();
}

#[test]
fn test_failing_uniform_is_not_retried_through_itself() {
    let pricing = TablePricing::new();
    let limits = FixedLimits::default();
    let strategies = OverrideRegistry {
        uniform: FailingHandler,
        other: FailingHandler,
    };
    let engine = BatchEngine::new(&pricing, &limits, &strategies)
        .with_metric_sink(&lotto_core::observability::NoopMetricSink)
        .with_options(EngineOptions {
            max_attempts_per_ticket: 4,
            ..EngineOptions::default()
        });

    let result = engine.generate_batch(&request(600, "uniform")).unwrap();

    assert!(result.tickets.is_empty());
    assert_eq!(result.stats.attempts_total, 4);
    assert_eq!(result.stats.fallbacks_total, 0);
    let uniform = &result.payload.strategies[0];
    assert_eq!((uniform.attempts, uniform.failures), (4, 4));
}
