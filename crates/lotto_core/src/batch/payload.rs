//! Versioned audit payload: assembly and schema validation.
//!
//! The JSON shape of [`StrategyPayload`] is the exported audit record.
//! Field names are camelCase and must stay stable for existing consumers.
//!
//! Validation runs twice over:
//! 1. structural: the serialized JSON has every required key with the
//!    right type (non-finite floats serialize to `null` and fail here);
//! 2. accounting: totals reconcile to the cent and counts agree.
//!
//! A failure is an assembler defect, surfaced as
//! `PAYLOAD_SCHEMA_VIOLATION`, never downgraded to a warning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::metrics::BatchMetrics;
use super::planner::{BudgetPlan, PlanningMode};
use crate::strategy::{NormalizedStrategy, StrategyName};
use crate::ticket::StrategyTicket;

pub const PAYLOAD_VERSION: &str = "1.0";

// ─── Payload types ──────────────────────────────────────────────────────

/// Planned vs emitted tickets for one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCostBreakdownEntry {
    pub k: u8,
    pub cost_cents: u64,
    pub planned: u32,
    pub emitted: u32,
}

/// Per-strategy execution counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyExecutionSummary {
    pub name: StrategyName,
    pub weight: f64,
    pub generated: u32,
    pub attempts: u32,
    pub failures: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub budget_cents: u64,
    pub total_cost_cents: u64,
    pub leftover_cents: u64,
    pub planned_leftover_cents: u64,
    pub ticket_cost_cents: u64,
    pub average_ticket_cost_cents: u64,
    pub planned_tickets: u32,
    pub generated_tickets: u32,
    pub ticket_cost_breakdown: Vec<TicketCostBreakdownEntry>,
}

/// Request settings after defaults were applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub seed: String,
    pub k: u8,
    pub window: u32,
    pub timeout_ms: u64,
    pub spread_budget: bool,
    pub planning_mode: PlanningMode,
    pub strategies: Vec<NormalizedStrategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayload {
    pub version: String,
    pub budget: BudgetSummary,
    pub strategies: Vec<StrategyExecutionSummary>,
    pub metrics: BatchMetrics,
    pub config: EffectiveConfig,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct PayloadSchemaError {
    pub path: String,
    pub reason: String,
}

impl PayloadSchemaError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// ─── Strategy summaries ─────────────────────────────────────────────────

/// Counters for every requested strategy plus the implicit `uniform` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummaries {
    entries: Vec<StrategyExecutionSummary>,
}

impl StrategySummaries {
    pub fn new(strategies: &[NormalizedStrategy]) -> Self {
        let mut entries: Vec<StrategyExecutionSummary> = strategies
            .iter()
            .map(|s| StrategyExecutionSummary {
                name: s.name,
                weight: s.weight,
                generated: 0,
                attempts: 0,
                failures: 0,
            })
            .collect();
        if !entries.iter().any(|e| e.name == StrategyName::Uniform) {
            entries.push(StrategyExecutionSummary {
                name: StrategyName::Uniform,
                weight: 0.0,
                generated: 0,
                attempts: 0,
                failures: 0,
            });
        }
        Self { entries }
    }

    fn entry_mut(&mut self, name: StrategyName) -> &mut StrategyExecutionSummary {
        let idx = match self.entries.iter().position(|e| e.name == name) {
            Some(idx) => idx,
            None => {
                self.entries.push(StrategyExecutionSummary {
                    name,
                    weight: 0.0,
                    generated: 0,
                    attempts: 0,
                    failures: 0,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    pub fn record_attempt(&mut self, name: StrategyName) {
        self.entry_mut(name).attempts += 1;
    }

    pub fn record_failure(&mut self, name: StrategyName) {
        self.entry_mut(name).failures += 1;
    }

    pub fn record_generated(&mut self, name: StrategyName) {
        self.entry_mut(name).generated += 1;
    }

    pub fn as_slice(&self) -> &[StrategyExecutionSummary] {
        &self.entries
    }
}

// ─── Assembly ───────────────────────────────────────────────────────────

pub struct PayloadInput<'a> {
    pub budget_cents: u64,
    pub plan: &'a BudgetPlan,
    pub tickets: &'a [StrategyTicket],
    pub summaries: &'a StrategySummaries,
    pub metrics: BatchMetrics,
    pub config: EffectiveConfig,
    pub warnings: Vec<String>,
}

/// Validated payload plus the accounting figures mirrored on the result.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPayload {
    pub payload: StrategyPayload,
    pub total_cost_cents: u64,
    pub leftover_cents: u64,
    pub average_ticket_cost_cents: u64,
    pub ticket_cost_breakdown: Vec<TicketCostBreakdownEntry>,
    pub warnings: Vec<String>,
}

/// Build and validate the payload.
pub fn assemble_payload(input: PayloadInput<'_>) -> Result<AssembledPayload, PayloadSchemaError> {
    let generated = input.tickets.len();
    let total_cost_cents: u64 = input.tickets.iter().map(|t| t.cost_cents).sum();
    let leftover_cents = input.budget_cents.saturating_sub(total_cost_cents);
    let average_ticket_cost_cents = if generated == 0 {
        input.plan.base_ticket_cost_cents
    } else {
        // Round half up to whole cents.
        (total_cost_cents + generated as u64 / 2) / generated as u64
    };

    let mut by_k: BTreeMap<u8, TicketCostBreakdownEntry> = BTreeMap::new();
    for slot in &input.plan.slots {
        by_k.entry(slot.k)
            .or_insert(TicketCostBreakdownEntry {
                k: slot.k,
                cost_cents: slot.cost_cents,
                planned: 0,
                emitted: 0,
            })
            .planned += 1;
    }
    for ticket in input.tickets {
        by_k.entry(ticket.k())
            .or_insert(TicketCostBreakdownEntry {
                k: ticket.k(),
                cost_cents: ticket.cost_cents,
                planned: 0,
                emitted: 0,
            })
            .emitted += 1;
    }
    let ticket_cost_breakdown: Vec<TicketCostBreakdownEntry> = by_k.into_values().collect();

    let mut warnings = input.warnings;
    if generated < input.plan.planned_tickets {
        warnings.push(format!(
            "Generated {generated} of {} planned tickets",
            input.plan.planned_tickets
        ));
    }

    let payload = StrategyPayload {
        version: PAYLOAD_VERSION.to_string(),
        budget: BudgetSummary {
            budget_cents: input.budget_cents,
            total_cost_cents,
            leftover_cents,
            planned_leftover_cents: input.plan.planned_leftover_cents,
            ticket_cost_cents: input.plan.base_ticket_cost_cents,
            average_ticket_cost_cents,
            planned_tickets: input.plan.planned_tickets as u32,
            generated_tickets: generated as u32,
            ticket_cost_breakdown: ticket_cost_breakdown.clone(),
        },
        strategies: input.summaries.as_slice().to_vec(),
        metrics: input.metrics,
        config: input.config,
        warnings: warnings.clone(),
    };
    validate_payload(&payload)?;

    Ok(AssembledPayload {
        payload,
        total_cost_cents,
        leftover_cents,
        average_ticket_cost_cents,
        ticket_cost_breakdown,
        warnings,
    })
}

// ─── Validation ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Unsigned,
    Number,
    Bool,
    Array,
    Object,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Unsigned => value.is_u64(),
            Kind::Number => value.is_number(),
            Kind::Bool => value.is_boolean(),
            Kind::Array => value.is_array(),
            Kind::Object => value.is_object(),
        }
    }
}

const ROOT_FIELDS: &[(&str, Kind)] = &[
    ("version", Kind::String),
    ("budget", Kind::Object),
    ("strategies", Kind::Array),
    ("metrics", Kind::Object),
    ("config", Kind::Object),
    ("warnings", Kind::Array),
];

const BUDGET_FIELDS: &[(&str, Kind)] = &[
    ("budgetCents", Kind::Unsigned),
    ("totalCostCents", Kind::Unsigned),
    ("leftoverCents", Kind::Unsigned),
    ("plannedLeftoverCents", Kind::Unsigned),
    ("ticketCostCents", Kind::Unsigned),
    ("averageTicketCostCents", Kind::Unsigned),
    ("plannedTickets", Kind::Unsigned),
    ("generatedTickets", Kind::Unsigned),
    ("ticketCostBreakdown", Kind::Array),
];

const BREAKDOWN_FIELDS: &[(&str, Kind)] = &[
    ("k", Kind::Unsigned),
    ("costCents", Kind::Unsigned),
    ("planned", Kind::Unsigned),
    ("emitted", Kind::Unsigned),
];

const STRATEGY_FIELDS: &[(&str, Kind)] = &[
    ("name", Kind::String),
    ("weight", Kind::Number),
    ("generated", Kind::Unsigned),
    ("attempts", Kind::Unsigned),
    ("failures", Kind::Unsigned),
];

const METRICS_FIELDS: &[(&str, Kind)] = &[
    ("averageSum", Kind::Number),
    ("averageScore", Kind::Number),
    ("paritySpread", Kind::Number),
    ("quadrantCoverage", Kind::Object),
];

const COVERAGE_FIELDS: &[(&str, Kind)] = &[
    ("min", Kind::Unsigned),
    ("max", Kind::Unsigned),
    ("average", Kind::Number),
];

const CONFIG_FIELDS: &[(&str, Kind)] = &[
    ("seed", Kind::String),
    ("k", Kind::Unsigned),
    ("window", Kind::Unsigned),
    ("timeoutMs", Kind::Unsigned),
    ("spreadBudget", Kind::Bool),
    ("planningMode", Kind::String),
    ("strategies", Kind::Array),
];

fn check_fields(
    value: &Value,
    path: &str,
    fields: &[(&str, Kind)],
) -> Result<(), PayloadSchemaError> {
    let object = value
        .as_object()
        .ok_or_else(|| PayloadSchemaError::new(path, "expected object"))?;
    for &(key, kind) in fields {
        let field_path = format!("{path}.{key}");
        let field = object
            .get(key)
            .ok_or_else(|| PayloadSchemaError::new(&field_path, "missing"))?;
        if !kind.matches(field) {
            return Err(PayloadSchemaError::new(
                field_path,
                format!("expected {kind:?}, got {field}"),
            ));
        }
    }
    Ok(())
}

fn check_items(
    value: &Value,
    path: &str,
    fields: &[(&str, Kind)],
) -> Result<(), PayloadSchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| PayloadSchemaError::new(path, "expected array"))?;
    for (i, item) in items.iter().enumerate() {
        check_fields(item, &format!("{path}[{i}]"), fields)?;
    }
    Ok(())
}

fn check_structure(value: &Value) -> Result<(), PayloadSchemaError> {
    check_fields(value, "$", ROOT_FIELDS)?;
    check_fields(&value["budget"], "$.budget", BUDGET_FIELDS)?;
    check_items(
        &value["budget"]["ticketCostBreakdown"],
        "$.budget.ticketCostBreakdown",
        BREAKDOWN_FIELDS,
    )?;
    check_items(&value["strategies"], "$.strategies", STRATEGY_FIELDS)?;
    check_fields(&value["metrics"], "$.metrics", METRICS_FIELDS)?;
    check_fields(
        &value["metrics"]["quadrantCoverage"],
        "$.metrics.quadrantCoverage",
        COVERAGE_FIELDS,
    )?;
    check_fields(&value["config"], "$.config", CONFIG_FIELDS)?;
    if let Some(i) = value["warnings"]
        .as_array()
        .and_then(|w| w.iter().position(|w| !w.is_string()))
    {
        return Err(PayloadSchemaError::new(
            format!("$.warnings[{i}]"),
            "expected string",
        ));
    }
    Ok(())
}

fn check_accounting(payload: &StrategyPayload) -> Result<(), PayloadSchemaError> {
    let budget = &payload.budget;
    if payload.version != PAYLOAD_VERSION {
        return Err(PayloadSchemaError::new(
            "$.version",
            format!("expected {PAYLOAD_VERSION}, got {}", payload.version),
        ));
    }
    if budget.total_cost_cents > budget.budget_cents {
        return Err(PayloadSchemaError::new(
            "$.budget.totalCostCents",
            "exceeds budgetCents",
        ));
    }
    if budget.total_cost_cents + budget.leftover_cents != budget.budget_cents {
        return Err(PayloadSchemaError::new(
            "$.budget.leftoverCents",
            "does not reconcile with budgetCents - totalCostCents",
        ));
    }

    let mut previous_k = None;
    let mut planned = 0u32;
    let mut emitted = 0u32;
    let mut emitted_cost = 0u64;
    for (i, entry) in budget.ticket_cost_breakdown.iter().enumerate() {
        if previous_k.is_some_and(|p| p >= entry.k) {
            return Err(PayloadSchemaError::new(
                format!("$.budget.ticketCostBreakdown[{i}].k"),
                "entries must be strictly ascending by k",
            ));
        }
        previous_k = Some(entry.k);
        planned += entry.planned;
        emitted += entry.emitted;
        emitted_cost += entry.cost_cents * u64::from(entry.emitted);
    }
    if planned != budget.planned_tickets {
        return Err(PayloadSchemaError::new(
            "$.budget.ticketCostBreakdown",
            format!("planned sum {planned} != plannedTickets {}", budget.planned_tickets),
        ));
    }
    if emitted != budget.generated_tickets {
        return Err(PayloadSchemaError::new(
            "$.budget.ticketCostBreakdown",
            format!(
                "emitted sum {emitted} != generatedTickets {}",
                budget.generated_tickets
            ),
        ));
    }
    if emitted_cost != budget.total_cost_cents {
        return Err(PayloadSchemaError::new(
            "$.budget.ticketCostBreakdown",
            format!(
                "emitted cost {emitted_cost} != totalCostCents {}",
                budget.total_cost_cents
            ),
        ));
    }

    let generated_by_strategy: u32 = payload.strategies.iter().map(|s| s.generated).sum();
    if generated_by_strategy != budget.generated_tickets {
        return Err(PayloadSchemaError::new(
            "$.strategies",
            format!(
                "generated sum {generated_by_strategy} != generatedTickets {}",
                budget.generated_tickets
            ),
        ));
    }
    if !payload
        .strategies
        .iter()
        .any(|s| s.name == StrategyName::Uniform)
    {
        return Err(PayloadSchemaError::new(
            "$.strategies",
            "missing implicit uniform entry",
        ));
    }
    for (i, s) in payload.strategies.iter().enumerate() {
        if payload.strategies[..i].iter().any(|p| p.name == s.name) {
            return Err(PayloadSchemaError::new(
                format!("$.strategies[{i}].name"),
                format!("duplicate strategy {}", s.name),
            ));
        }
        if s.weight < 0.0 {
            return Err(PayloadSchemaError::new(
                format!("$.strategies[{i}].weight"),
                "negative weight",
            ));
        }
    }

    let coverage = &payload.metrics.quadrant_coverage;
    if coverage.min > coverage.max {
        return Err(PayloadSchemaError::new(
            "$.metrics.quadrantCoverage",
            "min exceeds max",
        ));
    }
    Ok(())
}

/// Validate a payload against the `1.0` schema.
pub fn validate_payload(payload: &StrategyPayload) -> Result<(), PayloadSchemaError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| PayloadSchemaError::new("$", format!("serialization failed: {e}")))?;
    check_structure(&value)?;
    check_accounting(payload)
}
