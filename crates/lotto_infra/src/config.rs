//! Engine configuration defaults and resolution.
//!
//! Every parameter has a row in the defaults table. A missing value takes its
//! default; an explicit value must be positive and fit its target type,
//! otherwise resolution fails closed. Cross-field constraints are checked
//! once all parameters are resolved.

use serde::Deserialize;
use thiserror::Error;

use lotto_core::EngineOptions;
use lotto_core::limits::BettingLimits;

/// All engine configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    // Ticket size bounds
    MinDezenaCount,
    MaxDezenaCount,
    DefaultDezenaCount,

    // Batch bounds
    MaxTicketsPerBatch,
    MinBudgetCents,
    MaxBudgetCents,

    // Pricing
    BaseTicketCostCents,

    // Generation loop
    DefaultTimeoutMs,
    DefaultWindow,
    MaxAttemptsPerTicket,
}

/// Error when a parameter cannot be resolved to a usable value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config fail-closed: '{param_name}' {reason}")]
pub struct MissingConfigError {
    pub param_name: &'static str,
    pub reason: &'static str,
}

/// Returns the default for a parameter, or `None` if it must be configured.
pub fn default_value(param: ConfigParam) -> Option<u64> {
    match param {
        ConfigParam::MinDezenaCount => Some(6),
        ConfigParam::MaxDezenaCount => Some(20),
        ConfigParam::DefaultDezenaCount => Some(6),

        ConfigParam::MaxTicketsPerBatch => Some(100),
        ConfigParam::MinBudgetCents => Some(600),
        ConfigParam::MaxBudgetCents => Some(5_000_000),

        ConfigParam::BaseTicketCostCents => Some(600),

        ConfigParam::DefaultTimeoutMs => Some(10_000),
        ConfigParam::DefaultWindow => Some(100),
        ConfigParam::MaxAttemptsPerTicket => Some(100),
    }
}

/// Returns the snake_case name for a parameter (matches the JSON keys).
pub fn param_name(param: ConfigParam) -> &'static str {
    match param {
        ConfigParam::MinDezenaCount => "min_dezena_count",
        ConfigParam::MaxDezenaCount => "max_dezena_count",
        ConfigParam::DefaultDezenaCount => "default_dezena_count",
        ConfigParam::MaxTicketsPerBatch => "max_tickets_per_batch",
        ConfigParam::MinBudgetCents => "min_budget_cents",
        ConfigParam::MaxBudgetCents => "max_budget_cents",
        ConfigParam::BaseTicketCostCents => "base_ticket_cost_cents",
        ConfigParam::DefaultTimeoutMs => "default_timeout_ms",
        ConfigParam::DefaultWindow => "default_window",
        ConfigParam::MaxAttemptsPerTicket => "max_attempts_per_ticket",
    }
}

/// Expected number of ConfigParam variants. Update when adding new variants.
pub const EXPECTED_PARAM_COUNT: usize = 10;

/// All known `ConfigParam` variants (for exhaustive iteration in tests).
pub const ALL_PARAMS: &[ConfigParam] = &[
    ConfigParam::MinDezenaCount,
    ConfigParam::MaxDezenaCount,
    ConfigParam::DefaultDezenaCount,
    ConfigParam::MaxTicketsPerBatch,
    ConfigParam::MinBudgetCents,
    ConfigParam::MaxBudgetCents,
    ConfigParam::BaseTicketCostCents,
    ConfigParam::DefaultTimeoutMs,
    ConfigParam::DefaultWindow,
    ConfigParam::MaxAttemptsPerTicket,
];

/// Resolve a configuration value.
///
/// - `Some(v)` with `v > 0` → `v`.
/// - `Some(0)` → `Err` (every parameter is a positive count, amount or span).
/// - `None` → the default, or `Err` when the parameter has none.
pub fn resolve_config_value(
    param: ConfigParam,
    value: Option<u64>,
) -> Result<u64, MissingConfigError> {
    if let Some(v) = value {
        if v == 0 {
            return Err(MissingConfigError {
                param_name: param_name(param),
                reason: "must be greater than zero",
            });
        }
        return Ok(v);
    }
    default_value(param).ok_or_else(|| MissingConfigError {
        param_name: param_name(param),
        reason: "is missing and has no default",
    })
}

fn resolve_narrow<T: TryFrom<u64>>(
    param: ConfigParam,
    value: Option<u64>,
) -> Result<T, MissingConfigError> {
    let v = resolve_config_value(param, value)?;
    T::try_from(v).map_err(|_| MissingConfigError {
        param_name: param_name(param),
        reason: "is out of range for its type",
    })
}

// ─── Engine config ──────────────────────────────────────────────────────

/// Raw overrides as loaded from JSON. Absent keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigOverrides {
    pub min_dezena_count: Option<u64>,
    pub max_dezena_count: Option<u64>,
    pub default_dezena_count: Option<u64>,
    pub max_tickets_per_batch: Option<u64>,
    pub min_budget_cents: Option<u64>,
    pub max_budget_cents: Option<u64>,
    pub base_ticket_cost_cents: Option<u64>,
    pub default_timeout_ms: Option<u64>,
    pub default_window: Option<u64>,
    pub max_attempts_per_ticket: Option<u64>,
}

/// Fully resolved and cross-checked engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub limits: BettingLimits,
    pub base_ticket_cost_cents: u64,
    pub options: EngineOptions,
}

impl EngineConfig {
    /// Resolve every parameter and check cross-field constraints.
    pub fn resolve(overrides: &EngineConfigOverrides) -> Result<Self, MissingConfigError> {
        let limits = BettingLimits {
            min_dezena_count: resolve_narrow(ConfigParam::MinDezenaCount, overrides.min_dezena_count)?,
            max_dezena_count: resolve_narrow(ConfigParam::MaxDezenaCount, overrides.max_dezena_count)?,
            default_dezena_count: resolve_narrow(
                ConfigParam::DefaultDezenaCount,
                overrides.default_dezena_count,
            )?,
            max_tickets_per_batch: resolve_narrow(
                ConfigParam::MaxTicketsPerBatch,
                overrides.max_tickets_per_batch,
            )?,
            min_budget_cents: resolve_config_value(
                ConfigParam::MinBudgetCents,
                overrides.min_budget_cents,
            )?,
            max_budget_cents: resolve_config_value(
                ConfigParam::MaxBudgetCents,
                overrides.max_budget_cents,
            )?,
        };

        if limits.min_dezena_count > limits.max_dezena_count {
            return Err(MissingConfigError {
                param_name: param_name(ConfigParam::MinDezenaCount),
                reason: "exceeds max_dezena_count",
            });
        }
        if !limits.allows_k(limits.default_dezena_count) {
            return Err(MissingConfigError {
                param_name: param_name(ConfigParam::DefaultDezenaCount),
                reason: "outside [min_dezena_count, max_dezena_count]",
            });
        }
        if limits.min_budget_cents > limits.max_budget_cents {
            return Err(MissingConfigError {
                param_name: param_name(ConfigParam::MinBudgetCents),
                reason: "exceeds max_budget_cents",
            });
        }

        let options = EngineOptions {
            default_timeout_ms: resolve_config_value(
                ConfigParam::DefaultTimeoutMs,
                overrides.default_timeout_ms,
            )?,
            default_window: resolve_narrow(ConfigParam::DefaultWindow, overrides.default_window)?,
            max_attempts_per_ticket: resolve_narrow(
                ConfigParam::MaxAttemptsPerTicket,
                overrides.max_attempts_per_ticket,
            )?,
        };

        Ok(Self {
            limits,
            base_ticket_cost_cents: resolve_config_value(
                ConfigParam::BaseTicketCostCents,
                overrides.base_ticket_cost_cents,
            )?,
            options,
        })
    }

    /// Defaults for every parameter.
    pub fn defaults() -> Result<Self, MissingConfigError> {
        Self::resolve(&EngineConfigOverrides::default())
    }
}

/// Failure to load an engine config from JSON.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] MissingConfigError),
}

/// Parse overrides from JSON and resolve them.
pub fn load_engine_config(json: &str) -> Result<EngineConfig, ConfigLoadError> {
    let overrides: EngineConfigOverrides = serde_json::from_str(json)?;
    let config = EngineConfig::resolve(&overrides)?;
    tracing::info!(
        min_k = config.limits.min_dezena_count,
        max_k = config.limits.max_dezena_count,
        base_cost_cents = config.base_ticket_cost_cents,
        "engine config loaded"
    );
    Ok(config)
}
