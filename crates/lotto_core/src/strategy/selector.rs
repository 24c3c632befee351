//! Strategy weight normalization and weighted roulette selection.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::StrategyName;
use crate::batch::{BatchGenerationError, StrategyRequest};
use crate::seed::{batch_seed_label, seeded_rng};

/// A strategy entry after merging duplicates and dropping zero weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStrategy {
    pub name: StrategyName,
    /// Always > 0.
    pub weight: f64,
    pub window: Option<u32>,
    pub k_override: Option<u8>,
}

/// Merge same-name entries by summing weights and drop non-positive totals.
///
/// Order follows first appearance. For merged entries the first explicit
/// `window` / `kOverride` wins.
///
/// Errors:
/// - unknown name → `UnknownStrategy`
/// - negative or non-finite weight, merged weight or total → `InvalidRequest`
/// - nothing left → `NoStrategyAvailable`
pub fn normalize_strategies(
    requests: &[StrategyRequest],
) -> Result<Vec<NormalizedStrategy>, BatchGenerationError> {
    let mut merged: Vec<NormalizedStrategy> = Vec::with_capacity(requests.len());

    for request in requests {
        let name = StrategyName::parse(&request.name).ok_or_else(|| {
            BatchGenerationError::UnknownStrategy {
                name: request.name.clone(),
            }
        })?;
        if !request.weight.is_finite() || request.weight < 0.0 {
            return Err(BatchGenerationError::InvalidRequest {
                field: "strategies.weight",
                reason: format!("weight for {name} must be finite and >= 0"),
            });
        }

        match merged.iter_mut().find(|s| s.name == name) {
            Some(existing) => {
                existing.weight += request.weight;
                existing.window = existing.window.or(request.window);
                existing.k_override = existing.k_override.or(request.k_override);
            }
            None => merged.push(NormalizedStrategy {
                name,
                weight: request.weight,
                window: request.window,
                k_override: request.k_override,
            }),
        }
    }

    merged.retain(|s| s.weight > 0.0);
    if merged.is_empty() {
        return Err(BatchGenerationError::NoStrategyAvailable);
    }
    if let Some(s) = merged.iter().find(|s| !s.weight.is_finite()) {
        return Err(BatchGenerationError::InvalidRequest {
            field: "strategies.weight",
            reason: format!("merged weight for {} is not finite", s.name),
        });
    }
    if !merged.iter().map(|s| s.weight).sum::<f64>().is_finite() {
        return Err(BatchGenerationError::InvalidRequest {
            field: "strategies.weight",
            reason: "total weight is not finite".to_string(),
        });
    }
    Ok(merged)
}

/// Roulette pick for a draw `r` in `[0, 1)`.
///
/// Scales `r` by the total weight and subtracts each weight in input order
/// until the threshold is non-positive. Float residue on the last entry
/// selects the last entry.
pub fn select_strategy(strategies: &[NormalizedStrategy], r: f64) -> Option<&NormalizedStrategy> {
    let total: f64 = strategies.iter().map(|s| s.weight).sum();
    let mut threshold = r * total;
    for strategy in strategies {
        threshold -= strategy.weight;
        if threshold <= 0.0 {
            return Some(strategy);
        }
    }
    strategies.last()
}

/// Seeded selector driving one batch.
pub struct StrategySelector {
    strategies: Vec<NormalizedStrategy>,
    rng: ChaCha8Rng,
}

impl StrategySelector {
    /// `strategies` must be non-empty (see [`normalize_strategies`]).
    pub fn new(strategies: Vec<NormalizedStrategy>, seed: &str) -> Self {
        Self {
            strategies,
            rng: seeded_rng(&batch_seed_label(seed)),
        }
    }

    /// Draw the next strategy.
    pub fn next_strategy(&mut self) -> Option<NormalizedStrategy> {
        let r = self.rng.random::<f64>();
        select_strategy(&self.strategies, r).copied()
    }
}
