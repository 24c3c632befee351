//! Affordability resolution for one ticket.
//!
//! Candidate precedence (duplicates skipped):
//! 1. override: the strategy's `kOverride`, when set
//! 2. fallback: the slot's planned `k`
//! 3. default: the batch `k`
//!
//! The first candidate whose cost fits the remaining budget wins. Landing on
//! anything other than an explicit override yields a warning. No fit is a
//! normal outcome (`Ok(None)`), never an error.

use serde::{Deserialize, Serialize};

use crate::pricing::{PricingError, TicketCostCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeSource {
    Override,
    Fallback,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRequest {
    pub desired_k: Option<u8>,
    pub fallback_k: u8,
    pub default_k: u8,
    pub budget_remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSize {
    pub k: u8,
    pub cost_cents: u64,
    pub source: SizeSource,
    /// Set when an explicit override could not be honored.
    pub warning: Option<String>,
}

/// Resolve the ticket size to generate. Cost lookups go through the batch memo.
pub fn resolve_affordable_size(
    request: &SizeRequest,
    costs: &mut TicketCostCache<'_>,
) -> Result<Option<ResolvedSize>, PricingError> {
    let mut candidates: Vec<(u8, SizeSource)> = Vec::with_capacity(3);
    if let Some(k) = request.desired_k {
        candidates.push((k, SizeSource::Override));
    }
    for (k, source) in [
        (request.fallback_k, SizeSource::Fallback),
        (request.default_k, SizeSource::Default),
    ] {
        if !candidates.iter().any(|(c, _)| *c == k) {
            candidates.push((k, source));
        }
    }

    for (k, source) in candidates {
        let cost_cents = costs.cost(k)?;
        if cost_cents > request.budget_remaining {
            continue;
        }
        let warning = match request.desired_k {
            Some(desired) if desired != k => Some(format!(
                "kOverride {desired} unaffordable with {} cents remaining; generated k={k} ({source:?}) instead",
                request.budget_remaining
            )),
            _ => None,
        };
        return Ok(Some(ResolvedSize {
            k,
            cost_cents,
            source,
            warning,
        }));
    }

    Ok(None)
}
