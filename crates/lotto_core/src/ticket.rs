//! Ticket value types and per-ticket metadata.
//!
//! Number space is `MIN_NUMBER..=MAX_NUMBER`. Quadrants are decile-sized
//! ranges of `QUADRANT_WIDTH` numbers (1-10, 11-20, ..., 51-60).

use serde::{Deserialize, Serialize};

use crate::strategy::{StrategyError, StrategyName};

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 60;
pub const QUADRANT_WIDTH: u8 = 10;
pub const QUADRANT_COUNT: usize = (MAX_NUMBER / QUADRANT_WIDTH) as usize;

/// Even/odd split of a ticket's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parity {
    pub even: u32,
    pub odd: u32,
}

impl Parity {
    /// Absolute even/odd imbalance.
    pub fn spread(&self) -> u32 {
        self.even.abs_diff(self.odd)
    }
}

/// Hit count for one quadrant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantCount {
    pub start: u8,
    pub end: u8,
    pub count: u32,
}

/// Statistical description attached to every ticket by its strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMetadata {
    pub sum: u32,
    /// Strategy-specific quality score in `[0, 1]`.
    pub score: f64,
    pub parity: Parity,
    pub quadrants: Vec<QuadrantCount>,
}

impl TicketMetadata {
    /// Describe a set of numbers. Shared by every built-in handler so the
    /// accumulated metrics stay comparable across strategies.
    pub fn describe(numbers: &[u8], score: f64) -> Self {
        let mut parity = Parity::default();
        let mut quadrants: Vec<QuadrantCount> = (0..QUADRANT_COUNT)
            .map(|q| {
                let start = q as u8 * QUADRANT_WIDTH + MIN_NUMBER;
                QuadrantCount {
                    start,
                    end: start + QUADRANT_WIDTH - 1,
                    count: 0,
                }
            })
            .collect();

        for &n in numbers {
            if n % 2 == 0 {
                parity.even += 1;
            } else {
                parity.odd += 1;
            }
            if let Some(q) = quadrant_of(n) {
                quadrants[q].count += 1;
            }
        }

        Self {
            sum: numbers.iter().map(|&n| u32::from(n)).sum(),
            score: if score.is_finite() {
                score.clamp(0.0, 1.0)
            } else {
                0.0
            },
            parity,
            quadrants,
        }
    }

    /// Number of quadrants holding at least one number.
    pub fn quadrants_covered(&self) -> u32 {
        self.quadrants.iter().filter(|q| q.count > 0).count() as u32
    }
}

/// Quadrant index for a number, `None` when outside the number space.
pub fn quadrant_of(n: u8) -> Option<usize> {
    if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
        return None;
    }
    Some(((n - MIN_NUMBER) / QUADRANT_WIDTH) as usize)
}

/// One generated ticket. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyTicket {
    pub strategy: StrategyName,
    /// Sorted, unique.
    pub numbers: Vec<u8>,
    pub metadata: TicketMetadata,
    pub cost_cents: u64,
    pub seed: String,
}

impl StrategyTicket {
    /// Ticket size.
    pub fn k(&self) -> u8 {
        self.numbers.len() as u8
    }

    /// Batch-wide uniqueness key.
    pub fn key(&self) -> String {
        ticket_key(&self.numbers)
    }
}

/// Uniqueness key: sorted numbers joined with commas.
pub fn ticket_key(sorted_numbers: &[u8]) -> String {
    let mut key = String::with_capacity(sorted_numbers.len() * 3);
    for (i, n) in sorted_numbers.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(&n.to_string());
    }
    key
}

/// Sort and check handler output against the requested size.
///
/// Rejects wrong counts, out-of-range numbers and repeats. A rejection is a
/// strategy failure, never a batch error.
pub fn canonicalize_numbers(mut numbers: Vec<u8>, k: u8) -> Result<Vec<u8>, StrategyError> {
    if numbers.len() != usize::from(k) {
        return Err(StrategyError::InvalidOutput {
            reason: format!("expected {k} numbers, got {}", numbers.len()),
        });
    }
    if let Some(&n) = numbers
        .iter()
        .find(|n| !(MIN_NUMBER..=MAX_NUMBER).contains(*n))
    {
        return Err(StrategyError::InvalidOutput {
            reason: format!("number {n} outside {MIN_NUMBER}..={MAX_NUMBER}"),
        });
    }
    numbers.sort_unstable();
    if let Some(pair) = numbers.windows(2).find(|w| w[0] == w[1]) {
        return Err(StrategyError::InvalidOutput {
            reason: format!("number {} repeated", pair[0]),
        });
    }
    Ok(numbers)
}
