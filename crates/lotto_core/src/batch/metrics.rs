//! Statistical summary over the tickets of one batch.

use serde::{Deserialize, Serialize};

use crate::ticket::TicketMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuadrantCoverage {
    pub min: u32,
    pub max: u32,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetrics {
    pub average_sum: f64,
    pub average_score: f64,
    /// Mean absolute even/odd difference.
    pub parity_spread: f64,
    pub quadrant_coverage: QuadrantCoverage,
}

/// Running totals; `build` never divides by zero.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    tickets: u32,
    sum_total: u64,
    score_total: f64,
    parity_spread_total: u64,
    coverage_total: u64,
    coverage_min: Option<u32>,
    coverage_max: u32,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, metadata: &TicketMetadata) {
        let covered = metadata.quadrants_covered();
        self.tickets += 1;
        self.sum_total += u64::from(metadata.sum);
        self.score_total += metadata.score;
        self.parity_spread_total += u64::from(metadata.parity.spread());
        self.coverage_total += u64::from(covered);
        self.coverage_min = Some(self.coverage_min.map_or(covered, |m| m.min(covered)));
        self.coverage_max = self.coverage_max.max(covered);
    }

    pub fn tickets(&self) -> u32 {
        self.tickets
    }

    pub fn build(&self) -> BatchMetrics {
        if self.tickets == 0 {
            return BatchMetrics::default();
        }
        let n = f64::from(self.tickets);
        BatchMetrics {
            average_sum: self.sum_total as f64 / n,
            average_score: self.score_total / n,
            parity_spread: self.parity_spread_total as f64 / n,
            quadrant_coverage: QuadrantCoverage {
                min: self.coverage_min.unwrap_or(0),
                max: self.coverage_max,
                average: self.coverage_total as f64 / n,
            },
        }
    }
}
