//! Built-in number-selection handlers.
//!
//! Each handler draws from a ChaCha8 stream seeded by the attempt seed label,
//! so the same label always yields the same numbers.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;

use super::{
    DrawHistory, EmptyHistory, StrategyContext, StrategyError, StrategyHandler, StrategyName,
    StrategyOutput, StrategyRegistry,
};
use crate::seed::seeded_rng;
use crate::ticket::{MAX_NUMBER, MIN_NUMBER, QUADRANT_COUNT, QUADRANT_WIDTH, TicketMetadata};

const POOL_SIZE: usize = (MAX_NUMBER - MIN_NUMBER + 1) as usize;

fn check_k(k: u8) -> Result<usize, StrategyError> {
    let k = usize::from(k);
    if k == 0 || k > POOL_SIZE {
        return Err(StrategyError::Failed {
            reason: format!("cannot draw {k} numbers from a pool of {POOL_SIZE}"),
        });
    }
    Ok(k)
}

/// Parity balance and quadrant coverage folded into `[0, 1]`.
fn balance_score(meta: &TicketMetadata, k: usize) -> f64 {
    let parity = 1.0 - f64::from(meta.parity.spread()) / k as f64;
    let coverage = f64::from(meta.quadrants_covered()) / k.min(QUADRANT_COUNT) as f64;
    (parity + coverage) / 2.0
}

fn output(numbers: Vec<u8>, score: impl FnOnce(&TicketMetadata) -> f64) -> StrategyOutput {
    let provisional = TicketMetadata::describe(&numbers, 0.0);
    let metadata = TicketMetadata::describe(&numbers, score(&provisional));
    StrategyOutput { numbers, metadata }
}

// ─── Uniform ────────────────────────────────────────────────────────────

/// k distinct numbers, uniformly at random. Also the recovery strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformStrategy;

impl StrategyHandler for UniformStrategy {
    fn generate(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        let k = check_k(ctx.k)?;
        let mut rng = seeded_rng(ctx.seed);
        let mut numbers: Vec<u8> = rand::seq::index::sample(&mut rng, POOL_SIZE, k)
            .into_iter()
            .map(|i| MIN_NUMBER + i as u8)
            .collect();
        numbers.sort_unstable();
        Ok(output(numbers, |meta| balance_score(meta, k)))
    }
}

// ─── Balanced ───────────────────────────────────────────────────────────

/// Even/odd split as close to half as possible, quadrants visited
/// round-robin from a random starting quadrant.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedStrategy;

impl StrategyHandler for BalancedStrategy {
    fn generate(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        let k = check_k(ctx.k)?;
        let mut rng = seeded_rng(ctx.seed);

        let mut evens_left = k / 2;
        let mut odds_left = k - evens_left;
        if k % 2 == 1 && rng.random_bool(0.5) {
            std::mem::swap(&mut evens_left, &mut odds_left);
        }
        let start = rng.random_range(0..QUADRANT_COUNT);
        let mut chosen = BTreeSet::new();

        for i in 0..k {
            let want_even = if evens_left == 0 {
                false
            } else if odds_left == 0 {
                true
            } else {
                i % 2 == 0
            };
            let picked = pick_in_quadrants(&mut rng, &chosen, start + i, want_even).ok_or_else(
                || StrategyError::Failed {
                    reason: "balanced pool exhausted".to_string(),
                },
            )?;
            chosen.insert(picked);
            if picked % 2 == 0 {
                evens_left = evens_left.saturating_sub(1);
            } else {
                odds_left = odds_left.saturating_sub(1);
            }
        }

        let numbers: Vec<u8> = chosen.into_iter().collect();
        Ok(output(numbers, |meta| balance_score(meta, k)))
    }
}

fn pick_in_quadrants(
    rng: &mut ChaCha8Rng,
    chosen: &BTreeSet<u8>,
    first_quadrant: usize,
    want_even: bool,
) -> Option<u8> {
    for offset in 0..QUADRANT_COUNT {
        let q = (first_quadrant + offset) % QUADRANT_COUNT;
        let lo = MIN_NUMBER + q as u8 * QUADRANT_WIDTH;
        let candidates: Vec<u8> = (lo..lo + QUADRANT_WIDTH)
            .filter(|n| (n % 2 == 0) == want_even && !chosen.contains(n))
            .collect();
        if let Some(&n) = candidates.choose(rng) {
            return Some(n);
        }
    }
    None
}

// ─── Frequency-weighted (hot-streak / cold-surge) ───────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyBias {
    /// Favor numbers drawn often in the window.
    Hot,
    /// Favor numbers drawn rarely in the window.
    Cold,
}

/// Weighted sampling without replacement over window hit counts.
pub struct FrequencyStrategy {
    history: Arc<dyn DrawHistory + Send + Sync>,
    bias: FrequencyBias,
}

impl FrequencyStrategy {
    pub fn new(history: Arc<dyn DrawHistory + Send + Sync>, bias: FrequencyBias) -> Self {
        Self { history, bias }
    }
}

impl StrategyHandler for FrequencyStrategy {
    fn generate(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutput, StrategyError> {
        let k = check_k(ctx.k)?;
        let freqs = self.history.frequencies(ctx.window);
        if freqs.len() < POOL_SIZE || freqs.iter().all(|&f| f == 0) {
            return Err(StrategyError::InsufficientHistory { window: ctx.window });
        }
        let max_freq = freqs[..POOL_SIZE].iter().copied().max().unwrap_or(0);

        let mut pool: Vec<(u8, f64)> = freqs[..POOL_SIZE]
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let weight = match self.bias {
                    FrequencyBias::Hot => f64::from(f) + 1.0,
                    FrequencyBias::Cold => f64::from(max_freq - f) + 1.0,
                };
                (MIN_NUMBER + i as u8, weight)
            })
            .collect();

        let mut rng = seeded_rng(ctx.seed);
        let mut numbers = Vec::with_capacity(k);
        for _ in 0..k {
            let total: f64 = pool.iter().map(|(_, w)| w).sum();
            let mut threshold = rng.random::<f64>() * total;
            let mut idx = pool.len() - 1;
            for (i, (_, w)) in pool.iter().enumerate() {
                threshold -= w;
                if threshold <= 0.0 {
                    idx = i;
                    break;
                }
            }
            numbers.push(pool.swap_remove(idx).0);
        }
        numbers.sort_unstable();

        let heat = numbers
            .iter()
            .map(|&n| f64::from(freqs[usize::from(n - MIN_NUMBER)]))
            .sum::<f64>()
            / (k as f64 * f64::from(max_freq));
        let bias = self.bias;
        Ok(output(numbers, move |_| match bias {
            FrequencyBias::Hot => heat,
            FrequencyBias::Cold => 1.0 - heat,
        }))
    }
}

// ─── Registry ───────────────────────────────────────────────────────────

/// Registry of the built-in handlers over one history source.
pub struct BuiltinStrategies {
    uniform: UniformStrategy,
    balanced: BalancedStrategy,
    hot_streak: FrequencyStrategy,
    cold_surge: FrequencyStrategy,
}

impl BuiltinStrategies {
    pub fn new(history: Arc<dyn DrawHistory + Send + Sync>) -> Self {
        Self {
            uniform: UniformStrategy,
            balanced: BalancedStrategy,
            hot_streak: FrequencyStrategy::new(Arc::clone(&history), FrequencyBias::Hot),
            cold_surge: FrequencyStrategy::new(history, FrequencyBias::Cold),
        }
    }

    /// Registry with no draw history; frequency strategies always defer to
    /// the uniform fallback.
    pub fn without_history() -> Self {
        Self::new(Arc::new(EmptyHistory))
    }
}

impl StrategyRegistry for BuiltinStrategies {
    fn handler(&self, name: StrategyName) -> &dyn StrategyHandler {
        match name {
            StrategyName::Uniform => &self.uniform,
            StrategyName::Balanced => &self.balanced,
            StrategyName::HotStreak => &self.hot_streak,
            StrategyName::ColdSurge => &self.cold_surge,
        }
    }
}
