//! Deterministic seed derivation.
//!
//! Every random draw in a batch is derived from the caller's seed string:
//! - selector stream: `"{seed}:batch"`
//! - handler attempt: `"{seed}:{ticket_index}:{strategy}:{attempt}"`
//! - uniform fallback attempt: `"{seed}:{ticket_index}:uniform:{attempt}:fallback:{inner}"`
//!
//! **Hard rule:** no wall-clock input may reach a seed label. Two requests with
//! the same seed must replay the same tickets.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use xxhash_rust::xxh64::xxh64;

use crate::strategy::StrategyName;

/// Label for the batch-level strategy selection stream.
pub fn batch_seed_label(seed: &str) -> String {
    format!("{seed}:batch")
}

/// Label handed to a strategy handler for one generation attempt.
pub fn attempt_seed_label(
    seed: &str,
    ticket_index: usize,
    strategy: StrategyName,
    attempt: u32,
) -> String {
    format!("{seed}:{ticket_index}:{}:{attempt}", strategy.as_str())
}

/// Label for the nested uniform fallback loop.
///
/// Kept distinct from [`attempt_seed_label`] so a fallback never replays the
/// exact draw of an outer uniform attempt on the same slot.
pub fn fallback_seed_label(
    seed: &str,
    ticket_index: usize,
    outer_attempt: u32,
    inner_attempt: u32,
) -> String {
    format!(
        "{seed}:{ticket_index}:{}:{outer_attempt}:fallback:{inner_attempt}",
        StrategyName::Uniform.as_str()
    )
}

/// Hash a seed label into a 64-bit PRNG seed.
pub fn seed_to_u64(label: &str) -> u64 {
    xxh64(label.as_bytes(), 0)
}

/// Build a ChaCha8 stream seeded from a label.
pub fn seeded_rng(label: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed_to_u64(label))
}

/// Format a seed hash as a fixed-width hex string.
pub fn format_seed_hash(hash: u64) -> String {
    format!("{hash:016x}")
}
