//! Deterministic RNG seeding.
//!
//! A single master seed is supplied at startup; every worker, and every
//! randomized decision inside a worker, derives its seed from that master
//! seed plus a small integer tag — never from `random_device`/OS entropy.
//! This mirrors the teacher engine's `seed_start + i` pattern and is what
//! makes single-worker runs exactly reproducible (§5: "Reproducibility is
//! guaranteed only for single-worker runs with a fixed seed").

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Derive a worker's seed from the run's master seed and its 0-based index.
/// Splitmix-style mixing so adjacent worker ids don't produce adjacent,
/// correlated ChaCha streams.
pub fn worker_seed(master_seed: u64, worker_id: u32) -> u64 {
    mix64(master_seed ^ splitmix_step(worker_id as u64))
}

/// Derive a sub-seed for a named purpose within a worker (e.g. the
/// diversified-construction RNG vs. the local-search perturbation RNG),
/// keeping the two streams independent even though both trace back to the
/// same worker seed.
pub fn sub_seed(worker_seed: u64, tag: u64) -> u64 {
    mix64(worker_seed ^ mix64(tag.wrapping_mul(0x9E3779B97F4A7C15)))
}

pub fn rng_from_seed(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

fn splitmix_step(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 33)).wrapping_mul(0xFF51AFD7ED558CCD);
    z = (z ^ (z >> 33)).wrapping_mul(0xC4CEB9FE1A85EC53);
    z ^ (z >> 33)
}
