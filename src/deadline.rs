//! Wall-clock deadline management (§5).
//!
//! A monotonic deadline is installed once per run; every loop body (Dinkelbach
//! iteration, local-search iteration, B&B node pop) polls
//! [`Deadline::exceeded`] and exits early if it has fired, publishing the
//! best solution seen so far rather than running unbounded. Deadlines nest:
//! a per-instance deadline is capped by a fraction of whatever remains of
//! the global one, and per-algorithm deadlines nest inside that.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn never() -> Self {
        // A deadline 100 years out is effectively "no deadline" without
        // needing an `Option` at every call site.
        Self::after(Duration::from_secs(100 * 365 * 24 * 3600))
    }

    #[inline]
    pub fn exceeded(&self) -> bool {
        Instant::now() >= self.at
    }

    #[inline]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Derive a nested deadline capped at `cap` but never later than this
    /// deadline itself: `T_instance = min(T_instance_cap, fraction * T_remaining_global)`.
    pub fn nested(&self, cap: Duration, fraction: f64) -> Self {
        let budget = self.remaining().mul_f64(fraction.clamp(0.0, 1.0)).min(cap);
        Self {
            at: Instant::now() + budget,
        }
    }
}
