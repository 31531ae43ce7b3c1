//! Dinkelbach Driver (§4.5): the parametric outer loop for `max F(x)/G(x)`.
//!
//! Drives the inner solver across a sequence of `lambda` values until the
//! fixed point `lambda = F(x*)/G(x*)` is reached, with damping against
//! two-step oscillation and jitter-based escape from longer cycles.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::deadline::Deadline;
use crate::inner::{self, BackEnd, InnerContext};
use crate::model::{OrderId, Solution};

#[derive(Clone, Copy, Debug)]
pub struct DinkelbachConfig {
    pub epsilon: f64,
    pub max_iter: usize,
    /// Window length for cycle detection (spec default 4).
    pub cycle_window: usize,
}

impl Default for DinkelbachConfig {
    fn default() -> Self {
        Self {
            epsilon: 2e-3,
            max_iter: 200_000,
            cycle_window: 4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IterationRecord {
    pub iter: usize,
    pub lambda: f64,
    pub objective: f64,
}

#[derive(Clone, Debug)]
pub struct ConvergenceInfo {
    pub history: Vec<IterationRecord>,
    pub converged: bool,
    pub iterations: usize,
    pub elapsed: Duration,
    pub oscillation_count: u32,
    pub cycle_count: u32,
}

/// Run the Dinkelbach outer loop. `offer` is called with every distinct
/// feasible solution encountered (by order-set signature), letting the
/// caller feed an elite pool without this module knowing about one.
pub fn solve(
    ctx: &InnerContext,
    back_end: &BackEnd,
    cfg: &DinkelbachConfig,
    deadline: Deadline,
    rng: &mut impl Rng,
    mut offer: impl FnMut(&Solution),
) -> (Solution, ConvergenceInfo) {
    let start = Instant::now();
    let mut history = Vec::new();
    let mut seen: HashSet<Vec<OrderId>> = HashSet::new();
    let mut oscillation_count = 0u32;
    let mut cycle_count = 0u32;

    let mut lambda_history: Vec<f64> = vec![initial_lambda(ctx, back_end, deadline)];
    let mut best = Solution::infeasible();
    let mut converged = false;
    let mut iterations = 0usize;

    while iterations < cfg.max_iter && !deadline.exceeded() {
        let lambda_k = *lambda_history.last().unwrap();
        let s_k = inner::solve(ctx, back_end, lambda_k, deadline);

        let f_k = s_k.total_units;
        let g_k = s_k.num_aisles().max(1);
        let objective = f_k as f64 / g_k as f64;

        history.push(IterationRecord {
            iter: iterations,
            lambda: lambda_k,
            objective,
        });

        if !s_k.is_infeasible_marker() && seen.insert(s_k.orders().to_vec()) {
            offer(&s_k);
        }
        if !s_k.is_infeasible_marker() && s_k.objective > best.objective {
            best = s_k.clone();
        }

        iterations += 1;

        let next_raw = objective;
        if (next_raw - lambda_k).abs() < cfg.epsilon {
            converged = true;
            break;
        }

        let next_lambda = if is_oscillating(&lambda_history, cfg.epsilon) {
            oscillation_count += 1;
            let n = lambda_history.len();
            (lambda_history[n - 1] + lambda_history[n - 2]) / 2.0
        } else if is_cycling(&lambda_history, cfg.cycle_window, cfg.epsilon, next_raw) {
            cycle_count += 1;
            let jitter = rng.gen_range(-0.05..=0.05);
            lambda_k * (1.0 + jitter)
        } else {
            next_raw
        };

        lambda_history.push(next_lambda);
    }

    if best.is_infeasible_marker() && !history.is_empty() {
        // Fall through: re-solve at the final lambda to publish something,
        // even if no strictly-improving solution was ever recorded above.
        let lambda_k = *lambda_history.last().unwrap();
        best = inner::solve(ctx, back_end, lambda_k, deadline);
    }

    (
        best,
        ConvergenceInfo {
            history,
            converged,
            iterations,
            elapsed: start.elapsed(),
            oscillation_count,
            cycle_count,
        },
    )
}

fn initial_lambda(ctx: &InnerContext, back_end: &BackEnd, deadline: Deadline) -> f64 {
    let seed_back_end = BackEnd::Greedy;
    let _ = back_end; // the seeding step always uses the greedy surrogate (§4.5 step 1).
    let s0 = inner::solve(ctx, &seed_back_end, 0.0, deadline);
    if s0.is_infeasible_marker() {
        0.1
    } else {
        s0.objective
    }
}

/// Last two established lambdas bracket the newest without the run having
/// already converged to it: `|lambda_k - lambda_{k-2}| < eps` but
/// `|lambda_k - lambda_{k-1}| > eps`.
fn is_oscillating(history: &[f64], epsilon: f64) -> bool {
    let n = history.len();
    if n < 3 {
        return false;
    }
    let (lk, lk1, lk2) = (history[n - 1], history[n - 2], history[n - 3]);
    (lk - lk2).abs() < epsilon && (lk - lk1).abs() > epsilon
}

/// The last `window` established lambdas, plus the freshly computed
/// candidate, all sit within `epsilon` of one another: a longer cycle that
/// the two-step oscillation check would miss.
fn is_cycling(history: &[f64], window: usize, epsilon: f64, candidate: f64) -> bool {
    if history.len() < window {
        return false;
    }
    let tail = &history[history.len() - window..];
    let min = tail.iter().copied().fold(candidate, f64::min);
    let max = tail.iter().copied().fold(candidate, f64::max);
    (max - min) < epsilon
}
