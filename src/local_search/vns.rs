//! Variable Neighbourhood Search (§4.6.2): shake into a deeper neighbourhood
//! on stagnation, local-search back down, reset to `N_1` on any improvement.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::deadline::Deadline;
use crate::inner::InnerContext;
use crate::local_search::{evaluate, Move};
use crate::model::{OrderId, Solution};

#[derive(Clone, Copy, Debug)]
pub struct VnsConfig {
    pub k_max: usize,
    pub max_iter: usize,
}

impl Default for VnsConfig {
    fn default() -> Self {
        Self {
            k_max: 4,
            max_iter: 20_000,
        }
    }
}

pub fn run(
    ctx: &InnerContext,
    initial: Solution,
    cfg: &VnsConfig,
    deadline: Deadline,
    rng: &mut impl Rng,
    mut offer: impl FnMut(&Solution),
) -> Solution {
    let mut current = initial.clone();
    let mut best = initial;
    let mut k = 1usize;
    let mut iter = 0usize;

    while iter < cfg.max_iter && !deadline.exceeded() {
        let shaken = shake(ctx, &current, k, rng).unwrap_or_else(|| current.clone());
        let improved = local_search_add_remove(ctx, shaken);

        if improved.objective > current.objective {
            current = improved;
            offer(&current);
            if current.objective > best.objective {
                best = current.clone();
            }
            k = 1;
        } else {
            k = if k >= cfg.k_max { 1 } else { k + 1 };
        }
        iter += 1;
    }

    best
}

/// `N_k(s)`: drop `k` random orders, add `k` random addable ones, re-finalise.
/// Returns `None` if the perturbation lands on an infeasible order set.
pub(crate) fn shake(ctx: &InnerContext, current: &Solution, k: usize, rng: &mut impl Rng) -> Option<Solution> {
    let mut orders: Vec<OrderId> = current.orders().to_vec();
    for _ in 0..k {
        if orders.is_empty() {
            break;
        }
        let idx = rng.gen_range(0..orders.len());
        orders.remove(idx);
    }

    let addable: Vec<OrderId> = (0..ctx.backlog.num_orders)
        .filter(|o| !orders.contains(o))
        .collect();
    let adds: Vec<OrderId> = addable.choose_multiple(rng, k.min(addable.len())).copied().collect();
    orders.extend(adds);

    if orders.is_empty() {
        return None;
    }
    let total_units = ctx.indices.total_units_of(&orders);
    if !ctx.oracle.within_bounds(total_units) || !ctx.oracle.stock_feasible(&orders) {
        return None;
    }
    ctx.finalize(orders)
}

/// Repeatedly apply the single best-improving Add or Remove move until none
/// improves the objective.
pub(crate) fn local_search_add_remove(ctx: &InnerContext, mut sol: Solution) -> Solution {
    loop {
        let addable: Vec<OrderId> = (0..ctx.backlog.num_orders)
            .filter(|o| !sol.orders().contains(o))
            .collect();

        let mut best_delta = 0.0f64;
        let mut best_candidate: Option<Solution> = None;

        for &o in &addable {
            if let Some(eval) = evaluate(ctx, &sol, &Move::Add(o)) {
                if eval.delta > best_delta {
                    best_delta = eval.delta;
                    best_candidate = Some(eval.solution);
                }
            }
        }
        for &o in sol.orders() {
            if let Some(eval) = evaluate(ctx, &sol, &Move::Remove(o)) {
                if eval.delta > best_delta {
                    best_delta = eval.delta;
                    best_candidate = Some(eval.solution);
                }
            }
        }

        match best_candidate {
            Some(next) => sol = next,
            None => break,
        }
    }
    sol
}
