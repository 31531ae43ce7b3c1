//! Greedy back-end (§4.4.1): a fast surrogate for the inner subproblem,
//! used to seed lambda_0, as the B&B lower bound, and as the sole back-end
//! when a caller wants low latency over optimality.

use std::collections::HashSet;

use crate::inner::InnerContext;
use crate::model::{AisleId, OrderId, Solution};

/// Run the greedy construction + repair for a fixed `lambda` over the whole
/// backlog. Returns the canonical [`Solution`] (objective = F/G) and the
/// subproblem value `F(x) - lambda * G(x)` attained.
pub fn solve_greedy(ctx: &InnerContext, lambda: f64) -> (Solution, f64) {
    greedy_construct(ctx, lambda, &[], &ctx.backlog.orders().collect::<Vec<_>>())
}

/// Same construction, restricted to a candidate pool of orders (used by B&B
/// to build a lower bound over `fixed_in ∪ free` with no forced prefix).
pub fn greedy_over(ctx: &InnerContext, lambda: f64, pool: &[OrderId]) -> (Solution, f64) {
    greedy_construct(ctx, lambda, &[], pool)
}

/// Greedy construction that starts from a forced-in prefix (a B&B node's
/// `fixed_in`) and greedily extends it from `free`. Used by the branch-and-
/// bound back-end's node lower bound: "build the greedy solution restricted
/// to `fixed_in ∪ free`" (§4.4.2).
pub fn greedy_with_forced(
    ctx: &InnerContext,
    lambda: f64,
    forced: &[OrderId],
    free: &[OrderId],
) -> (Solution, f64) {
    greedy_construct(ctx, lambda, forced, free)
}

fn greedy_construct(
    ctx: &InnerContext,
    lambda: f64,
    forced: &[OrderId],
    free_pool: &[OrderId],
) -> (Solution, f64) {
    let ub = ctx.backlog.wave.ub;
    let lb = ctx.backlog.wave.lb;

    let mut chosen: Vec<OrderId> = forced.to_vec();
    let mut covered: HashSet<AisleId> = ctx.indices.combined_aisle_superset(forced);
    let mut total_units: u32 = ctx.indices.total_units_of(forced);

    if total_units > ub {
        return (Solution::infeasible(), f64::NEG_INFINITY);
    }

    // Step 1-2: score the free pool against the cover already implied by
    // `forced`, keep strictly positive contributions, sort descending (tie:
    // larger u_o; tie: smaller order id).
    let mut candidates: Vec<(OrderId, f64, u32)> = free_pool
        .iter()
        .copied()
        .map(|o| {
            let (value, _) = ctx.scorer.contrib(o, lambda, &covered);
            (o, value, ctx.scorer.units(o))
        })
        .filter(|&(_, value, _)| value > 0.0)
        .collect();
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap()
            .then(b.2.cmp(&a.2))
            .then(a.0.cmp(&b.0))
    });

    // Step 3: accumulate, re-evaluating each candidate's contribution against
    // the cover as it actually stands at that point in the scan.
    for (o, _, u) in &candidates {
        if total_units + u > ub {
            continue;
        }
        let (effective, new_aisles) = ctx.scorer.contrib(*o, lambda, &covered);
        if effective > 0.0 || total_units < lb {
            chosen.push(*o);
            total_units += u;
            if new_aisles > 0 {
                covered.extend(ctx.scorer.required_aisles(*o).iter().copied());
            }
        }
    }

    // Step 4: repair towards LB if still short. Re-score the remaining free
    // orders by density relative to the current cover each round, taking the
    // single densest one, until LB is met or nothing more fits under UB.
    if total_units < lb {
        let mut chosen_set: HashSet<OrderId> = chosen.iter().copied().collect();
        while total_units < lb {
            let mut remaining: Vec<(OrderId, f64)> = free_pool
                .iter()
                .copied()
                .filter(|o| !chosen_set.contains(o))
                .filter(|o| total_units + ctx.scorer.units(*o) <= ub)
                .map(|o| (o, ctx.scorer.relative_density(o, &covered)))
                .collect();
            if remaining.is_empty() {
                return (Solution::infeasible(), f64::NEG_INFINITY);
            }
            remaining.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
            let (o, _) = remaining[0];

            chosen.push(o);
            chosen_set.insert(o);
            total_units += ctx.scorer.units(o);
            covered.extend(ctx.scorer.required_aisles(o).iter().copied());
        }
    }

    // Step 5: finalize — real minimal cover, real objective.
    match ctx.finalize(chosen) {
        Some(sol) => {
            let value = sol.total_units as f64 - lambda * sol.num_aisles() as f64;
            (sol, value)
        }
        None => (Solution::infeasible(), f64::NEG_INFINITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indices::Indices;
    use crate::model::{Backlog, Warehouse, Wave};
    use std::collections::HashMap;

    fn row(pairs: &[(u32, u32)]) -> HashMap<u32, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn scenario_a_single_order_single_aisle() {
        let wh = Warehouse::new(2, 1, vec![row(&[(0, 3), (1, 2)])]).unwrap();
        let bl = Backlog::new(1, vec![row(&[(0, 3), (1, 2)])], Wave::new(1, 100).unwrap(), 2).unwrap();
        let idx = Indices::build(&wh, &bl);
        let ctx = InnerContext::new(&wh, &bl, &idx);

        let (sol, _) = solve_greedy(&ctx, 0.0);
        assert_eq!(sol.orders(), &[0]);
        assert_eq!(sol.aisles(), &[0]);
        assert_eq!(sol.total_units, 5);
        assert_eq!(sol.objective, 5.0);
    }

    #[test]
    fn scenario_b_shared_aisle_beats_split() {
        let wh = Warehouse::new(1, 2, vec![row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(
            2,
            vec![row(&[(0, 4)]), row(&[(0, 3)])],
            Wave::new(1, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let ctx = InnerContext::new(&wh, &bl, &idx);

        let (sol, _) = solve_greedy(&ctx, 0.0);
        assert_eq!(sol.orders(), &[0, 1]);
        assert_eq!(sol.total_units, 7);
        assert_eq!(sol.num_aisles(), 1);
        assert_eq!(sol.objective, 7.0);
    }

    #[test]
    fn scenario_d_lb_requires_two_aisles() {
        let wh = Warehouse::new(2, 2, vec![row(&[(0, 5)]), row(&[(1, 5)])]).unwrap();
        let bl = Backlog::new(
            2,
            vec![row(&[(0, 5)]), row(&[(1, 5)])],
            Wave::new(10, 10).unwrap(),
            2,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let ctx = InnerContext::new(&wh, &bl, &idx);

        let (sol, _) = solve_greedy(&ctx, 0.0);
        assert_eq!(sol.orders(), &[0, 1]);
        assert_eq!(sol.aisles(), &[0, 1]);
        assert_eq!(sol.total_units, 10);
        assert_eq!(sol.objective, 5.0);
    }

    #[test]
    fn scenario_e_returns_infeasible_marker() {
        let wh = Warehouse::new(1, 1, vec![row(&[(0, 8)])]).unwrap();
        let bl = Backlog::new(
            2,
            vec![row(&[(0, 6)]), row(&[(0, 6)])],
            Wave::new(12, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let ctx = InnerContext::new(&wh, &bl, &idx);

        let (sol, _) = solve_greedy(&ctx, 0.0);
        assert!(sol.is_infeasible_marker());
    }

    #[test]
    fn forced_prefix_is_always_included() {
        let wh = Warehouse::new(1, 2, vec![row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(
            3,
            vec![row(&[(0, 1)]), row(&[(0, 2)]), row(&[(0, 3)])],
            Wave::new(0, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let ctx = InnerContext::new(&wh, &bl, &idx);

        let (sol, _) = greedy_with_forced(&ctx, 0.0, &[1], &[0, 2]);
        assert!(sol.orders().contains(&1));
    }
}
