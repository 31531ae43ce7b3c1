//! Top-level integration tests: end-to-end pipeline (parse, solve, write)
//! plus the universal properties and concrete scenarios.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use wavepick_core::coordinator::{self, CoordinatorConfig};
use wavepick_core::deadline::Deadline;
use wavepick_core::feasibility::FeasibilityOracle;
use wavepick_core::indices::Indices;
use wavepick_core::inner::branch_and_bound::solve_branch_and_bound;
use wavepick_core::inner::{BackEnd, BranchAndBoundConfig, InnerContext};
use wavepick_core::model::{Backlog, ItemId, Solution, Warehouse, Wave};
use wavepick_core::parse::parse_instance;
use wavepick_core::write::format_solution;

fn row(pairs: &[(ItemId, u32)]) -> HashMap<ItemId, u32> {
    pairs.iter().copied().collect()
}

fn run_sequential(wh: &Warehouse, bl: &Backlog, millis: u64) -> Solution {
    let idx = Indices::build(wh, bl);
    let cfg = CoordinatorConfig {
        num_workers: 1,
        ..CoordinatorConfig::default()
    };
    let stop = AtomicBool::new(false);
    coordinator::run(wh, bl, &idx, &cfg, Deadline::after(Duration::from_millis(millis)), &stop)
}

fn assert_universal_properties(wh: &Warehouse, bl: &Backlog, idx: &Indices, sol: &Solution) {
    if sol.is_infeasible_marker() {
        return;
    }
    assert!(bl.wave.within(sol.total_units), "LB <= units <= UB must hold");

    let oracle = FeasibilityOracle::new(wh, bl, idx);
    let agg = idx.aggregate_demand(bl, sol.orders());
    for (&item, &demand) in &agg {
        let stock: u32 = sol.aisles().iter().map(|&a| wh.stock_of(a, item)).sum();
        assert!(stock >= demand, "item {item} demand {demand} exceeds chosen stock {stock}");
    }

    let recovered = oracle.minimal_cover(sol.orders());
    assert_eq!(recovered, sol.aisles(), "minimal_cover must be idempotent on a published solution");

    let expected_objective = sol.total_units as f64 / sol.num_aisles() as f64;
    assert!((sol.objective - expected_objective).abs() < 1e-9);
}

// ─── Scenario A: trivial single-order instance ───

#[test]
fn scenario_a_trivial_single_order() {
    let text = "1 2 1\n2 0 3 1 2\n2 0 3 1 2\n1 100\n";
    let instance = parse_instance(text).unwrap();
    let idx = Indices::build(&instance.warehouse, &instance.backlog);
    let ctx = InnerContext::new(&instance.warehouse, &instance.backlog, &idx);

    let sol = ctx.finalize(vec![0]).unwrap();
    assert_eq!(sol.orders(), &[0]);
    assert_eq!(sol.aisles(), &[0]);
    assert_eq!(sol.total_units, 5);
    assert_eq!(sol.objective, 5.0);
    assert_universal_properties(&instance.warehouse, &instance.backlog, &idx, &sol);
}

// ─── Scenario B: two orders, shared aisle beats split ───

#[test]
fn scenario_b_shared_aisle_beats_split() {
    let wh = Warehouse::new(1, 2, vec![row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
    let bl = Backlog::new(2, vec![row(&[(0, 4)]), row(&[(0, 3)])], Wave::new(1, 100).unwrap(), 1).unwrap();
    let idx = Indices::build(&wh, &bl);
    let ctx = InnerContext::new(&wh, &bl, &idx);

    let sol = ctx.finalize(vec![0, 1]).unwrap();
    assert_eq!(sol.orders(), &[0, 1]);
    assert_eq!(sol.aisles().len(), 1);
    assert_eq!(sol.total_units, 7);
    assert_eq!(sol.objective, 7.0);
    assert_universal_properties(&wh, &bl, &idx, &sol);

    let best = run_sequential(&wh, &bl, 150);
    assert!(best.objective >= 7.0);
}

// ─── Scenario C: UB forces selection ───

#[test]
fn scenario_c_ub_forces_selection() {
    let wh = Warehouse::new(1, 1, vec![row(&[(0, 15)])]).unwrap();
    let bl = Backlog::new(
        3,
        vec![row(&[(0, 5)]), row(&[(0, 5)]), row(&[(0, 5)])],
        Wave::new(5, 10).unwrap(),
        1,
    )
    .unwrap();
    let idx = Indices::build(&wh, &bl);

    let best = run_sequential(&wh, &bl, 200);
    assert!(!best.is_infeasible_marker());
    assert_eq!(best.total_units, 10);
    assert_eq!(best.objective, 10.0);
    assert_eq!(best.orders().len(), 2);
    assert_universal_properties(&wh, &bl, &idx, &best);
}

// ─── Scenario D: LB requires two aisles ───

#[test]
fn scenario_d_lb_requires_two_aisles() {
    let wh = Warehouse::new(2, 2, vec![row(&[(0, 5)]), row(&[(1, 5)])]).unwrap();
    let bl = Backlog::new(2, vec![row(&[(0, 5)]), row(&[(1, 5)])], Wave::new(10, 10).unwrap(), 2).unwrap();
    let idx = Indices::build(&wh, &bl);
    let ctx = InnerContext::new(&wh, &bl, &idx);

    let sol = ctx.finalize(vec![0, 1]).unwrap();
    assert_eq!(sol.orders(), &[0, 1]);
    assert_eq!(sol.aisles(), &[0, 1]);
    assert_eq!(sol.total_units, 10);
    assert_eq!(sol.objective, 5.0);
    assert_universal_properties(&wh, &bl, &idx, &sol);
}

// ─── Scenario E: stock infeasibility on combination ───

#[test]
fn scenario_e_stock_infeasible_on_combination() {
    let wh = Warehouse::new(1, 1, vec![row(&[(0, 8)])]).unwrap();
    let bl = Backlog::new(2, vec![row(&[(0, 6)]), row(&[(0, 6)])], Wave::new(12, 100).unwrap(), 1).unwrap();
    let idx = Indices::build(&wh, &bl);
    let ctx = InnerContext::new(&wh, &bl, &idx);

    assert!(ctx.finalize(vec![0, 1]).is_none());

    let best = run_sequential(&wh, &bl, 150);
    assert!(best.is_infeasible_marker());
}

// ─── Scenario F: dominance cut triggers ───

#[test]
fn scenario_f_dominance_cut_excludes_dominated_order() {
    let wh = Warehouse::new(2, 2, vec![row(&[(0, 20)]), row(&[(1, 20)])]).unwrap();
    let bl = Backlog::new(
        3,
        vec![
            row(&[(0, 4)]),         // order 0: needs aisle 0 only
            row(&[(0, 4), (1, 1)]), // order 1: needs aisles 0 and 1 — dominated by order 0
            row(&[(0, 4)]),         // order 2: same profile as order 0
        ],
        Wave::new(4, 8).unwrap(),
        2,
    )
    .unwrap();
    let idx = Indices::build(&wh, &bl);
    let ctx = InnerContext::new(&wh, &bl, &idx);

    // At lambda=2, order 0's contribution (4 - 2*1 = 2) strictly dominates
    // order 1's (5 - 2*2 = 1): no more units, a subset of the new aisles,
    // and at least as much contribution — the dominance cut should discard
    // order 1 without ever finalising a branch that includes it.
    let cfg = BranchAndBoundConfig::default();
    let (sol, stats) = solve_branch_and_bound(&ctx, 2.0, &cfg, Deadline::never());

    assert!(!sol.is_infeasible_marker());
    assert!(
        !sol.orders().contains(&1),
        "dominated order 1 should not appear in the published solution"
    );
    assert_eq!(sol.orders(), &[0, 2]);
    assert_eq!(sol.aisles(), &[0]);
    assert_eq!(sol.total_units, 8);
    assert_eq!(sol.objective, 8.0);
    assert!(stats.cuts_dominance > 0, "dominance cut should have fired at least once");
    assert_universal_properties(&wh, &bl, &idx, &sol);
}

// ─── End-to-end pipeline: parse -> coordinate -> write ───

#[test]
fn end_to_end_parse_solve_write_round_trips() {
    let text = "3 1 1\n1 0 5\n1 0 5\n1 0 5\n1 0 15\n5 10\n";
    let instance = parse_instance(text).unwrap();

    let best = run_sequential(&instance.warehouse, &instance.backlog, 200);
    assert!(!best.is_infeasible_marker());

    let idx = Indices::build(&instance.warehouse, &instance.backlog);
    assert_universal_properties(&instance.warehouse, &instance.backlog, &idx, &best);

    let formatted = format_solution(&best);
    let mut lines = formatted.lines();
    let num_orders: usize = lines.next().unwrap().parse().unwrap();
    assert_eq!(num_orders, best.orders().len());
}

#[test]
fn end_to_end_round_trips_through_a_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let instance_path = dir.path().join("instance.txt");
    std::fs::write(&instance_path, "2 2 2\n1 0 4\n2 0 2 1 1\n1 0 5\n1 1 5\n1 10\n").unwrap();

    let text = std::fs::read_to_string(&instance_path).unwrap();
    let instance = parse_instance(&text).unwrap();
    let best = run_sequential(&instance.warehouse, &instance.backlog, 150);

    let out_path = dir.path().join("solution.txt");
    std::fs::write(&out_path, format_solution(&best)).unwrap();
    let round_tripped = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(round_tripped, format_solution(&best));
}

// ─── Dinkelbach monotonicity and B&B soundness, exercised end-to-end ───

#[test]
fn dinkelbach_lambda_sequence_is_monotone_up_to_convergence() {
    let wh = Warehouse::new(1, 2, vec![row(&[(0, 20)]), row(&[(0, 20)])]).unwrap();
    let bl = Backlog::new(
        4,
        vec![row(&[(0, 2)]), row(&[(0, 3)]), row(&[(0, 5)]), row(&[(0, 1)])],
        Wave::new(0, 100).unwrap(),
        1,
    )
    .unwrap();
    let idx = Indices::build(&wh, &bl);
    let ctx = InnerContext::new(&wh, &bl, &idx);

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let (_best, info) = wavepick_core::dinkelbach::solve(
        &ctx,
        &BackEnd::default(),
        &wavepick_core::dinkelbach::DinkelbachConfig::default(),
        Deadline::after(Duration::from_secs(1)),
        &mut rng,
        |_| {},
    );
    // every recorded lambda is non-negative and the final gap is within epsilon
    // (oscillation/cycle escapes are the only sanctioned non-monotone steps,
    // and this instance is far too small to trigger one).
    for w in info.history.windows(2) {
        assert!(w[1].lambda >= w[0].lambda - 1e-6);
    }
    assert!(info.converged);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every published solution, across a broad family of small random
    /// instances, satisfies the universal properties from the spec: bound
    /// compliance, stock feasibility, and a minimal, idempotent aisle cover.
    #[test]
    fn published_solutions_always_satisfy_universal_properties(
        demands in prop::collection::vec(1u32..8, 1..6),
        stock in 4u32..40,
        lb in 0u32..10,
        extra_ub in 0u32..30,
    ) {
        let wh = Warehouse::new(1, 1, vec![row(&[(0, stock)])]).unwrap();
        let bl = Backlog::new(
            demands.len() as u32,
            demands.iter().map(|&d| row(&[(0, d)])).collect(),
            Wave::new(lb, lb + extra_ub).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);

        let best = run_sequential(&wh, &bl, 80);
        assert_universal_properties(&wh, &bl, &idx, &best);
    }
}
