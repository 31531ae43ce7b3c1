//! Branch-and-bound back-end (§4.4.2): a best-first search over order
//! in/out decisions, with problem-specific bounds and two cut families. No
//! general-purpose MIP library is used — bounds, branching, and cuts are all
//! specific to the F(x) - lambda*G(x) structure of this problem.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::deadline::Deadline;
use crate::inner::greedy::greedy_with_forced;
use crate::inner::InnerContext;
use crate::model::{AisleId, OrderId, Solution};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableSelection {
    /// The `o ∈ free` with the largest `contrib(o, lambda, covered)`.
    MaxImpact,
    /// The `o` whose contribution, normalised into `[0, 1]`, is closest to
    /// 0.5 — the least-decided-looking variable.
    MostInfeasible,
    /// Historical impact of "fix in" vs "fix out" per order, updated with
    /// an exponential moving average; picks the order maximising the
    /// product of its two pseudo-costs.
    PseudoCost,
}

#[derive(Clone, Debug)]
pub struct BranchAndBoundConfig {
    pub time_budget: Duration,
    pub variable_selection: VariableSelection,
    /// Learning rate for pseudo-cost updates (spec default 0.15).
    pub pseudo_cost_alpha: f64,
}

impl Default for BranchAndBoundConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            variable_selection: VariableSelection::MaxImpact,
            pseudo_cost_alpha: 0.15,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BranchAndBoundStats {
    pub nodes_explored: u64,
    pub nodes_pruned_bound: u64,
    pub nodes_pruned_infeasible: u64,
    pub cuts_coverage: u64,
    pub cuts_dominance: u64,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
struct Node {
    fixed_in: Vec<OrderId>,
    fixed_out: Vec<OrderId>,
    free: Vec<OrderId>,
    covered: HashSet<AisleId>,
    units_in: u32,
}

struct QueueNode {
    node: Node,
    bound_up: f64,
}

impl PartialEq for QueueNode {
    fn eq(&self, other: &Self) -> bool {
        self.bound_up == other.bound_up
    }
}
impl Eq for QueueNode {}
impl PartialOrd for QueueNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound_up.partial_cmp(&other.bound_up).unwrap_or(Ordering::Equal)
    }
}

/// Order pairs that can never jointly appear in `fixed_in`: either their
/// combined units already exceed UB, or they are jointly stock-infeasible.
/// Precomputed once per B&B call and consulted as an adjacency set — O(1)
/// per membership check instead of re-scanning all pairs per node.
struct CoverageCuts {
    conflicts: HashMap<OrderId, HashSet<OrderId>>,
}

impl CoverageCuts {
    fn build(ctx: &InnerContext) -> Self {
        let orders: Vec<OrderId> = ctx.backlog.orders().collect();
        let ub = ctx.backlog.wave.ub;
        let mut conflicts: HashMap<OrderId, HashSet<OrderId>> = HashMap::new();

        for (i, &a) in orders.iter().enumerate() {
            for &b in &orders[i + 1..] {
                let combined_units = ctx.indices.units(a) + ctx.indices.units(b);
                let jointly_infeasible =
                    combined_units > ub || !ctx.oracle.stock_feasible(&[a, b]);
                if jointly_infeasible {
                    conflicts.entry(a).or_default().insert(b);
                    conflicts.entry(b).or_default().insert(a);
                }
            }
        }
        Self { conflicts }
    }

    fn conflicts_with(&self, order: OrderId, fixed_in: &[OrderId]) -> bool {
        match self.conflicts.get(&order) {
            None => false,
            Some(set) => fixed_in.iter().any(|o| set.contains(o)),
        }
    }
}

/// Per-order pseudo-cost state for the `PseudoCost` branching strategy.
#[derive(Default)]
struct PseudoCosts {
    pc_in: HashMap<OrderId, f64>,
    pc_out: HashMap<OrderId, f64>,
    alpha: f64,
}

impl PseudoCosts {
    fn new(alpha: f64) -> Self {
        Self {
            pc_in: HashMap::new(),
            pc_out: HashMap::new(),
            alpha,
        }
    }

    fn get_in(&self, o: OrderId) -> f64 {
        self.pc_in.get(&o).copied().unwrap_or(0.0)
    }

    fn get_out(&self, o: OrderId) -> f64 {
        self.pc_out.get(&o).copied().unwrap_or(0.0)
    }

    fn observe_in(&mut self, o: OrderId, delta: f64) {
        let cur = self.get_in(o);
        self.pc_in.insert(o, (1.0 - self.alpha) * cur + self.alpha * delta.abs());
    }

    fn observe_out(&mut self, o: OrderId, delta: f64) {
        let cur = self.get_out(o);
        self.pc_out.insert(o, (1.0 - self.alpha) * cur + self.alpha * delta.abs());
    }
}

/// Solve the linearised subproblem via best-first branch-and-bound. Returns
/// the best feasible solution seen and execution statistics.
pub fn solve_branch_and_bound(
    ctx: &InnerContext,
    lambda: f64,
    cfg: &BranchAndBoundConfig,
    outer_deadline: Deadline,
) -> (Solution, BranchAndBoundStats) {
    let start = Instant::now();
    let deadline = outer_deadline.nested(cfg.time_budget, 1.0);
    let ub = ctx.backlog.wave.ub;

    let mut stats = BranchAndBoundStats::default();
    let cuts = CoverageCuts::build(ctx);
    let mut pseudo = PseudoCosts::new(cfg.pseudo_cost_alpha);

    let root = Node {
        fixed_in: Vec::new(),
        fixed_out: Vec::new(),
        free: ctx.backlog.orders().collect(),
        covered: HashSet::new(),
        units_in: 0,
    };

    let (mut incumbent, mut incumbent_value) = initial_incumbent(ctx, lambda, &root.free);
    let root_bound = upper_bound(ctx, lambda, &root.covered, root.units_in, &root.free, ub);

    let mut queue: BinaryHeap<QueueNode> = BinaryHeap::new();
    queue.push(QueueNode {
        node: root,
        bound_up: root_bound,
    });

    while let Some(QueueNode { node, bound_up }) = queue.pop() {
        if deadline.exceeded() {
            break;
        }
        stats.nodes_explored += 1;

        if bound_up <= incumbent_value {
            stats.nodes_pruned_bound += 1;
            continue;
        }

        let Some(&var) = select_variable(ctx, lambda, &node, cfg.variable_selection, &pseudo) else {
            // No free variables left: this node is a completed assignment.
            // `units_in <= UB` was already enforced incrementally while
            // branching; LB still needs checking here.
            if ctx.oracle.within_bounds(node.units_in) {
                if let Some(sol) = ctx.finalize(node.fixed_in.clone()) {
                    let value = sol.total_units as f64 - lambda * sol.num_aisles() as f64;
                    if value > incumbent_value {
                        incumbent_value = value;
                        incumbent = sol;
                    }
                }
            }
            continue;
        };

        let remaining_free: Vec<OrderId> = node.free.iter().copied().filter(|&o| o != var).collect();

        // ── "in" child ──────────────────────────────────────────────────
        let in_units = node.units_in + ctx.indices.units(var);
        let mut fixed_in_child = node.fixed_in.clone();
        fixed_in_child.push(var);

        let in_pruned = in_units > ub
            || !ctx.oracle.stock_feasible(&fixed_in_child)
            || cuts.conflicts_with(var, &node.fixed_in);
        if in_pruned {
            stats.nodes_pruned_infeasible += 1;
            if cuts.conflicts_with(var, &node.fixed_in) {
                stats.cuts_coverage += 1;
            }
        } else {
            let mut covered_child = node.covered.clone();
            covered_child.extend(ctx.scorer.required_aisles(var).iter().copied());

            let bound_in = upper_bound(ctx, lambda, &covered_child, in_units, &remaining_free, ub);
            pseudo.observe_in(var, bound_up - bound_in);

            if bound_in > incumbent_value {
                let (lb_sol, lb_value) =
                    greedy_with_forced(ctx, lambda, &fixed_in_child, &remaining_free);
                if lb_value > incumbent_value {
                    incumbent_value = lb_value;
                    incumbent = lb_sol;
                }
                queue.push(QueueNode {
                    node: Node {
                        fixed_in: fixed_in_child,
                        fixed_out: node.fixed_out.clone(),
                        free: remaining_free.clone(),
                        covered: covered_child,
                        units_in: in_units,
                    },
                    bound_up: bound_in,
                });
            } else {
                stats.nodes_pruned_bound += 1;
            }
        }

        // ── "out" child ──────────────────────────────────────────────────
        let dominated = remaining_free
            .iter()
            .any(|&a| dominates(ctx, lambda, &node.covered, a, var));
        if dominated {
            stats.cuts_dominance += 1;
            stats.nodes_pruned_infeasible += 1;
        } else {
            let bound_out = upper_bound(ctx, lambda, &node.covered, node.units_in, &remaining_free, ub);
            pseudo.observe_out(var, bound_up - bound_out);

            if bound_out > incumbent_value {
                let mut fixed_out_child = node.fixed_out.clone();
                fixed_out_child.push(var);

                let (lb_sol, lb_value) =
                    greedy_with_forced(ctx, lambda, &node.fixed_in, &remaining_free);
                if lb_value > incumbent_value {
                    incumbent_value = lb_value;
                    incumbent = lb_sol;
                }
                queue.push(QueueNode {
                    node: Node {
                        fixed_in: node.fixed_in.clone(),
                        fixed_out: fixed_out_child,
                        free: remaining_free,
                        covered: node.covered.clone(),
                        units_in: node.units_in,
                    },
                    bound_up: bound_out,
                });
            } else {
                stats.nodes_pruned_bound += 1;
            }
        }
    }

    stats.elapsed = start.elapsed();
    (incumbent, stats)
}

fn initial_incumbent(ctx: &InnerContext, lambda: f64, pool: &[OrderId]) -> (Solution, f64) {
    let (sol, value) = greedy_with_forced(ctx, lambda, &[], pool);
    if sol.is_infeasible_marker() {
        (sol, f64::NEG_INFINITY)
    } else {
        (sol, value)
    }
}

/// Admissible upper bound on `F(x) - lambda*G(x)` attainable at or below a
/// node: start from the value already locked in by `fixed_in`, then
/// simulate adding positive-contribution free orders in descending-contrib
/// order, re-evaluating each against the evolving cover, stopping when an
/// addition no longer improves or would break UB. Over-estimates because it
/// ignores which *combinations* of aisle openings are jointly achievable.
fn upper_bound(
    ctx: &InnerContext,
    lambda: f64,
    covered: &HashSet<AisleId>,
    units_in: u32,
    free: &[OrderId],
    ub: u32,
) -> f64 {
    let mut sim_covered = covered.clone();
    let mut sim_units = units_in;
    let mut value = units_in as f64 - lambda * covered.len() as f64;

    let mut scored: Vec<(OrderId, f64, u32)> = free
        .iter()
        .copied()
        .map(|o| {
            let (v, _) = ctx.scorer.contrib(o, lambda, covered);
            (o, v, ctx.scorer.units(o))
        })
        .filter(|&(_, v, _)| v > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));

    for (o, _, u) in scored {
        if sim_units + u > ub {
            continue;
        }
        let (effective, new_aisles) = ctx.scorer.contrib(o, lambda, &sim_covered);
        if effective > 0.0 {
            value += effective;
            sim_units += u;
            if new_aisles > 0 {
                sim_covered.extend(ctx.scorer.required_aisles(o).iter().copied());
            }
        }
    }
    value
}

fn dominates(
    ctx: &InnerContext,
    lambda: f64,
    covered: &HashSet<AisleId>,
    a: OrderId,
    b: OrderId,
) -> bool {
    if ctx.scorer.units(a) > ctx.scorer.units(b) {
        return false;
    }
    let new_a: HashSet<AisleId> = ctx
        .scorer
        .required_aisles(a)
        .iter()
        .filter(|x| !covered.contains(x))
        .copied()
        .collect();
    let new_b: HashSet<AisleId> = ctx
        .scorer
        .required_aisles(b)
        .iter()
        .filter(|x| !covered.contains(x))
        .copied()
        .collect();
    if !new_a.is_subset(&new_b) {
        return false;
    }
    let (contrib_a, _) = ctx.scorer.contrib(a, lambda, covered);
    let (contrib_b, _) = ctx.scorer.contrib(b, lambda, covered);
    contrib_a >= contrib_b
}

fn select_variable<'a>(
    ctx: &InnerContext,
    lambda: f64,
    node: &'a Node,
    strategy: VariableSelection,
    pseudo: &PseudoCosts,
) -> Option<&'a OrderId> {
    if node.free.is_empty() {
        return None;
    }
    match strategy {
        VariableSelection::MaxImpact => node.free.iter().max_by(|&&a, &&b| {
            let (va, _) = ctx.scorer.contrib(a, lambda, &node.covered);
            let (vb, _) = ctx.scorer.contrib(b, lambda, &node.covered);
            va.partial_cmp(&vb).unwrap().then(b.cmp(&a))
        }),
        VariableSelection::MostInfeasible => node.free.iter().min_by(|&&a, &&b| {
            let na = normalized_contrib(ctx, lambda, node, a);
            let nb = normalized_contrib(ctx, lambda, node, b);
            (na - 0.5).abs().partial_cmp(&(nb - 0.5).abs()).unwrap().then(a.cmp(&b))
        }),
        VariableSelection::PseudoCost => node.free.iter().max_by(|&&a, &&b| {
            let pa = pseudo.get_in(a) * pseudo.get_out(a);
            let pb = pseudo.get_in(b) * pseudo.get_out(b);
            pa.partial_cmp(&pb).unwrap().then(b.cmp(&a))
        }),
    }
}

fn normalized_contrib(ctx: &InnerContext, lambda: f64, node: &Node, o: OrderId) -> f64 {
    let (value, _) = ctx.scorer.contrib(o, lambda, &node.covered);
    let units = ctx.scorer.units(o).max(1) as f64;
    (value / units).clamp(0.0, 1.0)
}
