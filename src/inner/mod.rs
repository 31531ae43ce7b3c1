//! Inner Subproblem Solver (§4.4): for a fixed lambda, maximise
//! `F(x) - lambda * G(x)` over order selections, with the aisle set implied
//! by [`FeasibilityOracle::minimal_cover`].
//!
//! Two back-ends share one context and one contract
//! ([`InnerSolver::solve`]); the Dinkelbach driver picks which to call. This
//! is the "variant type over concrete back-ends" re-architecture noted in
//! `DESIGN.md`: the source's inheritance hierarchy (`PLISolver` base class)
//! becomes an enum plus a free function, not a trait object hierarchy,
//! because there are exactly two back-ends and neither needs dynamic
//! dispatch.

pub mod branch_and_bound;
pub mod greedy;

use crate::deadline::Deadline;
use crate::feasibility::FeasibilityOracle;
use crate::indices::Indices;
use crate::model::{Backlog, Solution, Warehouse};
use crate::scorer::OrderScorer;

pub use branch_and_bound::{BranchAndBoundConfig, BranchAndBoundStats, VariableSelection};

/// Everything the inner solver needs, borrowed for the duration of one call.
/// Built once per Dinkelbach run and reused across all its iterations.
pub struct InnerContext<'a> {
    pub warehouse: &'a Warehouse,
    pub backlog: &'a Backlog,
    pub indices: &'a Indices,
    pub oracle: FeasibilityOracle<'a>,
    pub scorer: OrderScorer<'a>,
}

impl<'a> InnerContext<'a> {
    pub fn new(warehouse: &'a Warehouse, backlog: &'a Backlog, indices: &'a Indices) -> Self {
        Self {
            warehouse,
            backlog,
            indices,
            oracle: FeasibilityOracle::new(warehouse, backlog, indices),
            scorer: OrderScorer::new(indices),
        }
    }

    /// Finalise an order set into a canonical [`Solution`]: compute its
    /// minimal cover and total units. Returns `None` if the order set is
    /// stock-infeasible (empty cover from a non-empty order set).
    pub fn finalize(&self, order_set: Vec<crate::model::OrderId>) -> Option<Solution> {
        if order_set.is_empty() {
            return Some(Solution::infeasible());
        }
        let cover = self.oracle.minimal_cover(&order_set);
        if cover.is_empty() {
            return None;
        }
        let total_units = self.indices.total_units_of(&order_set);
        Some(Solution::canonical(order_set, cover, total_units))
    }
}

/// Selects which back-end `solve` dispatches to.
#[derive(Clone, Debug)]
pub enum BackEnd {
    Greedy,
    BranchAndBound(BranchAndBoundConfig),
}

impl Default for BackEnd {
    fn default() -> Self {
        BackEnd::BranchAndBound(BranchAndBoundConfig::default())
    }
}

/// Solve the linearised subproblem `max F(x) - lambda * G(x)` subject to
/// `LB <= F(x) <= UB` and stock feasibility, honouring `deadline`. Returns
/// the best feasible solution seen; [`Solution::infeasible`] if none exists.
pub fn solve(ctx: &InnerContext, back_end: &BackEnd, lambda: f64, deadline: Deadline) -> Solution {
    match back_end {
        BackEnd::Greedy => greedy::solve_greedy(ctx, lambda).0,
        BackEnd::BranchAndBound(cfg) => {
            branch_and_bound::solve_branch_and_bound(ctx, lambda, cfg, deadline).0
        }
    }
}
