//! Local-Search Engine (§4.6): three metaheuristics sharing one move
//! vocabulary and one move evaluator over a single [`Solution`].
//!
//! Each algorithm owns its own acceptance/diversification policy; none of
//! them mutate a Solution in place — every move produces a *new* canonical
//! Solution via [`evaluate`], consistent with the Solution Ledger's
//! publish-by-value lifecycle.

pub mod ils;
pub mod tabu;
pub mod vns;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::inner::InnerContext;
use crate::model::{AisleId, OrderId, Solution};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Move {
    Add(OrderId),
    Remove(OrderId),
    Swap(OrderId, OrderId),
    /// Drop two, add one.
    Chain2For1(OrderId, OrderId, OrderId),
    /// Drop two, add two.
    Chain2For2(OrderId, OrderId, OrderId, OrderId),
    /// Multi-remove: every order using the least-shared aisle in the cover.
    CorridorReduction(Vec<OrderId>),
}

/// A move's identity for tabu bookkeeping, independent of evaluation result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MoveKey {
    pub added: Vec<OrderId>,
    pub removed: Vec<OrderId>,
}

pub fn move_key(mv: &Move) -> MoveKey {
    let (mut added, mut removed) = match mv {
        Move::Add(o) => (vec![*o], vec![]),
        Move::Remove(o) => (vec![], vec![*o]),
        Move::Swap(out, inn) => (vec![*inn], vec![*out]),
        Move::Chain2For1(o1, o2, inn) => (vec![*inn], vec![*o1, *o2]),
        Move::Chain2For2(o1, o2, in1, in2) => (vec![*in1, *in2], vec![*o1, *o2]),
        Move::CorridorReduction(drops) => (vec![], drops.clone()),
    };
    added.sort_unstable();
    removed.sort_unstable();
    MoveKey { added, removed }
}

/// The orders a move touches, for frequency/recency bookkeeping.
pub fn moved_orders(mv: &Move) -> Vec<OrderId> {
    let key = move_key(mv);
    let mut out = key.added;
    out.extend(key.removed);
    out
}

pub struct MoveEval {
    pub solution: Solution,
    pub delta: f64,
}

fn apply_move(current: &[OrderId], mv: &Move) -> Vec<OrderId> {
    let mut set: Vec<OrderId> = current.to_vec();
    match mv {
        Move::Add(o) => set.push(*o),
        Move::Remove(o) => set.retain(|x| x != o),
        Move::Swap(out, inn) => {
            set.retain(|x| x != out);
            set.push(*inn);
        }
        Move::Chain2For1(o1, o2, inn) => {
            set.retain(|x| x != o1 && x != o2);
            set.push(*inn);
        }
        Move::Chain2For2(o1, o2, in1, in2) => {
            set.retain(|x| x != o1 && x != o2);
            set.push(*in1);
            set.push(*in2);
        }
        Move::CorridorReduction(drops) => set.retain(|x| !drops.contains(x)),
    }
    set
}

/// Construct the candidate order set, recompute its minimal cover, and
/// return `new_objective - old_objective`. Rejects (returns `None`, standing
/// in for a `-infinity` delta) on an LB/UB or stock-feasibility violation.
pub fn evaluate(ctx: &InnerContext, current: &Solution, mv: &Move) -> Option<MoveEval> {
    let candidate_orders = apply_move(current.orders(), mv);
    if candidate_orders.is_empty() {
        return None;
    }
    let total_units = ctx.indices.total_units_of(&candidate_orders);
    if !ctx.oracle.within_bounds(total_units) {
        return None;
    }
    if !ctx.oracle.stock_feasible(&candidate_orders) {
        return None;
    }
    let solution = ctx.finalize(candidate_orders)?;
    let delta = solution.objective - current.objective;
    Some(MoveEval { solution, delta })
}

/// The aisle in the current cover used by the fewest orders; dropping all
/// of them in one move is a candidate for eliminating that aisle entirely.
fn corridor_reduction_candidate(ctx: &InnerContext, current: &Solution) -> Option<Move> {
    let mut best: Option<(AisleId, Vec<OrderId>)> = None;
    for &a in current.aisles() {
        let users: Vec<OrderId> = current
            .orders()
            .iter()
            .copied()
            .filter(|&o| ctx.scorer.required_aisles(o).contains(&a))
            .collect();
        if users.is_empty() {
            continue;
        }
        let smaller = best.as_ref().map(|(_, cur)| users.len() < cur.len()).unwrap_or(true);
        if smaller {
            best = Some((a, users));
        }
    }
    best.map(|(_, users)| Move::CorridorReduction(users))
}

/// Generate a bounded candidate pool spanning every move kind: sampled
/// Add/Remove/Swap/chain moves plus the single corridor-reduction move.
pub fn generate_moves(ctx: &InnerContext, current: &Solution, rng: &mut impl Rng) -> Vec<Move> {
    let mut moves = Vec::new();
    let in_solution: Vec<OrderId> = current.orders().to_vec();
    let addable: Vec<OrderId> = (0..ctx.backlog.num_orders)
        .filter(|o| !in_solution.contains(o))
        .collect();

    let add_sample: Vec<OrderId> = sample(&addable, 20, rng);
    for &o in &add_sample {
        moves.push(Move::Add(o));
    }
    for &o in &in_solution {
        moves.push(Move::Remove(o));
    }

    let swap_out: Vec<OrderId> = sample(&in_solution, 8, rng);
    let swap_in: Vec<OrderId> = sample(&addable, 8, rng);
    for &out in &swap_out {
        for &inn in &swap_in {
            moves.push(Move::Swap(out, inn));
        }
    }

    if in_solution.len() >= 2 {
        let drop_pairs: Vec<OrderId> = sample(&in_solution, 6, rng);
        for pair in drop_pairs.chunks(2) {
            if let [o1, o2] = pair {
                if let Some(&inn) = swap_in.first() {
                    moves.push(Move::Chain2For1(*o1, *o2, inn));
                }
                if swap_in.len() >= 2 {
                    moves.push(Move::Chain2For2(*o1, *o2, swap_in[0], swap_in[1]));
                }
            }
        }
    }

    if let Some(mv) = corridor_reduction_candidate(ctx, current) {
        moves.push(mv);
    }
    moves
}

fn sample(pool: &[OrderId], k: usize, rng: &mut impl Rng) -> Vec<OrderId> {
    pool.choose_multiple(rng, k.min(pool.len())).copied().collect()
}
