//! Tabu Search (§4.6.1): short-term tabu memory plus a three-mode cycle
//! (Normal → Diversification → Intensification) driven off long-term
//! frequency/recency bookkeeping.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use crate::deadline::Deadline;
use crate::inner::InnerContext;
use crate::local_search::{evaluate, generate_moves, move_key, moved_orders, Move, MoveKey};
use crate::model::{OrderId, Solution};

#[derive(Clone, Copy, Debug)]
pub struct TabuConfig {
    pub tenure_base: u32,
    pub max_no_improve: u32,
    pub cycles_diversification: u32,
    pub cycles_intensification: u32,
    pub max_iter: usize,
}

impl Default for TabuConfig {
    fn default() -> Self {
        Self {
            tenure_base: 10,
            max_no_improve: 100,
            cycles_diversification: 10,
            cycles_intensification: 5,
            max_iter: 50_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Normal,
    Diversification,
    Intensification,
}

/// Per-order long-term memory: how often an order has been part of an
/// accepted move (frequency) and the last iteration it was (recency).
#[derive(Default)]
struct LongTermMemory {
    frequency: HashMap<OrderId, u32>,
    recency: HashMap<OrderId, usize>,
}

impl LongTermMemory {
    fn record(&mut self, orders: &[OrderId], iter: usize) {
        for &o in orders {
            *self.frequency.entry(o).or_insert(0) += 1;
            self.recency.insert(o, iter);
        }
    }

    fn total_frequency(&self, orders: &[OrderId]) -> u32 {
        orders.iter().map(|o| self.frequency.get(o).copied().unwrap_or(0)).sum()
    }
}

pub fn run(
    ctx: &InnerContext,
    initial: Solution,
    cfg: &TabuConfig,
    deadline: Deadline,
    rng: &mut impl Rng,
    mut offer: impl FnMut(&Solution),
) -> Solution {
    let mut current = initial.clone();
    let mut best = initial;
    let mut mode = Mode::Normal;
    let mut tabu: HashMap<MoveKey, usize> = HashMap::new();
    let mut memory = LongTermMemory::default();
    let mut no_improve = 0u32;
    let mut mode_cycles = 0u32;
    let mut iter = 0usize;

    while iter < cfg.max_iter && !deadline.exceeded() {
        let candidates = generate_moves(ctx, &current, rng);
        let chosen = pick_move(ctx, &current, &candidates, &tabu, &memory, mode, &best, iter);

        let Some((mv, key, eval)) = chosen else {
            break;
        };

        current = eval.solution;
        offer(&current);

        let touched = moved_orders(&mv);
        memory.record(&touched, iter);
        let tenure = cfg.tenure_base as usize + rng.gen_range(0..5usize);
        tabu.insert(key, iter + tenure);

        if current.objective > best.objective {
            best = current.clone();
            no_improve = 0;
        } else {
            no_improve += 1;
        }

        match mode {
            Mode::Normal if no_improve >= cfg.max_no_improve => {
                mode = Mode::Diversification;
                mode_cycles = 0;
                current = best.clone();
            }
            Mode::Diversification => {
                mode_cycles += 1;
                if mode_cycles >= cfg.cycles_diversification {
                    mode = Mode::Intensification;
                    mode_cycles = 0;
                    current = best.clone();
                }
            }
            Mode::Intensification => {
                mode_cycles += 1;
                if mode_cycles >= cfg.cycles_intensification {
                    mode = Mode::Normal;
                    mode_cycles = 0;
                    current = best.clone();
                }
            }
            Mode::Normal => {}
        }

        iter += 1;
    }

    best
}

#[allow(clippy::too_many_arguments)]
fn pick_move(
    ctx: &InnerContext,
    current: &Solution,
    candidates: &[Move],
    tabu: &HashMap<MoveKey, usize>,
    memory: &LongTermMemory,
    mode: Mode,
    best: &Solution,
    iter: usize,
) -> Option<(Move, MoveKey, crate::local_search::MoveEval)> {
    let mut choice: Option<(Move, MoveKey, crate::local_search::MoveEval, f64)> = None;

    for mv in candidates {
        let Some(eval) = evaluate(ctx, current, mv) else {
            continue;
        };
        let key = move_key(mv);
        let expires_at = tabu.get(&key).copied().unwrap_or(0);
        let is_tabu = expires_at > iter;
        let aspirated = eval.solution.objective > best.objective;
        if is_tabu && !aspirated {
            continue;
        }

        // In diversification mode, bias the score towards moves touching
        // least-frequently-used orders rather than pure delta.
        let score = if mode == Mode::Diversification {
            let touched = moved_orders(mv);
            let freq_penalty = memory.total_frequency(&touched) as f64;
            eval.delta - 0.01 * freq_penalty
        } else {
            eval.delta
        };

        let better = choice.as_ref().map(|(_, _, _, cur_score)| score > *cur_score).unwrap_or(true);
        if better {
            choice = Some((mv.clone(), key, eval, score));
        }
    }

    choice.map(|(mv, key, eval, _)| (mv, key, eval))
}
