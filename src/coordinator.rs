//! Parallel Restart Coordinator (§4.7): `W` independent OS threads, each
//! running its own Dinkelbach + local-search restart chain, communicating
//! only through a single mutex-guarded [`Ledger`] (§5). No work-stealing
//! queues, no channels — a worker pool, not a scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rand::Rng;

use crate::deadline::Deadline;
use crate::dinkelbach::{self, DinkelbachConfig};
use crate::indices::Indices;
use crate::inner::{greedy, BackEnd, InnerContext};
use crate::ledger::Ledger;
use crate::local_search::tabu::{self, TabuConfig};
use crate::local_search::{ils, vns};
use crate::model::{Backlog, Solution, Warehouse};
use crate::rng::{rng_from_seed, worker_seed};

/// Local-search iterations between diversification-exchange checks.
pub const COMM_INTERVAL: usize = 100;
/// Probability a worker adopts the Ledger's best at an exchange point.
pub const EXCHANGE_PROBABILITY: f64 = 0.25;
/// Restart chunks run per Dinkelbach re-seed before drawing a fresh one.
const CHUNKS_PER_RESTART: usize = 10;

#[derive(Clone, Copy, Debug)]
pub enum LocalSearchChoice {
    Tabu(TabuConfig),
    Vns(vns::VnsConfig),
    Ils(ils::IlsConfig),
}

impl Default for LocalSearchChoice {
    fn default() -> Self {
        LocalSearchChoice::Tabu(TabuConfig::default())
    }
}

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub num_workers: usize,
    pub master_seed: u64,
    pub back_end: BackEnd,
    pub dinkelbach: DinkelbachConfig,
    pub local_search: LocalSearchChoice,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            master_seed: 0,
            back_end: BackEnd::default(),
            dinkelbach: DinkelbachConfig::default(),
            local_search: LocalSearchChoice::default(),
        }
    }
}

/// Clamp a user-requested worker count into `[2, hardware_parallelism]`; a
/// request of exactly 1 is honoured as a genuinely sequential run.
pub fn resolve_worker_count(requested: usize) -> usize {
    if requested <= 1 {
        return 1;
    }
    let hw = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    requested.clamp(2, hw.max(2))
}

/// Run the coordinator to completion (all workers exit when `deadline`
/// fires or `stop` is raised) and return the best solution found.
pub fn run(
    warehouse: &Warehouse,
    backlog: &Backlog,
    indices: &Indices,
    cfg: &CoordinatorConfig,
    deadline: Deadline,
    stop: &AtomicBool,
) -> Solution {
    let ledger = Mutex::new(Ledger::new());

    thread::scope(|scope| {
        for worker_id in 0..cfg.num_workers as u32 {
            let ledger = &ledger;
            scope.spawn(move || {
                run_worker(warehouse, backlog, indices, cfg, deadline, worker_id, ledger, stop);
            });
        }
    });

    ledger.lock().unwrap().best()
}

fn publish(ledger: &Mutex<Ledger>, sol: &Solution) {
    ledger.lock().unwrap().offer(sol.clone());
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    warehouse: &Warehouse,
    backlog: &Backlog,
    indices: &Indices,
    cfg: &CoordinatorConfig,
    deadline: Deadline,
    worker_id: u32,
    ledger: &Mutex<Ledger>,
    stop: &AtomicBool,
) {
    let ctx = InnerContext::new(warehouse, backlog, indices);
    let seed = worker_seed(cfg.master_seed, worker_id);
    let mut rng = rng_from_seed(seed);
    let mut worker_best = Solution::infeasible();

    while !deadline.exceeded() && !stop.load(Ordering::Relaxed) {
        let mut current = diversified_start(&ctx, &mut rng);

        let (dinkelbach_best, _info) = dinkelbach::solve(
            &ctx,
            &cfg.back_end,
            &cfg.dinkelbach,
            deadline,
            &mut rng,
            |sol| publish(ledger, sol),
        );
        if dinkelbach_best.objective > current.objective {
            current = dinkelbach_best;
        }
        publish(ledger, &current);

        for _ in 0..CHUNKS_PER_RESTART {
            if deadline.exceeded() || stop.load(Ordering::Relaxed) {
                break;
            }
            current = run_local_search_chunk(&ctx, current, cfg, deadline, &mut rng, |sol| {
                publish(ledger, sol)
            });

            if rng.gen_bool(EXCHANGE_PROBABILITY) {
                let peeked = ledger.lock().unwrap().best();
                if peeked.objective > current.objective {
                    current = peeked;
                }
            }
        }

        if current.objective > worker_best.objective {
            worker_best = current;
        }
    }

    publish(ledger, &worker_best);
}

/// "Perturbing a greedy construction with its RNG" (§4.7 step 3).
fn diversified_start(ctx: &InnerContext, rng: &mut impl Rng) -> Solution {
    let base = greedy::solve_greedy(ctx, 0.0).0;
    if base.is_infeasible_marker() {
        return base;
    }
    vns::shake(ctx, &base, 2, rng).unwrap_or(base)
}

fn run_local_search_chunk(
    ctx: &InnerContext,
    current: Solution,
    cfg: &CoordinatorConfig,
    deadline: Deadline,
    rng: &mut impl Rng,
    offer: impl FnMut(&Solution),
) -> Solution {
    match &cfg.local_search {
        LocalSearchChoice::Tabu(tcfg) => {
            let chunk_cfg = TabuConfig {
                max_iter: COMM_INTERVAL,
                ..*tcfg
            };
            tabu::run(ctx, current, &chunk_cfg, deadline, rng, offer)
        }
        LocalSearchChoice::Vns(vcfg) => {
            let chunk_cfg = vns::VnsConfig {
                max_iter: COMM_INTERVAL,
                ..*vcfg
            };
            vns::run(ctx, current, &chunk_cfg, deadline, rng, offer)
        }
        LocalSearchChoice::Ils(icfg) => {
            let chunk_cfg = ils::IlsConfig {
                max_iter: COMM_INTERVAL,
                ..*icfg
            };
            ils::run(ctx, current, &chunk_cfg, deadline, rng, offer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Wave;
    use std::collections::HashMap;
    use std::time::Duration;

    fn row(pairs: &[(u32, u32)]) -> HashMap<u32, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn sequential_run_returns_a_feasible_solution() {
        let wh = Warehouse::new(1, 2, vec![row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(
            3,
            vec![row(&[(0, 2)]), row(&[(0, 3)]), row(&[(0, 1)])],
            Wave::new(0, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);

        let cfg = CoordinatorConfig {
            num_workers: 1,
            ..CoordinatorConfig::default()
        };
        let stop = AtomicBool::new(false);
        let sol = run(&wh, &bl, &idx, &cfg, Deadline::after(Duration::from_millis(200)), &stop);
        assert!(!sol.is_infeasible_marker());
    }

    #[test]
    fn parallel_run_never_regresses_the_ledger() {
        let wh = Warehouse::new(1, 3, vec![row(&[(0, 10)]), row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(
            5,
            vec![
                row(&[(0, 2)]),
                row(&[(0, 3)]),
                row(&[(0, 1)]),
                row(&[(0, 4)]),
                row(&[(0, 2)]),
            ],
            Wave::new(0, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);

        let cfg = CoordinatorConfig {
            num_workers: 2,
            ..CoordinatorConfig::default()
        };
        let stop = AtomicBool::new(false);
        let sol = run(&wh, &bl, &idx, &cfg, Deadline::after(Duration::from_millis(300)), &stop);
        assert!(!sol.is_infeasible_marker());
        assert!(sol.objective > 0.0);
    }

    #[test]
    fn resolve_worker_count_honours_explicit_sequential_request() {
        assert_eq!(resolve_worker_count(1), 1);
        assert!(resolve_worker_count(8) >= 2);
    }
}
