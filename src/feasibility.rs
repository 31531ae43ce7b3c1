//! Feasibility Oracle (§4.2): bound checks, stock feasibility, and the
//! deterministic greedy minimal-cover policy.
//!
//! The invariants a published [`crate::model::Solution`] must satisfy:
//!
//! 1. orders pairwise distinct, each a valid id;
//! 2. aisles pairwise distinct, each a valid id;
//! 3. `LB <= total_units <= UB`;
//! 4. aggregate demand per item is covered by the chosen aisles' stock;
//! 5. the aisle set is the minimal cover under this module's tie-break
//!    policy (re-running `minimal_cover` on the same order set must
//!    reproduce the same aisle set — see the idempotence test below);
//! 6. `objective == total_units / |aisle_set|`.

use std::collections::{HashMap, HashSet};

use crate::indices::Indices;
use crate::model::{AisleId, Backlog, ItemId, OrderId, Warehouse};

pub struct FeasibilityOracle<'a> {
    warehouse: &'a Warehouse,
    backlog: &'a Backlog,
    indices: &'a Indices,
}

impl<'a> FeasibilityOracle<'a> {
    pub fn new(warehouse: &'a Warehouse, backlog: &'a Backlog, indices: &'a Indices) -> Self {
        Self {
            warehouse,
            backlog,
            indices,
        }
    }

    #[inline]
    pub fn within_bounds(&self, total_units: u32) -> bool {
        self.backlog.wave.within(total_units)
    }

    /// True iff, for every item referenced by `order_set`, the aggregate
    /// demand does not exceed the item's total stock across the whole
    /// warehouse. This is a necessary but not sufficient condition for the
    /// *chosen aisle subset* to cover the orders — `minimal_cover` performs
    /// the real, aisle-by-aisle check.
    pub fn stock_feasible(&self, order_set: &[OrderId]) -> bool {
        let agg = self.indices.aggregate_demand(self.backlog, order_set);
        agg.iter()
            .all(|(&item, &qty)| qty <= self.indices.total_stock(item))
    }

    /// Greedy max-coverage minimal cover (§4.2).
    ///
    /// Repeatedly picks the aisle covering the largest number of still-
    /// uncovered *distinct items demanded*, tie-breaking on larger
    /// sum-of-stock-for-uncovered-items, then on smaller aisle id. Returns
    /// an empty set if some remaining item cannot be covered by any aisle
    /// (the order set is stock-infeasible).
    pub fn minimal_cover(&self, order_set: &[OrderId]) -> Vec<AisleId> {
        let demand = self.indices.aggregate_demand(self.backlog, order_set);
        if demand.is_empty() {
            return Vec::new();
        }

        // remaining[item] = units of `item` still uncovered by chosen aisles.
        let mut remaining: HashMap<ItemId, u32> = demand.clone();
        let mut chosen: Vec<AisleId> = Vec::new();
        let mut used: HashSet<AisleId> = HashSet::new();

        loop {
            remaining.retain(|_, &mut qty| qty > 0);
            if remaining.is_empty() {
                break;
            }

            let mut best: Option<(AisleId, usize, u32)> = None; // (aisle, covered_items, covered_stock)
            for aisle in self.warehouse.aisles() {
                if used.contains(&aisle) {
                    continue;
                }
                let row = self.warehouse.aisle_row(aisle);
                let mut covered_items = 0usize;
                let mut covered_stock: u32 = 0;
                for (&item, &need) in &remaining {
                    if let Some(&stock_here) = row.get(&item) {
                        if stock_here > 0 {
                            covered_items += 1;
                            covered_stock += stock_here.min(need);
                        }
                    }
                }
                if covered_items == 0 {
                    continue;
                }
                let candidate = (aisle, covered_items, covered_stock);
                best = Some(match best {
                    None => candidate,
                    Some(cur) => pick_better_aisle(cur, candidate),
                });
            }

            let Some((aisle, _, _)) = best else {
                // No remaining, unused aisle can cover what's left: stock-infeasible.
                return Vec::new();
            };

            let row = self.warehouse.aisle_row(aisle);
            for (item, need) in remaining.iter_mut() {
                if let Some(&stock_here) = row.get(item) {
                    *need = need.saturating_sub(stock_here);
                }
            }
            used.insert(aisle);
            chosen.push(aisle);
        }

        chosen.sort_unstable();
        chosen
    }
}

/// Deterministic tie-break: more covered items wins; then more covered
/// stock; then the smaller aisle id.
fn pick_better_aisle(
    cur: (AisleId, usize, u32),
    cand: (AisleId, usize, u32),
) -> (AisleId, usize, u32) {
    let (cur_a, cur_items, cur_stock) = cur;
    let (cand_a, cand_items, cand_stock) = cand;
    if cand_items != cur_items {
        return if cand_items > cur_items { cand } else { cur };
    }
    if cand_stock != cur_stock {
        return if cand_stock > cur_stock { cand } else { cur };
    }
    if cand_a < cur_a {
        cand
    } else {
        cur
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Wave;
    use std::collections::HashMap as Map;

    fn row(pairs: &[(ItemId, u32)]) -> Map<ItemId, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn scenario_a_single_order_single_aisle() {
        let wh = Warehouse::new(2, 1, vec![row(&[(0, 3), (1, 2)])]).unwrap();
        let bl = Backlog::new(1, vec![row(&[(0, 3), (1, 2)])], Wave::new(1, 100).unwrap(), 2).unwrap();
        let idx = Indices::build(&wh, &bl);
        let oracle = FeasibilityOracle::new(&wh, &bl, &idx);

        assert!(oracle.stock_feasible(&[0]));
        assert_eq!(oracle.minimal_cover(&[0]), vec![0]);
    }

    #[test]
    fn scenario_e_stock_infeasible_on_combination() {
        let wh = Warehouse::new(1, 1, vec![row(&[(0, 8)])]).unwrap();
        let bl = Backlog::new(
            2,
            vec![row(&[(0, 6)]), row(&[(0, 6)])],
            Wave::new(12, 100).unwrap(),
            1,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let oracle = FeasibilityOracle::new(&wh, &bl, &idx);

        assert!(!oracle.stock_feasible(&[0, 1]));
        assert!(oracle.minimal_cover(&[0, 1]).is_empty());
    }

    #[test]
    fn minimal_cover_is_idempotent() {
        let wh = Warehouse::new(2, 2, vec![row(&[(0, 5)]), row(&[(1, 5)])]).unwrap();
        let bl = Backlog::new(
            2,
            vec![row(&[(0, 5)]), row(&[(1, 5)])],
            Wave::new(0, 100).unwrap(),
            2,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let oracle = FeasibilityOracle::new(&wh, &bl, &idx);

        let cover = oracle.minimal_cover(&[0, 1]);
        let cover_again = oracle.minimal_cover(&[0, 1]);
        assert_eq!(cover, cover_again);
        assert_eq!(cover, vec![0, 1]);
    }

    #[test]
    fn tie_break_prefers_smaller_aisle_id() {
        // Two aisles both fully cover the only item; the smaller id wins.
        let wh = Warehouse::new(1, 2, vec![row(&[(0, 10)]), row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(1, vec![row(&[(0, 4)])], Wave::new(0, 100).unwrap(), 1).unwrap();
        let idx = Indices::build(&wh, &bl);
        let oracle = FeasibilityOracle::new(&wh, &bl, &idx);

        assert_eq!(oracle.minimal_cover(&[0]), vec![0]);
    }
}
