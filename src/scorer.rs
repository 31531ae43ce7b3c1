//! Order Scorer (§4.3): per-order efficiency metrics consulted by every
//! heuristic in the inner solver and the local-search engine.
//!
//! All quantities here are derived purely from [`Indices`] and never
//! recomputed from raw instance maps; the scorer is a thin, stateless
//! wrapper that exists so callers have one place to read "standalone
//! density" and "marginal contribution" from.

use std::collections::HashSet;

use crate::indices::Indices;
use crate::model::{AisleId, OrderId};

pub struct OrderScorer<'a> {
    indices: &'a Indices,
}

impl<'a> OrderScorer<'a> {
    pub fn new(indices: &'a Indices) -> Self {
        Self { indices }
    }

    #[inline]
    pub fn units(&self, order: OrderId) -> u32 {
        self.indices.units(order)
    }

    #[inline]
    pub fn required_aisles(&self, order: OrderId) -> &HashSet<AisleId> {
        self.indices.required_aisles_superset(order)
    }

    /// `u_o / |A_o|`, or 0.0 when the order needs no aisles (degenerate).
    pub fn standalone_density(&self, order: OrderId) -> f64 {
        let a = self.required_aisles(order).len();
        if a == 0 {
            0.0
        } else {
            self.units(order) as f64 / a as f64
        }
    }

    /// Marginal contribution of adding `order` to a solution whose aisle
    /// cover is currently `already_covered`: `u_o - lambda * |A_o \ covered|`,
    /// plus the number of new aisles that would be opened by the addition.
    pub fn contrib(
        &self,
        order: OrderId,
        lambda: f64,
        already_covered: &HashSet<AisleId>,
    ) -> (f64, usize) {
        let new_aisles = self
            .required_aisles(order)
            .iter()
            .filter(|a| !already_covered.contains(a))
            .count();
        let value = self.units(order) as f64 - lambda * new_aisles as f64;
        (value, new_aisles)
    }

    /// Density of `order` relative to an existing cover: units per *new*
    /// aisle it would require. Used by the greedy back-end's repair pass
    /// and by local-search move scoring when LB has not yet been met.
    pub fn relative_density(&self, order: OrderId, already_covered: &HashSet<AisleId>) -> f64 {
        let new_aisles = self
            .required_aisles(order)
            .iter()
            .filter(|a| !already_covered.contains(a))
            .count();
        if new_aisles == 0 {
            // Free to add: treat as maximally dense rather than dividing by zero.
            f64::INFINITY
        } else {
            self.units(order) as f64 / new_aisles as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Backlog, Warehouse, Wave};
    use std::collections::HashMap;

    fn row(pairs: &[(u32, u32)]) -> HashMap<u32, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn contrib_charges_only_new_aisles() {
        let wh = Warehouse::new(2, 2, vec![row(&[(0, 5)]), row(&[(1, 5)])]).unwrap();
        let bl = Backlog::new(
            1,
            vec![row(&[(0, 2), (1, 2)])],
            Wave::new(0, 100).unwrap(),
            2,
        )
        .unwrap();
        let idx = Indices::build(&wh, &bl);
        let scorer = OrderScorer::new(&idx);

        let covered: HashSet<AisleId> = HashSet::from([0]);
        let (value, new_aisles) = scorer.contrib(0, 1.0, &covered);
        assert_eq!(new_aisles, 1);
        assert_eq!(value, 4.0 - 1.0);
    }

    #[test]
    fn standalone_density_is_units_over_aisle_count() {
        let wh = Warehouse::new(1, 1, vec![row(&[(0, 10)])]).unwrap();
        let bl = Backlog::new(1, vec![row(&[(0, 6)])], Wave::new(0, 100).unwrap(), 1).unwrap();
        let idx = Indices::build(&wh, &bl);
        let scorer = OrderScorer::new(&idx);
        assert_eq!(scorer.standalone_density(0), 6.0);
    }
}
