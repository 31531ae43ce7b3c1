//! Derived, read-only lookup tables over an instance (§4.1).
//!
//! Built once in a single pass over the warehouse and a single pass over the
//! backlog. Every other component consults `Indices` instead of re-scanning
//! the raw `Warehouse`/`Backlog` maps in a hot loop. This is a deliberate
//! departure from the source's pattern of caching lazily inside the input
//! structs themselves (see `DESIGN.md`): indices are computed eagerly and
//! owned separately, so there is no hidden mutation behind a `const`
//! reference.

use std::collections::{HashMap, HashSet};

use crate::model::{AisleId, Backlog, ItemId, OrderId, Warehouse};

/// One `(aisle, stock_here)` pair for an item.
pub type AisleStock = (AisleId, u32);

#[derive(Debug)]
pub struct Indices {
    aisles_of: Vec<Vec<AisleStock>>,
    total_stock: Vec<u32>,
    units: Vec<u32>,
    required_aisles_superset: Vec<HashSet<AisleId>>,
}

impl Indices {
    /// Build all derived tables from a validated warehouse and backlog.
    /// Construction itself does not re-validate ids; callers are expected to
    /// have gone through [`Warehouse::new`] / [`Backlog::new`] already.
    pub fn build(warehouse: &Warehouse, backlog: &Backlog) -> Self {
        let mut aisles_of: Vec<Vec<AisleStock>> = vec![Vec::new(); warehouse.num_items as usize];
        let mut total_stock = vec![0u32; warehouse.num_items as usize];

        for aisle in warehouse.aisles() {
            for (&item, &qty) in warehouse.aisle_row(aisle) {
                aisles_of[item as usize].push((aisle, qty));
                total_stock[item as usize] += qty;
            }
        }
        for row in &mut aisles_of {
            row.sort_unstable_by_key(|&(a, _)| a);
        }

        let mut units = vec![0u32; backlog.num_orders as usize];
        let mut required_aisles_superset: Vec<HashSet<AisleId>> =
            vec![HashSet::new(); backlog.num_orders as usize];

        for order in backlog.orders() {
            let row = backlog.order_row(order);
            let mut u = 0u32;
            let mut aisles: HashSet<AisleId> = HashSet::new();
            for (&item, &qty) in row {
                u += qty;
                for &(aisle, _) in &aisles_of[item as usize] {
                    aisles.insert(aisle);
                }
            }
            units[order as usize] = u;
            required_aisles_superset[order as usize] = aisles;
        }

        Self {
            aisles_of,
            total_stock,
            units,
            required_aisles_superset,
        }
    }

    #[inline]
    pub fn aisles_of(&self, item: ItemId) -> &[AisleStock] {
        &self.aisles_of[item as usize]
    }

    #[inline]
    pub fn total_stock(&self, item: ItemId) -> u32 {
        self.total_stock[item as usize]
    }

    #[inline]
    pub fn units(&self, order: OrderId) -> u32 {
        self.units[order as usize]
    }

    #[inline]
    pub fn required_aisles_superset(&self, order: OrderId) -> &HashSet<AisleId> {
        &self.required_aisles_superset[order as usize]
    }

    /// Union of the required-aisle supersets of a set of orders. This is an
    /// upper bound on the aisles actually needed — the true requirement
    /// depends on which aisle covers which item, resolved by
    /// [`crate::feasibility::FeasibilityOracle::minimal_cover`].
    pub fn combined_aisle_superset(&self, orders: &[OrderId]) -> HashSet<AisleId> {
        let mut out = HashSet::new();
        for &o in orders {
            out.extend(self.required_aisles_superset(o).iter().copied());
        }
        out
    }

    /// Aggregate demand per item across a set of orders.
    pub fn aggregate_demand(&self, backlog: &Backlog, orders: &[OrderId]) -> HashMap<ItemId, u32> {
        let mut agg: HashMap<ItemId, u32> = HashMap::new();
        for &o in orders {
            for (&item, &qty) in backlog.order_row(o) {
                *agg.entry(item).or_insert(0) += qty;
            }
        }
        agg
    }

    pub fn total_units_of(&self, orders: &[OrderId]) -> u32 {
        orders.iter().map(|&o| self.units(o)).sum()
    }
}
