//! Core data model: warehouse layout, order backlog, and the canonical
//! [`Solution`] value object.
//!
//! Everything here is a plain, owned, immutable-after-construction value.
//! There is no hidden mutation and no interior caching — that job belongs to
//! [`crate::indices::Indices`], built once and threaded through by reference.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

pub type ItemId = u32;
pub type AisleId = u32;
pub type OrderId = u32;

/// Warehouse layout: aisles, each holding bounded stock of some items.
#[derive(Clone, Debug)]
pub struct Warehouse {
    pub num_items: u32,
    pub num_aisles: u32,
    /// `stock[aisle][item] = quantity`. Absent key means zero stock.
    stock: Vec<HashMap<ItemId, u32>>,
}

impl Warehouse {
    /// Build a warehouse from per-aisle stock maps, validating ids and
    /// quantities. `InvalidInstance` on any id out of `[0, num_items)` /
    /// `[0, num_aisles)` or any non-positive quantity.
    pub fn new(
        num_items: u32,
        num_aisles: u32,
        stock: Vec<HashMap<ItemId, u32>>,
    ) -> CoreResult<Self> {
        if num_items == 0 || num_aisles == 0 {
            return Err(CoreError::InvalidInstance(
                "num_items and num_aisles must be >= 1".into(),
            ));
        }
        if stock.len() != num_aisles as usize {
            return Err(CoreError::InvalidInstance(format!(
                "expected {num_aisles} aisle stock rows, got {}",
                stock.len()
            )));
        }
        for row in &stock {
            for (&item, &qty) in row {
                if item >= num_items {
                    return Err(CoreError::InvalidInstance(format!(
                        "item id {item} out of range [0, {num_items})"
                    )));
                }
                if qty == 0 {
                    return Err(CoreError::InvalidInstance(
                        "stock quantities must be positive".into(),
                    ));
                }
            }
        }
        Ok(Self {
            num_items,
            num_aisles,
            stock,
        })
    }

    #[inline]
    pub fn stock_of(&self, aisle: AisleId, item: ItemId) -> u32 {
        self.stock
            .get(aisle as usize)
            .and_then(|row| row.get(&item))
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    pub fn aisle_row(&self, aisle: AisleId) -> &HashMap<ItemId, u32> {
        &self.stock[aisle as usize]
    }

    pub fn aisles(&self) -> impl Iterator<Item = AisleId> {
        0..self.num_aisles
    }
}

/// Lower/upper bound on total units picked in one wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wave {
    pub lb: u32,
    pub ub: u32,
}

impl Wave {
    pub fn new(lb: u32, ub: u32) -> CoreResult<Self> {
        if lb > ub {
            return Err(CoreError::InvalidInstance(format!(
                "LB ({lb}) must be <= UB ({ub})"
            )));
        }
        Ok(Self { lb, ub })
    }

    #[inline]
    pub fn within(&self, units: u32) -> bool {
        units >= self.lb && units <= self.ub
    }
}

/// Backlog of customer orders plus the wave bound they must be packed into.
#[derive(Clone, Debug)]
pub struct Backlog {
    pub num_orders: u32,
    /// `demand[order][item] = quantity`. No zero-quantity lines.
    demand: Vec<HashMap<ItemId, u32>>,
    pub wave: Wave,
}

impl Backlog {
    pub fn new(
        num_orders: u32,
        demand: Vec<HashMap<ItemId, u32>>,
        wave: Wave,
        num_items: u32,
    ) -> CoreResult<Self> {
        if num_orders == 0 {
            return Err(CoreError::InvalidInstance("num_orders must be >= 1".into()));
        }
        if demand.len() != num_orders as usize {
            return Err(CoreError::InvalidInstance(format!(
                "expected {num_orders} order demand rows, got {}",
                demand.len()
            )));
        }
        for row in &demand {
            if row.is_empty() {
                return Err(CoreError::InvalidInstance(
                    "an order must demand at least one item".into(),
                ));
            }
            for (&item, &qty) in row {
                if item >= num_items {
                    return Err(CoreError::InvalidInstance(format!(
                        "item id {item} out of range [0, {num_items})"
                    )));
                }
                if qty == 0 {
                    return Err(CoreError::InvalidInstance(
                        "order demand quantities must be positive".into(),
                    ));
                }
            }
        }
        Ok(Self {
            num_orders,
            demand,
            wave,
        })
    }

    #[inline]
    pub fn demand_of(&self, order: OrderId, item: ItemId) -> u32 {
        self.demand
            .get(order as usize)
            .and_then(|row| row.get(&item))
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    pub fn order_row(&self, order: OrderId) -> &HashMap<ItemId, u32> {
        &self.demand[order as usize]
    }

    pub fn orders(&self) -> impl Iterator<Item = OrderId> {
        0..self.num_orders
    }
}

/// Canonical, immutable solution: a wave of orders plus the aisles needed to
/// fulfil it. Always published in sorted, deduplicated form; see the
/// invariants in the module docs for [`crate::feasibility`].
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    order_set: Vec<OrderId>,
    aisle_set: Vec<AisleId>,
    pub total_units: u32,
    /// `total_units / aisle_set.len()`, or 0.0 for the infeasible marker.
    pub objective: f64,
}

impl Solution {
    /// Construct a canonical solution: sorts and dedups both sets, recomputes
    /// `objective` from `total_units` and `|aisle_set|`. Callers are
    /// responsible for having already picked a *minimal* aisle cover;
    /// construction itself does not re-derive one (see
    /// [`crate::feasibility::FeasibilityOracle::minimal_cover`]).
    pub fn canonical(mut order_set: Vec<OrderId>, mut aisle_set: Vec<AisleId>, total_units: u32) -> Self {
        order_set.sort_unstable();
        order_set.dedup();
        aisle_set.sort_unstable();
        aisle_set.dedup();
        let objective = if aisle_set.is_empty() {
            0.0
        } else {
            total_units as f64 / aisle_set.len() as f64
        };
        Self {
            order_set,
            aisle_set,
            total_units,
            objective,
        }
    }

    /// The well-formed "no feasible wave" marker: empty sets, objective 0.
    pub fn infeasible() -> Self {
        Self {
            order_set: Vec::new(),
            aisle_set: Vec::new(),
            total_units: 0,
            objective: 0.0,
        }
    }

    #[inline]
    pub fn is_infeasible_marker(&self) -> bool {
        self.order_set.is_empty() && self.aisle_set.is_empty()
    }

    #[inline]
    pub fn orders(&self) -> &[OrderId] {
        &self.order_set
    }

    #[inline]
    pub fn aisles(&self) -> &[AisleId] {
        &self.aisle_set
    }

    #[inline]
    pub fn num_aisles(&self) -> usize {
        self.aisle_set.len()
    }
}
