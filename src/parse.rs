//! Instance file parsing (§6): whitespace-separated tokens, line-significant.
//!
//! ```text
//! N_O N_I N_A
//! <N_O order lines>   k  item_0 qty_0  item_1 qty_1  ...  item_{k-1} qty_{k-1}
//! <N_A aisle lines>   (same shape)
//! LB UB
//! ```

use std::collections::HashMap;
use std::str::SplitWhitespace;

use crate::error::{CoreError, CoreResult};
use crate::model::{Backlog, ItemId, Warehouse, Wave};

pub struct Instance {
    pub warehouse: Warehouse,
    pub backlog: Backlog,
}

pub fn parse_instance(text: &str) -> CoreResult<Instance> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| CoreError::InvalidInstance("empty instance file".into()))?;
    let mut header_tokens = header.split_whitespace();
    let num_orders = next_u32(&mut header_tokens, "N_O")?;
    let num_items = next_u32(&mut header_tokens, "N_I")?;
    let num_aisles = next_u32(&mut header_tokens, "N_A")?;

    let mut demand = Vec::with_capacity(num_orders as usize);
    for i in 0..num_orders {
        let line = lines
            .next()
            .ok_or_else(|| CoreError::InvalidInstance(format!("missing order line {i}")))?;
        demand.push(parse_row(line)?);
    }

    let mut stock = Vec::with_capacity(num_aisles as usize);
    for i in 0..num_aisles {
        let line = lines
            .next()
            .ok_or_else(|| CoreError::InvalidInstance(format!("missing aisle line {i}")))?;
        stock.push(parse_row(line)?);
    }

    let bounds_line = lines
        .next()
        .ok_or_else(|| CoreError::InvalidInstance("missing LB UB line".into()))?;
    let mut bounds_tokens = bounds_line.split_whitespace();
    let lb = next_u32(&mut bounds_tokens, "LB")?;
    let ub = next_u32(&mut bounds_tokens, "UB")?;

    let warehouse = Warehouse::new(num_items, num_aisles, stock)?;
    let wave = Wave::new(lb, ub)?;
    let backlog = Backlog::new(num_orders, demand, wave, num_items)?;

    tracing::debug!(
        num_orders,
        num_items,
        num_aisles,
        lb,
        ub,
        "parsed instance"
    );

    Ok(Instance { warehouse, backlog })
}

fn parse_row(line: &str) -> CoreResult<HashMap<ItemId, u32>> {
    let mut tokens = line.split_whitespace();
    let k = next_u32(&mut tokens, "line item count")? as usize;
    let mut row = HashMap::with_capacity(k);
    for _ in 0..k {
        let item = next_u32(&mut tokens, "item id")?;
        let qty = next_u32(&mut tokens, "item quantity")?;
        row.insert(item, qty);
    }
    Ok(row)
}

fn next_u32(tokens: &mut SplitWhitespace, field: &str) -> CoreResult<u32> {
    tokens
        .next()
        .ok_or_else(|| CoreError::InvalidInstance(format!("missing {field}")))?
        .parse::<u32>()
        .map_err(|_| CoreError::InvalidInstance(format!("{field} is not a non-negative integer")))
}
