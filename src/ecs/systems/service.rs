//! Table service: taking orders, carrying plates, serving them.

use crate::ecs::components::{Customer, CustomerId, CustomerPhase};
use crate::error::{Result, ServiceError};
use crate::restaurant::Restaurant;
use crate::tables::TableId;

/// Occupants of `table` currently in `phase`.
fn seated_in(
    r: &Restaurant,
    table: TableId,
    phase: CustomerPhase,
) -> Vec<(CustomerId, hecs::Entity)> {
    let Some(t) = r.tables.get(table) else {
        return Vec::new();
    };
    let mut out: Vec<_> = t
        .occupants()
        .filter_map(|e| {
            let mut q = r.world.query_one::<(&CustomerId, &Customer)>(e).ok()?;
            let (id, c) = q.get()?;
            (c.phase == phase).then_some((*id, e))
        })
        .collect();
    out.sort_by_key(|&(id, _)| id);
    out
}

/// Take the order at `table`: one kitchen order for the whole table, and
/// every ordering guest starts waiting for food.
pub fn take_order(r: &mut Restaurant, table: TableId) -> Result<u64> {
    let party = r
        .tables
        .get(table)
        .ok_or(ServiceError::TableNotFound(table))?
        .locked_by()
        .ok_or(ServiceError::NobodyWaiting(table))?;
    let ordering = seated_in(r, table, CustomerPhase::Ordering);
    if ordering.is_empty() {
        return Err(ServiceError::NobodyWaiting(table));
    }

    let members: Vec<CustomerId> = ordering.iter().map(|&(id, _)| id).collect();
    let size = members.len();
    let order = r
        .kitchen
        .submit(table, party, members, &r.level.rules, &mut r.session)?;

    let patience = r.level.rules.food_patience(size);
    for &(_, entity) in &ordering {
        if let Ok(customer) = r.world.query_one_mut::<&mut Customer>(entity) {
            customer.enter(CustomerPhase::WaitingFood, patience);
        }
    }
    log::debug!("took order {order} at table {table} ({size} guests, {patience:.0}s patience)");
    Ok(order)
}

/// Pick up the plate for `table` from the counter.
pub fn claim_food(r: &mut Restaurant, table: TableId) -> Result<()> {
    if r.agent.held.is_some() {
        return Err(ServiceError::HandsFull);
    }
    let item = r.kitchen.claim(table, &mut r.session)?;
    log::debug!("picked up order {} for table {table}", item.order);
    r.agent.held = Some(item);
    Ok(())
}

/// Serve the held plate. Everyone at its table waiting for food starts
/// eating.
pub fn deliver_food(r: &mut Restaurant) -> Result<TableId> {
    let table = r
        .agent
        .held
        .as_ref()
        .map(|f| f.table)
        .ok_or(ServiceError::EmptyHands)?;
    let waiting = seated_in(r, table, CustomerPhase::WaitingFood);
    if waiting.is_empty() {
        return Err(ServiceError::NobodyWaiting(table));
    }

    if let Some(item) = r.agent.held.take() {
        r.kitchen.deliver(&item);
    }
    for &(_, entity) in &waiting {
        if let Ok(customer) = r.world.query_one_mut::<&mut Customer>(entity) {
            customer.enter(CustomerPhase::Eating, 0.0);
            customer.eaten_stage = 0;
        }
    }
    r.session.clear_table(table);
    log::debug!("served table {table} ({} guests)", waiting.len());
    Ok(table)
}
