//! Escorting a party from the line to a table.

use crate::ecs::components::{
    Customer, CustomerId, CustomerPhase, Facing, PartyId, Position, PrevPosition, SeatRef,
    TrailFollow,
};
use crate::error::{Result, ServiceError};
use crate::restaurant::Restaurant;
use crate::tables::TableId;

/// Horizontal movement below this keeps the current facing.
const FACING_DEADZONE: f32 = 0.001;

/// Store previous positions for render interpolation. Runs before anything
/// moves this tick.
pub fn begin_tick(world: &mut hecs::World) {
    for (_, (pos, prev)) in world.query_mut::<(&Position, &mut PrevPosition)>() {
        prev.0 = pos.0;
    }
}

/// Record the agent on the trail, pull followers along it and update
/// facing for everyone who moved.
pub fn update(r: &mut Restaurant) {
    r.trail.record(r.agent.position);
    let lerp = r.level.rules.escort.lerp;

    for (_, (customer, pos)) in r.world.query_mut::<(&Customer, &mut Position)>() {
        let Some(follow) = customer.trail else {
            continue;
        };
        if let Some(target) = r.trail.sample(follow.index) {
            pos.0 = pos.0.lerp(target, lerp);
        }
    }

    for (_, (pos, prev, facing)) in r
        .world
        .query_mut::<(&Position, &PrevPosition, &mut Facing)>()
    {
        let dx = pos.0.x - prev.0.x;
        if dx > FACING_DEADZONE {
            *facing = Facing::Right;
        } else if dx < -FACING_DEADZONE {
            *facing = Facing::Left;
        }
    }
}

/// Members of `party` in `phase`, by id.
pub fn members_in(
    r: &Restaurant,
    party: PartyId,
    phase: CustomerPhase,
) -> Vec<(CustomerId, hecs::Entity)> {
    let Some(p) = r.roster.get(party) else {
        return Vec::new();
    };
    p.members()
        .filter(|&(_, e)| {
            r.world
                .get::<&Customer>(e)
                .is_ok_and(|c| c.phase == phase)
        })
        .collect()
}

/// Pull `party` out of the line and have it follow the agent.
pub fn start(r: &mut Restaurant, party: PartyId) -> Result<usize> {
    if let Some(current) = r.session.escorted {
        return Err(ServiceError::AlreadyEscorting(current));
    }
    let queued: Vec<hecs::Entity> = r
        .roster
        .get(party)
        .ok_or(ServiceError::PartyNotFound(party))?
        .members()
        .filter(|&(_, e)| r.world.get::<&Customer>(e).is_ok_and(|c| c.phase.is_queued()))
        .map(|(_, e)| e)
        .collect();
    if queued.is_empty() {
        return Err(ServiceError::PartyNotFound(party));
    }

    r.queue.take_party(party, &mut r.world);

    let mut followers = Vec::with_capacity(queued.len());
    for (n, &entity) in queued.iter().enumerate() {
        let index = r.trail.follower_index(n);
        if let Ok((customer, pos)) = r
            .world
            .query_one_mut::<(&mut Customer, &Position)>(entity)
        {
            // Waiting patience is frozen, not reset, while following.
            customer.phase = CustomerPhase::Following;
            customer.trail = Some(TrailFollow { index });
            followers.push(pos.0);
        }
    }
    r.trail.seed(r.agent.position, &followers);
    r.session.escorted = Some(party);
    log::debug!("escorting party {party} ({} guests)", followers.len());
    Ok(followers.len())
}

/// Send the escorted party back to its place in line.
pub fn cancel(r: &mut Restaurant) -> Option<PartyId> {
    let party = r.session.escorted.take()?;
    let following = members_in(r, party, CustomerPhase::Following);
    for &(_, entity) in &following {
        if let Ok(customer) = r.world.query_one_mut::<&mut Customer>(entity) {
            customer.phase = CustomerPhase::InLine;
            customer.trail = None;
        }
    }
    r.queue.requeue(party, &following, &mut r.world);
    log::debug!("party {party} back in line");
    Some(party)
}

/// Seat the escorted party at `table`. Nothing changes unless every
/// follower gets a seat.
pub fn seat(r: &mut Restaurant, table: TableId) -> Result<PartyId> {
    let party = r.session.escorted.ok_or(ServiceError::NotEscorting)?;
    let following: Vec<hecs::Entity> = members_in(r, party, CustomerPhase::Following)
        .into_iter()
        .map(|(_, e)| e)
        .collect();
    if following.is_empty() {
        return Err(ServiceError::PartyNotFound(party));
    }

    let assignments = r.tables.seat(table, party, &following)?;
    for a in assignments {
        if let Ok((customer, pos)) = r
            .world
            .query_one_mut::<(&mut Customer, &mut Position)>(a.entity)
        {
            customer.enter(CustomerPhase::Seated, 0.0);
            customer.seat = Some(SeatRef {
                table,
                slot: a.slot,
            });
            customer.trail = None;
            pos.0 = a.pos;
        }
    }
    r.session.escorted = None;
    log::debug!("party {party} seated at table {table}");
    Ok(party)
}
