//! Resolve an interact press to exactly one action.
//!
//! Branches are tried in a fixed priority order. The first one whose
//! condition holds commits; if its operation is refused the press is
//! absorbed and nothing else is tried.

use glam::Vec2;

use crate::ecs::components::{Customer, CustomerPhase, PartyId, Position};
use crate::ecs::systems::{escort, lifecycle, service};
use crate::error::Result;
use crate::restaurant::Restaurant;
use crate::tables::TableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Delivered(TableId),
    CancelledEscort(PartyId),
    TookOrder(TableId),
    ClaimedFood(TableId),
    /// Started escorting a party from the line.
    Escorting(PartyId),
    /// Dismissed this many finished guests.
    Dismissed(usize),
    Seated { party: PartyId, table: TableId },
    /// A branch matched but its operation was refused.
    Absorbed,
    Nothing,
}

pub fn dispatch(r: &mut Restaurant) -> Interaction {
    let pos = r.agent.position;
    let radius = r.level.rules.interaction_radius;

    // 1. Deliver held food to its table.
    if let Some(table) = r.agent.held.as_ref().map(|f| f.table) {
        if r.tables.in_range(table, pos, radius) {
            return absorb(service::deliver_food(r).map(Interaction::Delivered));
        }
    }

    // 2. Send the escorted party back to the line.
    if r.session.is_escorting() && pos.distance(r.level.return_zone) <= radius {
        return match escort::cancel(r) {
            Some(party) => Interaction::CancelledEscort(party),
            None => Interaction::Absorbed,
        };
    }

    // 3. Take an order.
    let session = &r.session;
    if let Some(table) = r.tables.nearest(pos, radius, |t| session.wants_to_order(t.id)) {
        return absorb(service::take_order(r, table).map(|_| Interaction::TookOrder(table)));
    }

    // 4. Pick up a plate.
    if r.agent.held.is_none() {
        if let Some(table) = r.kitchen.nearest_ready(pos, radius) {
            return absorb(service::claim_food(r, table).map(|_| Interaction::ClaimedFood(table)));
        }
    }

    // 5. Advance the nearest customer's party.
    if !r.session.is_escorting() {
        if let Some((party, phase)) = nearest_customer(r, pos, radius) {
            return advance_party(r, party, phase);
        }
    }

    // 6. Seat the escorted party.
    if let Some(party) = r.session.escorted {
        let size = escort::members_in(r, party, CustomerPhase::Following).len();
        if let Some(table) = r.tables.nearest(pos, radius, |t| t.fits(size)) {
            return absorb(escort::seat(r, table).map(|party| Interaction::Seated { party, table }));
        }
    }

    Interaction::Nothing
}

fn absorb(result: Result<Interaction>) -> Interaction {
    match result {
        Ok(done) => {
            log::debug!("interact: {done:?}");
            done
        }
        Err(e) => {
            log::debug!("interact absorbed: {e}");
            Interaction::Absorbed
        }
    }
}

/// Closest interactible customer in range. Parties are scanned in id
/// order and members by id, so equal distances go to the earliest.
fn nearest_customer(r: &Restaurant, pos: Vec2, radius: f32) -> Option<(PartyId, CustomerPhase)> {
    let mut best = None;
    let mut best_dist_sq = radius * radius;
    for (party, p) in r.roster.iter() {
        for (_, entity) in p.members() {
            let Ok(mut q) = r.world.query_one::<(&Position, &Customer)>(entity) else {
                continue;
            };
            let Some((cpos, customer)) = q.get() else {
                continue;
            };
            if !customer.phase.is_interactible() {
                continue;
            }
            let dist_sq = cpos.0.distance_squared(pos);
            if dist_sq > best_dist_sq {
                continue;
            }
            if best.is_none() || dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best = Some((party, customer.phase));
            }
        }
    }
    best
}

/// Move the party one step on, as appropriate for the customer picked.
fn advance_party(r: &mut Restaurant, party: PartyId, phase: CustomerPhase) -> Interaction {
    match phase {
        CustomerPhase::Waiting | CustomerPhase::InLine => {
            absorb(escort::start(r, party).map(|_| Interaction::Escorting(party)))
        }
        CustomerPhase::Ordering => {
            let table = escort::members_in(r, party, CustomerPhase::Ordering)
                .first()
                .and_then(|&(_, e)| r.world.get::<&Customer>(e).ok().and_then(|c| c.table()));
            match table {
                Some(table) => {
                    absorb(service::take_order(r, table).map(|_| Interaction::TookOrder(table)))
                }
                None => Interaction::Absorbed,
            }
        }
        CustomerPhase::Finished => {
            let finished = escort::members_in(r, party, CustomerPhase::Finished);
            let count = finished
                .iter()
                .filter(|&&(_, e)| lifecycle::dismiss(r, e).is_some())
                .count();
            log::debug!("interact: dismissed {count} of party {party}");
            Interaction::Dismissed(count)
        }
        _ => Interaction::Nothing,
    }
}
