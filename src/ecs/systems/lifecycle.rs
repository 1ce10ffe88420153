//! The single path every customer leaves the restaurant through.

use crate::audio::AudioCue;
use crate::ecs::components::{Customer, CustomerId, CustomerPhase, PartyId};
use crate::restaurant::Restaurant;
use crate::tables::TableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Left the line before being seated.
    GaveUp,
    /// Walked out while seated.
    Abandoned,
    /// Served and sent home.
    Dismissed,
}

/// Credit a served customer and send them home.
pub fn dismiss(r: &mut Restaurant, entity: hecs::Entity) -> Option<i64> {
    let customer = r.customer(entity)?;
    let score = r.scoring.dismiss(&customer, &mut r.session);
    log::debug!(
        "dismissed {entity:?}: {score} points ({} penalty)",
        customer.penalty
    );
    exit(r, entity, ExitReason::Dismissed);
    Some(score)
}

/// Remove a customer from every registry, release what it held and
/// despawn it. Stale entities are ignored.
pub fn exit(r: &mut Restaurant, entity: hecs::Entity, reason: ExitReason) {
    let (id, party, customer) = {
        let Ok(mut q) = r
            .world
            .query_one::<(&CustomerId, &PartyId, &Customer)>(entity)
        else {
            return;
        };
        let Some((id, party, customer)) = q.get() else {
            return;
        };
        (*id, *party, customer.clone())
    };

    let was_leader = r.roster.is_leader(party, id);
    match reason {
        ExitReason::GaveUp => r.scoring.give_up(),
        ExitReason::Abandoned => {
            r.scoring.abandon(&mut r.session);
        }
        ExitReason::Dismissed => {}
    }

    r.queue.forget(entity, &mut r.world);
    r.roster.remove(party, id);
    if r.roster.get(party).is_none() {
        r.queue.forget_party(party);
        if reason == ExitReason::Abandoned {
            r.cues.push(AudioCue::PartyQuit);
        }
    }

    if let Some(seat) = customer.seat {
        r.tables.release_seat(seat.table, seat.slot);
        let still_seated = r
            .tables
            .get(seat.table)
            .is_some_and(|t| t.occupied_count() > 0);
        // Whoever leads the party when the last member gets up frees the table.
        if was_leader && !still_seated {
            release_table(r, seat.table, party, reason);
        }
    }

    if let Err(e) = r.world.despawn(entity) {
        log::warn!("exit: despawn {entity:?} failed: {e}");
    }

    if r.session.escorted == Some(party) && !has_followers(r, party) {
        r.session.escorted = None;
    }

    log::debug!(
        "{id} of party {party} left ({reason:?}) from {}",
        customer.phase.label()
    );
}

fn release_table(r: &mut Restaurant, table: TableId, party: PartyId, reason: ExitReason) {
    if !r.tables.unlock(table, party) {
        return;
    }
    let had_order = r.kitchen.discard(table);
    if had_order && reason == ExitReason::Abandoned {
        r.cues.push(AudioCue::OrderFailed);
    }
    r.session.clear_table(table);
    if r.agent.held.as_ref().is_some_and(|f| f.table == table) {
        log::debug!("dropping plate for table {table}");
        r.agent.held = None;
    }
}

fn has_followers(r: &Restaurant, party: PartyId) -> bool {
    r.roster.entities(party).into_iter().any(|e| {
        r.world
            .get::<&Customer>(e)
            .is_ok_and(|c| c.phase == CustomerPhase::Following)
    })
}
