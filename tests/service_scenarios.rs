use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use bistro::audio::AudioCue;
use bistro::config::{ConfigError, PartySizeDist};
use bistro::ecs::components::{Customer, CustomerId, CustomerPhase, Latch, PartyId, Position};
use bistro::ecs::systems::interact::Interaction;
use bistro::ecs::systems::lifecycle::{self, ExitReason};
use bistro::party::Roster;
use bistro::tables::TableId;
use bistro::{LevelConfig, Restaurant};
use glam::Vec2;
use proptest::prelude::*;

fn level() -> LevelConfig {
    let mut level = LevelConfig::default();
    level.countdown = 10_000;
    let rules = &mut level.rules;
    rules.reading_time = [15.0, 15.0];
    rules.eating_time = [12.0, 12.0];
    rules.spawn.min_interval = 5_000.0;
    rules.spawn.max_interval = 5_000.0;
    rules.spawn.rush = None;
    level
}

fn restaurant() -> Restaurant {
    let mut r = Restaurant::new(level(), 7).unwrap();
    r.start();
    r
}

fn spawn(r: &mut Restaurant, size: usize) -> PartyId {
    r.queue
        .spawn_party(size, &mut r.world, &mut r.roster, &r.level.rules)
}

fn tick(r: &mut Restaurant, n: usize) {
    for _ in 0..n {
        r.advance(1.0);
    }
}

fn pos_of(r: &Restaurant, e: hecs::Entity) -> Vec2 {
    r.world.get::<&Position>(e).unwrap().0
}

fn table_pos(r: &Restaurant, table: TableId) -> Vec2 {
    r.tables.get(table).unwrap().position
}

fn phases(r: &Restaurant, party: PartyId) -> Vec<CustomerPhase> {
    r.roster
        .entities(party)
        .into_iter()
        .map(|e| r.phase(e).unwrap())
        .collect()
}

fn all_in(r: &Restaurant, party: PartyId, phase: CustomerPhase) -> bool {
    let phases = phases(r, party);
    !phases.is_empty() && phases.iter().all(|&p| p == phase)
}

fn escort_and_seat(r: &mut Restaurant, party: PartyId, table: TableId) {
    let (_, leader) = r.roster.leader(party).unwrap();
    r.move_agent(pos_of(r, leader));
    assert_eq!(r.on_interact(), Interaction::Escorting(party));
    r.move_agent(table_pos(r, table));
    assert_eq!(r.on_interact(), Interaction::Seated { party, table });
}

/// Seat `party` at `table` and run until it is ready to order.
fn seat_until_ordering(r: &mut Restaurant, party: PartyId, table: TableId) {
    escort_and_seat(r, party, table);
    tick(r, 16);
    assert!(all_in(r, party, CustomerPhase::Ordering));
}

/// Carry the ready plate for `table` from the counter to the table.
fn fetch_and_serve(r: &mut Restaurant, table: TableId) {
    let (counter, _) = r.kitchen.staged().next().unwrap();
    r.move_agent(counter);
    assert_eq!(r.on_interact(), Interaction::ClaimedFood(table));
    r.move_agent(table_pos(r, table));
    assert_eq!(r.on_interact(), Interaction::Delivered(table));
}

#[test]
fn leader_timer_moves_whole_party_to_ordering() {
    let mut r = restaurant();
    let party = spawn(&mut r, 3);
    escort_and_seat(&mut r, party, 2);
    assert!(all_in(&r, party, CustomerPhase::Seated));

    tick(&mut r, 1);
    assert!(all_in(&r, party, CustomerPhase::ReadingMenu));
    tick(&mut r, 14);
    assert!(all_in(&r, party, CustomerPhase::ReadingMenu));
    assert!(!r.session.wants_to_order(2));

    tick(&mut r, 1);
    assert!(all_in(&r, party, CustomerPhase::Ordering));
    assert!(r.session.wants_to_order(2));
    assert!(r.drain_cues().contains(&AudioCue::OrderBell));
}

#[test]
fn full_service_round_trip() {
    let mut r = restaurant();
    let party = spawn(&mut r, 3);
    seat_until_ordering(&mut r, party, 2);

    r.move_agent(table_pos(&r, 2));
    assert_eq!(r.on_interact(), Interaction::TookOrder(2));
    assert!(all_in(&r, party, CustomerPhase::WaitingFood));
    assert!(r.session.is_in_kitchen(2));
    assert!(!r.session.wants_to_order(2));

    // 2 + 2 * 3 seconds of cooking.
    tick(&mut r, 7);
    assert!(!r.session.is_ready(2));
    tick(&mut r, 1);
    assert!(r.session.is_ready(2));
    assert!(r.drain_cues().contains(&AudioCue::OrderComplete));

    fetch_and_serve(&mut r, 2);
    assert!(all_in(&r, party, CustomerPhase::Eating));
    assert!(r.agent.held.is_none());

    tick(&mut r, 4);
    let stages: Vec<u8> = r
        .roster
        .entities(party)
        .into_iter()
        .map(|e| r.customer(e).unwrap().eaten_stage)
        .collect();
    assert_eq!(stages, vec![1, 1, 1]);

    tick(&mut r, 8);
    assert!(all_in(&r, party, CustomerPhase::Finished));

    let (_, leader) = r.roster.leader(party).unwrap();
    r.move_agent(pos_of(&r, leader));
    assert_eq!(r.on_interact(), Interaction::Dismissed(3));
    assert_eq!(r.session.score, 3 * 150);
    assert_eq!(r.session.customers_served, 3);
    assert_eq!(r.customer_count(), 0);
    let table = r.tables.get(2).unwrap();
    assert_eq!(table.locked_by(), None);
    assert_eq!(table.free_seat_count(), 4);
}

#[test]
fn angry_latch_fires_once() {
    let mut r = restaurant();
    let party = spawn(&mut r, 1);
    seat_until_ordering(&mut r, party, 1);
    let (_, guest) = r.roster.leader(party).unwrap();

    tick(&mut r, 19);
    let c = r.customer(guest).unwrap();
    assert!(c.latches.has(Latch::OrderingImpatient));
    assert!(!c.latches.has(Latch::OrderingAngry));

    tick(&mut r, 1);
    assert!(r.customer(guest).unwrap().latches.has(Latch::OrderingAngry));

    tick(&mut r, 5);
    let c = r.customer(guest).unwrap();
    assert_eq!(c.latches.count(), 2);
    assert_eq!(c.penalty, 20);
}

#[test]
fn latch_voids_perfect_bonus_for_single_guest() {
    let mut r = restaurant();
    let party = spawn(&mut r, 1);
    seat_until_ordering(&mut r, party, 1);
    let (_, guest) = r.roster.leader(party).unwrap();

    // Ten seconds in Ordering: two thirds of the patience left.
    tick(&mut r, 10);
    r.move_agent(table_pos(&r, 1));
    assert_eq!(r.on_interact(), Interaction::TookOrder(1));
    // Food patience for one guest is base + buffer.
    assert_eq!(r.customer(guest).unwrap().ceiling, 40.0);

    tick(&mut r, 4);
    fetch_and_serve(&mut r, 1);
    tick(&mut r, 12);
    assert_eq!(r.phase(guest), Some(CustomerPhase::Finished));

    r.move_agent(pos_of(&r, guest));
    assert_eq!(r.on_interact(), Interaction::Dismissed(1));
    assert_eq!(r.session.score, 90);
    assert_eq!(r.scoring.ledger.perfect, 0);
}

#[test]
fn cancelled_escort_rejoins_line_in_place() {
    let mut r = restaurant();
    let a = spawn(&mut r, 2);
    let b = spawn(&mut r, 4);
    let c = spawn(&mut r, 1);
    let (_, c_guest) = r.roster.leader(c).unwrap();

    let (_, b_leader) = r.roster.leader(b).unwrap();
    r.move_agent(pos_of(&r, b_leader));
    assert_eq!(r.on_interact(), Interaction::Escorting(b));
    assert_eq!(r.queue.line_len(), 3);
    assert_eq!(pos_of(&r, c_guest), r.queue.slot_pos(2));

    r.move_agent(r.level.return_zone);
    assert_eq!(r.on_interact(), Interaction::CancelledEscort(b));
    assert!(!r.session.is_escorting());
    assert!(all_in(&r, b, CustomerPhase::InLine));

    let line: Vec<_> = r.queue.line().collect();
    let unique: HashSet<_> = line.iter().copied().collect();
    assert_eq!(line.len(), 7);
    assert_eq!(unique.len(), 7);
    assert_eq!(r.queue.parties().collect::<Vec<_>>(), vec![a, b, c]);
    for (slot, &e) in line.iter().enumerate() {
        assert_eq!(pos_of(&r, e), r.queue.slot_pos(slot));
    }
}

#[test]
fn queued_customer_cannot_be_picked_up_mid_escort() {
    let mut r = restaurant();
    let first = spawn(&mut r, 1);
    let second = spawn(&mut r, 1);
    let (_, first_guest) = r.roster.leader(first).unwrap();
    let (_, second_guest) = r.roster.leader(second).unwrap();

    r.move_agent(pos_of(&r, first_guest));
    assert_eq!(r.on_interact(), Interaction::Escorting(first));
    r.move_agent(pos_of(&r, second_guest) + Vec2::new(0.0, -1.0));
    assert_eq!(r.on_interact(), Interaction::Nothing);
    assert_eq!(r.session.escorted, Some(first));
    assert_eq!(r.phase(second_guest), Some(CustomerPhase::Waiting));
}

#[test]
fn walkout_frees_table_for_next_party() {
    let mut r = restaurant();
    let party = spawn(&mut r, 2);
    seat_until_ordering(&mut r, party, 1);
    r.drain_cues();

    tick(&mut r, 29);
    assert!(all_in(&r, party, CustomerPhase::Ordering));
    tick(&mut r, 1);

    assert_eq!(r.customer_count(), 0);
    assert!(r.roster.get(party).is_none());
    assert_eq!(r.session.score, -100);
    assert!(!r.session.wants_to_order(1));
    let table = r.tables.get(1).unwrap();
    assert_eq!(table.locked_by(), None);
    assert_eq!(table.free_seat_count(), 2);
    let quits = r
        .drain_cues()
        .into_iter()
        .filter(|&c| c == AudioCue::PartyQuit)
        .count();
    assert_eq!(quits, 1);

    let next = spawn(&mut r, 2);
    escort_and_seat(&mut r, next, 1);
    assert_eq!(r.tables.get(1).unwrap().locked_by(), Some(next));
}

#[test]
fn plate_is_dropped_when_its_table_walks_out() {
    let mut r = restaurant();
    let party = spawn(&mut r, 1);
    seat_until_ordering(&mut r, party, 1);
    r.move_agent(table_pos(&r, 1));
    assert_eq!(r.on_interact(), Interaction::TookOrder(1));
    tick(&mut r, 4);

    let (counter, _) = r.kitchen.staged().next().unwrap();
    r.move_agent(counter);
    assert_eq!(r.on_interact(), Interaction::ClaimedFood(1));
    assert!(r.agent.held.is_some());
    r.drain_cues();

    // 40s of food patience, 4 already spent.
    tick(&mut r, 36);
    assert_eq!(r.customer_count(), 0);
    assert!(r.agent.held.is_none());
    assert!(!r.kitchen.has_order(1));
    assert!(r.drain_cues().contains(&AudioCue::OrderFailed));
}

#[test]
fn line_patience_pauses_while_following() {
    let mut r = restaurant();
    let party = spawn(&mut r, 1);
    let (_, guest) = r.roster.leader(party).unwrap();

    tick(&mut r, 10);
    r.move_agent(pos_of(&r, guest));
    assert_eq!(r.on_interact(), Interaction::Escorting(party));
    tick(&mut r, 20);
    assert_eq!(r.customer(guest).unwrap().timer, 50.0);

    r.move_agent(r.level.return_zone);
    assert_eq!(r.on_interact(), Interaction::CancelledEscort(party));
    tick(&mut r, 49);
    assert_eq!(r.phase(guest), Some(CustomerPhase::InLine));
    tick(&mut r, 1);
    assert_eq!(r.customer_count(), 0);
    assert_eq!(r.scoring.ledger.gave_up, 1);
    assert_eq!(r.session.score, 0);
    assert_eq!(r.queue.line_len(), 0);
    // Giving up in line is quiet; only a seated walkout plays the quit cue.
    assert!(!r.drain_cues().contains(&AudioCue::PartyQuit));
}

#[test]
fn session_stops_when_clock_runs_out() {
    let mut lvl = level();
    lvl.countdown = 5;
    let mut r = Restaurant::new(lvl, 1).unwrap();

    // Not started: nothing moves.
    r.advance(1.0);
    assert_eq!(r.tick_count, 0);

    r.start();
    tick(&mut r, 5);
    assert!(r.session.over);
    assert_eq!(r.session.countdown.display(), "00:00");
    let ticks = r.tick_count;
    tick(&mut r, 3);
    assert_eq!(r.tick_count, ticks);
}

#[test]
fn pause_freezes_service_and_resumes_in_place() {
    let mut r = restaurant();
    let waiting = spawn(&mut r, 2);
    let ordering = spawn(&mut r, 1);
    escort_and_seat(&mut r, waiting, 2);
    escort_and_seat(&mut r, ordering, 1);
    tick(&mut r, 16);
    r.move_agent(table_pos(&r, 2));
    assert_eq!(r.on_interact(), Interaction::TookOrder(2));

    let following = spawn(&mut r, 1);
    let (_, follower) = r.roster.leader(following).unwrap();
    r.move_agent(pos_of(&r, follower));
    assert_eq!(r.on_interact(), Interaction::Escorting(following));
    r.move_agent(Vec2::new(0.0, 0.0));

    let snapshot = |r: &Restaurant| -> Vec<(CustomerPhase, f32, Vec2)> {
        r.roster
            .iter()
            .flat_map(|(_, p)| p.entities())
            .map(|e| {
                let c = r.customer(e).unwrap();
                (c.phase, c.timer, pos_of(r, e))
            })
            .collect()
    };
    let customers = snapshot(&r);
    let session = r.session.clone();
    let cooking = r.kitchen.order(2).unwrap().remaining;
    let ticks = r.tick_count;
    assert_eq!(cooking, 6.0);

    r.set_paused(true);
    tick(&mut r, 100);
    assert_eq!(r.tick_count, ticks);
    assert_eq!(snapshot(&r), customers);
    assert_eq!(r.session, session);
    assert_eq!(r.kitchen.order(2).unwrap().remaining, cooking);
    assert_eq!(r.queue.tracked(), 4);

    r.set_paused(false);
    tick(&mut r, 1);
    assert_eq!(r.tick_count, ticks + 1);
    assert_eq!(r.kitchen.order(2).unwrap().remaining, cooking - 1.0);
    assert_eq!(
        r.session.countdown.seconds,
        session.countdown.seconds - 1.0
    );
    let (_, orderer) = r.roster.leader(ordering).unwrap();
    assert_eq!(r.customer(orderer).unwrap().timer, 29.0);
    assert!(all_in(&r, waiting, CustomerPhase::WaitingFood));
    assert_eq!(r.phase(follower), Some(CustomerPhase::Following));
}

#[test]
fn invalid_level_is_refused() {
    let mut bad = level();
    bad.rules.spawn.party_size = PartySizeDist::Range { min: 3, max: 2 };
    assert!(matches!(
        Restaurant::new(bad.clone(), 1),
        Err(ConfigError::Invalid(_))
    ));

    let mut no_trail = level();
    no_trail.rules.escort.memory = 0;
    assert!(Restaurant::new(no_trail, 1).is_err());

    // A refused reset leaves the running session alone.
    let mut r = restaurant();
    let party = spawn(&mut r, 2);
    assert!(r.reset_session(&bad).is_err());
    assert_eq!(r.roster.size(party), 2);
    assert_eq!(r.level, level());
    tick(&mut r, 3);
    assert_eq!(r.tick_count, 3);
}

#[test]
fn reset_session_is_idempotent() {
    let mut r = restaurant();
    let party = spawn(&mut r, 3);
    seat_until_ordering(&mut r, party, 2);
    r.session.add_score(75);

    let lvl = level();
    r.reset_session(&lvl).unwrap();
    let once = r.session.clone();
    r.reset_session(&lvl).unwrap();
    assert_eq!(r.session, once);
    assert_eq!(r.session.score, 0);
    assert_eq!(r.customer_count(), 0);
    assert!(r.roster.is_empty());
    assert_eq!(r.queue.line_len(), 0);
    assert_eq!(r.kitchen.active_orders(), 0);
    assert!(r.tables.iter().all(|t| t.locked_by().is_none()));
}

#[test]
fn sample_level_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("levels/diner.toml");
    let lvl = LevelConfig::load(&path).unwrap();
    assert_eq!(lvl.tables.len(), 4);
    assert_eq!(lvl.next_level.as_deref(), Some("bistro"));
}

fn leaders_match(r: &Restaurant, party: PartyId) -> bool {
    let Some(p) = r.roster.get(party) else {
        return true;
    };
    let smallest = p.members().map(|(id, _)| id).min();
    r.roster.leader(party).map(|(id, _)| id) == smallest
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Removing decoys reshuffles storage order; the seated party must
    /// still move through its phases together, one step at a time.
    #[test]
    fn seated_party_moves_in_lockstep(
        size in 1usize..=4,
        removed in proptest::collection::vec(any::<bool>(), 4),
        dt in 0.25f32..2.0,
    ) {
        let mut r = restaurant();
        let decoys = spawn(&mut r, 4);
        let party = spawn(&mut r, size);
        for (e, gone) in r.roster.entities(decoys).into_iter().zip(removed) {
            if gone {
                lifecycle::exit(&mut r, e, ExitReason::GaveUp);
            }
        }
        escort_and_seat(&mut r, party, 2);

        let mut last = phases(&r, party);
        for _ in 0..200 {
            r.advance(dt);
            if r.roster.get(party).is_none() {
                break;
            }
            prop_assert!(leaders_match(&r, party));
            let now = phases(&r, party);
            prop_assert!(now.windows(2).all(|w| w[0] == w[1]));
            for (before, after) in last.iter().zip(&now) {
                prop_assert!((*after as u8) <= (*before as u8) + 1);
            }
            last = now;
        }
    }

    #[test]
    fn leader_is_smallest_live_id(
        n in 1u32..8,
        removals in proptest::collection::vec(1u32..9, 0..8),
    ) {
        let mut world = hecs::World::new();
        let mut roster = Roster::new();
        let party = PartyId(1);
        for i in 1..=n {
            roster.insert(party, CustomerId(i), world.spawn(()));
        }
        let mut live: BTreeSet<u32> = (1..=n).collect();
        for id in removals {
            roster.remove(party, CustomerId(id));
            live.remove(&id);
            prop_assert_eq!(
                roster.leader(party).map(|(c, _)| c.0),
                live.iter().next().copied()
            );
        }
    }
}

#[test]
fn customer_snapshot_is_detached() {
    let mut r = restaurant();
    let party = spawn(&mut r, 1);
    let (_, guest) = r.roster.leader(party).unwrap();
    let before: Customer = r.customer(guest).unwrap();
    tick(&mut r, 1);
    assert_eq!(before.timer, 60.0);
    assert_eq!(r.customer(guest).unwrap().timer, 59.0);
}
