//! Per-customer lifecycle timers.
//!
//! Leaders step first, then everyone else reads the leaders' post-step
//! phase, so a party crosses each leader-timed boundary on the same tick
//! regardless of iteration order. Exits are collected and applied after
//! both passes.

use std::collections::HashMap;

use crate::audio::AudioCue;
use crate::config::RulesConfig;
use crate::ecs::components::{Customer, CustomerId, CustomerPhase, Latch, Mood, PartyId};
use crate::ecs::systems::lifecycle::{self, ExitReason};
use crate::restaurant::Restaurant;
use crate::scoring::ScoringEngine;
use crate::tables::TableId;

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

enum CustomerCmd {
    /// Leader finished reading; the table wants its order taken.
    WantsToOrder { table: TableId },
    /// Waiting patience ran out.
    GiveUp { entity: hecs::Entity },
    /// Ordering or food patience ran out.
    Abandon { entity: hecs::Entity },
    /// Nobody came to dismiss them.
    Dismiss { entity: hecs::Entity },
}

/// What followers need to know about their leader after the leader pass.
#[derive(Debug, Clone, Copy)]
struct LeaderView {
    phase: CustomerPhase,
    eaten_stage: u8,
}

pub fn update(r: &mut Restaurant, dt: f32) {
    let mut cmds = Vec::new();
    {
        let Restaurant {
            world,
            roster,
            scoring,
            level,
            rng,
            ..
        } = r;
        let rules = &level.rules;

        // Leader pass.
        let leaders: Vec<(PartyId, CustomerId, hecs::Entity)> = roster
            .iter()
            .filter_map(|(party, p)| p.leader().map(|(id, e)| (party, id, e)))
            .collect();
        let mut views: HashMap<PartyId, LeaderView> = HashMap::with_capacity(leaders.len());
        for &(party, _, entity) in &leaders {
            let Ok(mut customer) = world.get::<&mut Customer>(entity) else {
                continue;
            };
            step_leader(entity, &mut customer, dt, rules, scoring, rng, &mut cmds);
            views.insert(
                party,
                LeaderView {
                    phase: customer.phase,
                    eaten_stage: customer.eaten_stage,
                },
            );
        }

        // Follower pass.
        for (entity, (customer, id, party)) in
            world.query_mut::<(&mut Customer, &CustomerId, &PartyId)>()
        {
            if roster.is_leader(*party, *id) {
                continue;
            }
            step_follower(
                entity,
                customer,
                views.get(party).copied(),
                dt,
                rules,
                scoring,
                &mut cmds,
            );
        }
    }

    apply(r, cmds);
}

/// Leader, or a customer in a phase where the party doesn't matter.
fn step_leader(
    entity: hecs::Entity,
    c: &mut Customer,
    dt: f32,
    rules: &RulesConfig,
    scoring: &ScoringEngine,
    rng: &mut fastrand::Rng,
    cmds: &mut Vec<CustomerCmd>,
) {
    match c.phase {
        CustomerPhase::Waiting | CustomerPhase::InLine => step_waiting(entity, c, dt, cmds),
        CustomerPhase::Following => {}
        CustomerPhase::Seated => {
            c.enter(CustomerPhase::ReadingMenu, 0.0);
            arm(c, rules.reading_time, rng);
        }
        CustomerPhase::ReadingMenu => {
            // Leadership passed on mid-phase: start our own clock.
            if !c.is_leader {
                arm(c, rules.reading_time, rng);
            }
            c.timer -= dt;
            if c.timer <= 0.0 {
                c.enter(CustomerPhase::Ordering, rules.ordering_patience);
                if let Some(table) = c.table() {
                    cmds.push(CustomerCmd::WantsToOrder { table });
                }
            }
        }
        CustomerPhase::Eating => {
            if !c.is_leader {
                arm(c, rules.eating_time, rng);
            }
            c.timer -= dt;
            c.eaten_stage = eaten_stage(c.timer, c.ceiling);
            if c.timer <= 0.0 {
                finish_eating(c, rules);
            }
        }
        CustomerPhase::Ordering
        | CustomerPhase::WaitingFood
        | CustomerPhase::Finished => step_patience(entity, c, dt, scoring, cmds),
    }
}

fn step_follower(
    entity: hecs::Entity,
    c: &mut Customer,
    leader: Option<LeaderView>,
    dt: f32,
    rules: &RulesConfig,
    scoring: &ScoringEngine,
    cmds: &mut Vec<CustomerCmd>,
) {
    match c.phase {
        CustomerPhase::Waiting | CustomerPhase::InLine => step_waiting(entity, c, dt, cmds),
        CustomerPhase::Following => {}
        CustomerPhase::Seated => c.enter(CustomerPhase::ReadingMenu, 0.0),
        CustomerPhase::ReadingMenu => {
            if leader.is_some_and(|l| l.phase > CustomerPhase::ReadingMenu) {
                c.enter(CustomerPhase::Ordering, rules.ordering_patience);
            }
        }
        CustomerPhase::Eating => {
            if let Some(l) = leader {
                c.eaten_stage = l.eaten_stage;
                if l.phase > CustomerPhase::Eating {
                    finish_eating(c, rules);
                }
            }
        }
        CustomerPhase::Ordering
        | CustomerPhase::WaitingFood
        | CustomerPhase::Finished => step_patience(entity, c, dt, scoring, cmds),
    }
}

/// Take over the timer for a leader-timed phase.
fn arm(c: &mut Customer, range: [f32; 2], rng: &mut fastrand::Rng) {
    let duration = range[0] + rng.f32() * (range[1] - range[0]);
    c.is_leader = true;
    c.timer = duration;
    c.ceiling = duration;
}

fn finish_eating(c: &mut Customer, rules: &RulesConfig) {
    c.enter(CustomerPhase::Finished, rules.dismiss_patience);
    c.eaten_stage = 3;
}

fn step_waiting(entity: hecs::Entity, c: &mut Customer, dt: f32, cmds: &mut Vec<CustomerCmd>) {
    c.timer -= dt;
    c.mood = mood_for(c.timer, c.ceiling);
    if c.timer <= 0.0 {
        cmds.push(CustomerCmd::GiveUp { entity });
    }
}

/// Patience countdown with one-shot penalty latches at two thirds and one
/// third remaining.
fn step_patience(
    entity: hecs::Entity,
    c: &mut Customer,
    dt: f32,
    scoring: &ScoringEngine,
    cmds: &mut Vec<CustomerCmd>,
) {
    let (impatient, angry) = match c.phase {
        CustomerPhase::Ordering => (Latch::OrderingImpatient, Latch::OrderingAngry),
        CustomerPhase::WaitingFood => (Latch::FoodImpatient, Latch::FoodAngry),
        _ => (Latch::DismissImpatient, Latch::DismissAngry),
    };

    c.timer -= dt;
    if c.timer <= c.ceiling * 2.0 / 3.0 {
        scoring.apply_latch(c, impatient);
    }
    if c.timer <= c.ceiling / 3.0 {
        scoring.apply_latch(c, angry);
    }
    c.mood = mood_for(c.timer, c.ceiling);

    if c.timer > 0.0 {
        return;
    }
    if c.phase == CustomerPhase::Finished {
        scoring.apply_overdue(c);
        cmds.push(CustomerCmd::Dismiss { entity });
    } else {
        cmds.push(CustomerCmd::Abandon { entity });
    }
}

/// Mood tier for `remaining` out of `ceiling`.
pub fn mood_for(remaining: f32, ceiling: f32) -> Mood {
    if remaining <= ceiling / 3.0 {
        Mood::Angry
    } else if remaining <= ceiling * 2.0 / 3.0 {
        Mood::Impatient
    } else {
        Mood::Calm
    }
}

/// Plate indicator: 0 full, 3 empty.
fn eaten_stage(remaining: f32, ceiling: f32) -> u8 {
    if remaining <= 0.0 {
        3
    } else if remaining <= ceiling / 3.0 {
        2
    } else if remaining <= ceiling * 2.0 / 3.0 {
        1
    } else {
        0
    }
}

fn apply(r: &mut Restaurant, cmds: Vec<CustomerCmd>) {
    for cmd in cmds {
        match cmd {
            CustomerCmd::WantsToOrder { table } => {
                r.session.mark_wants_to_order(table);
                r.cues.push(AudioCue::OrderBell);
                log::debug!("table {table} ready to order");
            }
            CustomerCmd::GiveUp { entity } => {
                lifecycle::exit(r, entity, ExitReason::GaveUp);
            }
            CustomerCmd::Abandon { entity } => {
                lifecycle::exit(r, entity, ExitReason::Abandoned);
            }
            CustomerCmd::Dismiss { entity } => {
                lifecycle::dismiss(r, entity);
            }
        }
    }
}
