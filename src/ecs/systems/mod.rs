pub mod customer;
pub mod escort;
pub mod interact;
pub mod lifecycle;
pub mod service;

use crate::debug::timer::SystemPhase;
use crate::restaurant::Restaurant;

/// Run all simulation systems for one fixed tick. Does nothing unless the
/// session is running.
pub fn tick(r: &mut Restaurant, dt: f32) {
    if !r.session.is_running() {
        return;
    }
    r.tick_count += 1;

    // 1. Previous positions for interpolation
    escort::begin_tick(&mut r.world);

    // 2. Countdown
    r.timers.begin();
    let expired = r.session.advance_clock(dt);
    r.timers.end(SystemPhase::Clock);
    if expired {
        log::info!(
            "time's up: {} served, score {}",
            r.session.customers_served,
            r.session.score
        );
        return;
    }

    // 3. Spawner
    r.timers.begin();
    r.queue
        .update(dt, &mut r.world, &mut r.roster, &r.level.rules, &mut r.rng);
    r.timers.end(SystemPhase::Spawner);

    // 4. Customer state machines
    r.timers.begin();
    customer::update(r, dt);
    r.timers.end(SystemPhase::Customers);

    // 5. Kitchen
    r.timers.begin();
    r.kitchen.update(
        dt,
        &r.tables,
        &mut r.session,
        &r.level.rules,
        &mut r.rng,
        &mut r.cues,
    );
    r.timers.end(SystemPhase::Kitchen);

    // 6. Followers trail the agent
    r.timers.begin();
    escort::update(r);
    r.timers.end(SystemPhase::Escort);
}
