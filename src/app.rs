//! Headless host: drives a session at a fixed timestep with a scripted
//! waiter standing in for the player.

use glam::Vec2;
use instant::Instant;

use bistro::ecs::components::{Customer, CustomerPhase, Position};
use bistro::ecs::systems::escort;
use bistro::ecs::systems::interact::Interaction;
use bistro::input::InteractButton;
use bistro::render::instance::CustomerInstance;
use bistro::{LevelConfig, Restaurant};

/// Target simulation tick rate (seconds per tick).
const TICK_RATE: f64 = 1.0 / 60.0;
/// Max accumulated time before we clamp (prevents spiral of death).
const MAX_ACCUMULATOR: f64 = 0.25;
/// Simulated host frame length.
const FRAME_TIME: f64 = 1.0 / 30.0;
/// How often to log stats (simulated seconds).
const STATS_LOG_INTERVAL: f64 = 30.0;
/// Hard stop for levels without a countdown (simulated seconds).
const MAX_SESSION_TIME: f64 = 600.0;
/// Waiter walking speed, units/second.
const WAITER_SPEED: f32 = 6.0;

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_sim: f64,
    frame_time_sum: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frames_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_sim: 0.0,
            frame_time_sum: 0.0,
            frame_time_min: f64::MAX,
            frame_time_max: 0.0,
            frames_since_log: 0,
        }
    }

    /// `cost` is the wall-clock time the frame took, `sim_time` the
    /// simulated time after it.
    fn record_frame(&mut self, cost: f64, sim_time: f64, r: &Restaurant) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += cost;
        self.frame_time_min = self.frame_time_min.min(cost);
        self.frame_time_max = self.frame_time_max.max(cost);

        if sim_time - self.last_log_sim >= STATS_LOG_INTERVAL {
            let avg_us = (self.frame_time_sum / self.frames_since_log as f64) * 1_000_000.0;
            log::info!(
                "[{}] score {} | served {} | guests {} | line {}{} | kitchen {}{} | frame avg {:.0}us min {:.0}us max {:.0}us",
                r.session.countdown.display(),
                r.session.score,
                r.session.customers_served,
                r.customer_count(),
                r.queue.line_len(),
                if r.queue.is_rush() { " (rush)" } else { "" },
                r.kitchen.active_orders(),
                if r.kitchen.is_busy() { " cooking" } else { "" },
                avg_us,
                self.frame_time_min * 1_000_000.0,
                self.frame_time_max * 1_000_000.0,
            );
            log::debug!("systems: {}", r.timers.report());
            self.last_log_sim = sim_time;
            self.frame_time_sum = 0.0;
            self.frame_time_min = f64::MAX;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Waiter autopilot
// ---------------------------------------------------------------------------

/// Walks to whatever needs doing most and presses interact on arrival.
struct Waiter {
    button: InteractButton,
}

impl Waiter {
    fn new() -> Self {
        Self {
            button: InteractButton::new(),
        }
    }

    /// Where the waiter should be heading, in rough dispatcher priority.
    fn goal(r: &Restaurant) -> Option<Vec2> {
        if let Some(food) = &r.agent.held {
            return r.tables.get(food.table).map(|t| t.position);
        }

        if let Some(party) = r.session.escorted {
            let size = escort::members_in(r, party, CustomerPhase::Following).len();
            return Some(
                r.tables
                    .iter()
                    .find(|t| t.fits(size))
                    .map_or(r.level.return_zone, |t| t.position),
            );
        }

        if let Some(t) = r.tables.iter().find(|t| r.session.wants_to_order(t.id)) {
            return Some(t.position);
        }

        if let Some((pos, _)) = r.kitchen.staged().next() {
            return Some(pos);
        }

        let finished = r
            .world
            .query::<(&Position, &Customer)>()
            .iter()
            .find(|(_, (_, c))| c.phase == CustomerPhase::Finished)
            .map(|(_, (pos, _))| pos.0);
        if finished.is_some() {
            return finished;
        }

        // Fetch the front party only if somewhere could take it.
        let front = r.queue.parties().next()?;
        let size = r.roster.size(front);
        if !r.tables.iter().any(|t| t.fits(size)) {
            return None;
        }
        r.queue
            .line()
            .next()
            .and_then(|e| r.world.get::<&Position>(e).ok().map(|p| p.0))
    }

    fn update(&mut self, r: &mut Restaurant, dt: f32) -> Option<Interaction> {
        let Some(goal) = Self::goal(r) else {
            self.button.update(false);
            return None;
        };

        let to_goal = goal - r.agent.position;
        let step = WAITER_SPEED * dt;
        let pos = if to_goal.length() <= step {
            goal
        } else {
            r.agent.position + to_goal.normalize() * step
        };
        r.move_agent(pos);

        let arrived = pos.distance(goal) <= r.rules().interaction_radius * 0.5;
        // Let go for a frame after every press.
        let down = arrived && !self.button.pressed;
        if self.button.update(down) {
            return Some(r.on_interact());
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub fn run(level: LevelConfig, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    log::info!(
        "level {} | {} tables | seed {seed}",
        level.name,
        level.tables.len()
    );

    let mut restaurant = Restaurant::new(level, seed)?;
    restaurant.start();

    let mut waiter = Waiter::new();
    let mut frame_stats = FrameStats::new();
    let mut instance_buf: Vec<CustomerInstance> = Vec::with_capacity(64);
    let mut accumulator = 0.0;
    let mut sim_time = 0.0;
    let mut interactions = 0u64;

    while !restaurant.session.over && sim_time < MAX_SESSION_TIME {
        let frame_start = Instant::now();

        if let Some(result) = waiter.update(&mut restaurant, FRAME_TIME as f32) {
            if result != Interaction::Nothing {
                interactions += 1;
            }
        }

        accumulator += FRAME_TIME;
        if accumulator > MAX_ACCUMULATOR {
            accumulator = MAX_ACCUMULATOR;
        }
        while accumulator >= TICK_RATE {
            restaurant.advance(TICK_RATE as f32);
            accumulator -= TICK_RATE;
        }
        sim_time += FRAME_TIME;

        for cue in restaurant.drain_cues() {
            log::debug!("cue: {}", cue.label());
        }
        restaurant.instances((accumulator / TICK_RATE) as f32, &mut instance_buf);

        frame_stats.record_frame(frame_start.elapsed().as_secs_f64(), sim_time, &restaurant);
    }

    let session = &restaurant.session;
    let ledger = restaurant.scoring.ledger;
    log::info!(
        "session over after {} ticks ({} frames), {interactions} interactions",
        restaurant.tick_count,
        frame_stats.frame_count
    );
    log::info!(
        "{} | perfect {} | walked out {} | gave up {}",
        session.summary().replace('\n', " | "),
        ledger.perfect,
        ledger.abandoned,
        ledger.gave_up
    );
    match session.trophy() {
        Some(trophy) => log::info!("trophy: {}", trophy.label()),
        None => log::info!("no trophy this time"),
    }
    if let Some(next) = &session.next_level {
        log::info!("next level: {next}");
    }
    Ok(())
}
