//! Top-level simulation state.

use glam::Vec2;

use crate::audio::AudioCue;
use crate::config::{ConfigError, LevelConfig, RulesConfig};
use crate::debug::timer::SystemTimers;
use crate::ecs::components::{Customer, CustomerPhase};
use crate::ecs::systems;
use crate::ecs::systems::interact::Interaction;
use crate::kitchen::{FoodItem, Kitchen};
use crate::party::Roster;
use crate::queue::PartyQueue;
use crate::render::instance::CustomerInstance;
use crate::render;
use crate::scoring::ScoringEngine;
use crate::session::SessionState;
use crate::tables::TableRegistry;
use crate::trail::FollowerTrail;

/// The waiter the player controls.
#[derive(Debug, Clone, Default)]
pub struct Agent {
    pub position: Vec2,
    /// Plate being carried, if any.
    pub held: Option<FoodItem>,
}

pub struct Restaurant {
    // ECS
    pub world: hecs::World,

    // Registries
    pub session: SessionState,
    pub roster: Roster,
    pub queue: PartyQueue,
    pub tables: TableRegistry,
    pub kitchen: Kitchen,
    pub scoring: ScoringEngine,

    pub agent: Agent,
    pub trail: FollowerTrail,
    pub level: LevelConfig,

    // RNG (shared, deterministic per seed)
    pub rng: fastrand::Rng,

    pub timers: SystemTimers,
    pub(crate) cues: Vec<AudioCue>,
    pub tick_count: u64,
}

impl Restaurant {
    /// Build a restaurant for `level`. Levels that fail validation are
    /// refused here so nothing in the tick path has to cope with them.
    pub fn new(level: LevelConfig, seed: u64) -> Result<Self, ConfigError> {
        level.validate()?;
        let mut rng = fastrand::Rng::with_seed(seed);
        let rules = &level.rules;
        let agent = Agent {
            position: level.kitchen_pickup,
            held: None,
        };
        Ok(Self {
            world: hecs::World::new(),
            session: SessionState::new(&level),
            roster: Roster::new(),
            queue: PartyQueue::new(&rules.spawn, &mut rng),
            tables: TableRegistry::new(&level.tables),
            kitchen: Kitchen::new(rules.staging_slots, level.kitchen_pickup, level.staging_offset),
            scoring: ScoringEngine::new(rules),
            trail: FollowerTrail::new(&rules.escort, agent.position),
            agent,
            level,
            rng,
            timers: SystemTimers::new(),
            cues: Vec::new(),
            tick_count: 0,
        })
    }

    /// Put everything back to the start of `level`. Safe to call any time,
    /// any number of times. An invalid level leaves the current session
    /// untouched.
    pub fn reset_session(&mut self, level: &LevelConfig) -> Result<(), ConfigError> {
        level.validate()?;
        self.level = level.clone();
        let rules = &self.level.rules;
        self.world.clear();
        self.session.reset(&self.level);
        self.roster.clear();
        self.queue.reset(&rules.spawn, &mut self.rng);
        self.tables.reset(&self.level.tables);
        self.kitchen
            .reset(rules.staging_slots, self.level.kitchen_pickup, self.level.staging_offset);
        self.scoring.reset(rules);
        self.agent = Agent {
            position: self.level.kitchen_pickup,
            held: None,
        };
        self.trail.reset(self.agent.position);
        self.cues.clear();
        self.tick_count = 0;
        log::info!("session reset: {}", self.level.name);
        Ok(())
    }

    pub fn start(&mut self) {
        self.session.started = true;
        log::info!(
            "session started: {} ({})",
            self.level.name,
            self.session.countdown.display()
        );
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.session.paused != paused {
            log::debug!("paused: {paused}");
        }
        self.session.paused = paused;
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.level.rules
    }

    /// Advance the simulation by one fixed step.
    pub fn advance(&mut self, dt: f32) {
        systems::tick(self, dt);
    }

    /// The interact button was pressed.
    pub fn on_interact(&mut self) -> Interaction {
        systems::interact::dispatch(self)
    }

    pub fn move_agent(&mut self, pos: Vec2) {
        self.agent.position = pos;
    }

    /// Sound cues raised since the last call.
    pub fn drain_cues(&mut self) -> Vec<AudioCue> {
        std::mem::take(&mut self.cues)
    }

    pub fn customer(&self, entity: hecs::Entity) -> Option<Customer> {
        self.world
            .get::<&Customer>(entity)
            .ok()
            .map(|c| (*c).clone())
    }

    pub fn phase(&self, entity: hecs::Entity) -> Option<CustomerPhase> {
        self.world.get::<&Customer>(entity).ok().map(|c| c.phase)
    }

    pub fn customer_count(&self) -> usize {
        self.world.query::<&Customer>().iter().count()
    }

    /// Per-customer render data, interpolated by `alpha`.
    pub fn instances(&self, alpha: f32, out: &mut Vec<CustomerInstance>) {
        render::build_instances(&self.world, alpha, out);
    }
}
