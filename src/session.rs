use std::collections::BTreeSet;

use crate::config::{LevelConfig, TrophyThresholds};
use crate::ecs::components::PartyId;
use crate::tables::TableId;

/// Trophy earned by the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Trophy {
    Copper,
    Silver,
    Gold,
}

impl Trophy {
    pub fn label(self) -> &'static str {
        match self {
            Trophy::Copper => "Copper",
            Trophy::Silver => "Silver",
            Trophy::Gold => "Gold",
        }
    }
}

/// Session clock. Counts down to zero, or up forever when infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    pub seconds: f32,
    pub infinite: bool,
}

impl Countdown {
    fn advance(&mut self, dt: f32) {
        if self.infinite {
            self.seconds += dt;
        } else {
            self.seconds = (self.seconds - dt).max(0.0);
        }
    }

    pub fn expired(&self) -> bool {
        !self.infinite && self.seconds <= 0.0
    }

    /// `MM:SS`, whole seconds shown rounded up while counting down.
    pub fn display(&self) -> String {
        let total = if self.infinite {
            self.seconds.floor() as u32
        } else {
            self.seconds.ceil() as u32
        };
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

/// Session-wide mutable state. Owned by the simulation and passed to the
/// systems that need it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub paused: bool,
    pub started: bool,
    /// Set once the countdown expires.
    pub over: bool,
    /// Party currently following the agent.
    pub escorted: Option<PartyId>,
    pub countdown: Countdown,
    pub score: i64,
    pub customers_served: u32,
    pub trophies: TrophyThresholds,
    pub next_level: Option<String>,
    awaiting_order: BTreeSet<TableId>,
    in_kitchen: BTreeSet<TableId>,
    ready: BTreeSet<TableId>,
}

impl SessionState {
    pub fn new(level: &LevelConfig) -> Self {
        Self {
            paused: false,
            started: false,
            over: false,
            escorted: None,
            countdown: Countdown {
                seconds: if level.infinite_timer {
                    0.0
                } else {
                    level.countdown as f32
                },
                infinite: level.infinite_timer,
            },
            score: 0,
            customers_served: 0,
            trophies: level.trophies,
            next_level: level.next_level.clone(),
            awaiting_order: BTreeSet::new(),
            in_kitchen: BTreeSet::new(),
            ready: BTreeSet::new(),
        }
    }

    /// Back to the level's starting values.
    pub fn reset(&mut self, level: &LevelConfig) {
        *self = Self::new(level);
    }

    /// Timers and spawning only run while this holds.
    pub fn is_running(&self) -> bool {
        self.started && !self.paused && !self.over
    }

    pub fn is_escorting(&self) -> bool {
        self.escorted.is_some()
    }

    /// Advance the countdown. Returns true on the tick it expires.
    pub fn advance_clock(&mut self, dt: f32) -> bool {
        self.countdown.advance(dt);
        if self.countdown.expired() && !self.over {
            self.over = true;
            return true;
        }
        false
    }

    pub fn add_score(&mut self, delta: i64) {
        self.score += delta;
    }

    pub fn record_served(&mut self, count: u32) {
        self.customers_served += count;
    }

    pub fn trophy(&self) -> Option<Trophy> {
        if self.score >= self.trophies.gold {
            Some(Trophy::Gold)
        } else if self.score >= self.trophies.silver {
            Some(Trophy::Silver)
        } else if self.score >= self.trophies.copper {
            Some(Trophy::Copper)
        } else {
            None
        }
    }

    /// Served/score readout for the HUD.
    pub fn summary(&self) -> String {
        format!(
            "Served: {}\nScore: {}",
            self.customers_served, self.score
        )
    }

    // --- order bookkeeping ---

    pub fn mark_wants_to_order(&mut self, table: TableId) {
        self.awaiting_order.insert(table);
    }

    pub fn wants_to_order(&self, table: TableId) -> bool {
        self.awaiting_order.contains(&table)
    }

    /// Move a table from awaiting-order to in-kitchen.
    pub fn submit_to_kitchen(&mut self, table: TableId) -> bool {
        if self.awaiting_order.remove(&table) {
            self.in_kitchen.insert(table);
            true
        } else {
            false
        }
    }

    pub fn is_in_kitchen(&self, table: TableId) -> bool {
        self.in_kitchen.contains(&table)
    }

    pub fn mark_ready(&mut self, table: TableId) {
        self.in_kitchen.remove(&table);
        self.ready.insert(table);
    }

    pub fn is_ready(&self, table: TableId) -> bool {
        self.ready.contains(&table)
    }

    pub fn clear_ready(&mut self, table: TableId) {
        self.ready.remove(&table);
    }

    /// Drop every order flag for `table`.
    pub fn clear_table(&mut self, table: TableId) {
        self.awaiting_order.remove(&table);
        self.in_kitchen.remove(&table);
        self.ready.remove(&table);
    }
}
