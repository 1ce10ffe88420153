//! Level and rule configuration, loaded from TOML.
//!
//! Every field has a default so a level file only needs to list what it
//! changes. `LevelConfig::default()` is a complete playable level.

use std::path::Path;

use glam::Vec2;
use serde::Deserialize;
use thiserror::Error;

use crate::tables::TableId;

/// Errors that can occur when loading a level.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values parsed but make no sense together
    #[error("Invalid level: {0}")]
    Invalid(String),
}

/// Score breakpoints for the end-of-session trophy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrophyThresholds {
    pub gold: i64,
    pub silver: i64,
    pub copper: i64,
}

impl Default for TrophyThresholds {
    fn default() -> Self {
        Self {
            gold: 3000,
            silver: 2000,
            copper: 1000,
        }
    }
}

/// One table in the dining room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableLayout {
    pub id: TableId,
    pub position: Vec2,
    pub seats: Vec<Vec2>,
}

/// A party size with its relative spawn weight.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WeightedSize {
    pub size: u32,
    pub weight: f32,
}

/// How many customers arrive together.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartySizeDist {
    /// Uniform over `min..=max`.
    Range { min: u32, max: u32 },
    /// Discrete table of sizes and weights.
    Weighted { sizes: Vec<WeightedSize> },
}

impl PartySizeDist {
    /// Draw a party size.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> u32 {
        match self {
            PartySizeDist::Range { min, max } => rng.u32(*min..=*max),
            PartySizeDist::Weighted { sizes } => {
                let total: f32 = sizes.iter().map(|s| s.weight).sum();
                let r = rng.f32() * total;
                let mut acc = 0.0;
                for s in sizes {
                    acc += s.weight;
                    if r < acc {
                        return s.size;
                    }
                }
                sizes.last().map_or(1, |s| s.size)
            }
        }
    }

    fn largest(&self) -> u32 {
        match self {
            PartySizeDist::Range { max, .. } => *max,
            PartySizeDist::Weighted { sizes } => sizes.iter().map(|s| s.size).max().unwrap_or(0),
        }
    }
}

/// Rush windows shorten the spawn interval for a while.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RushConfig {
    /// Chance per spawn that a rush window opens.
    pub chance: f32,
    /// Window length in seconds.
    pub duration: f32,
    pub min_interval: f32,
    pub max_interval: f32,
}

impl Default for RushConfig {
    fn default() -> Self {
        Self {
            chance: 0.1,
            duration: 20.0,
            min_interval: 2.0,
            max_interval: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub min_interval: f32,
    pub max_interval: f32,
    /// Ceiling on customers alive at once.
    pub max_customers: usize,
    pub party_size: PartySizeDist,
    /// Rush windows are disabled when absent.
    pub rush: Option<RushConfig>,
    /// First slot of the waiting line.
    pub queue_start: Vec2,
    /// Unit direction the line grows in.
    pub queue_direction: Vec2,
    /// Distance between line slots.
    pub spacing: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_interval: 6.0,
            max_interval: 12.0,
            max_customers: 12,
            party_size: PartySizeDist::Weighted {
                sizes: vec![
                    WeightedSize { size: 1, weight: 0.2 },
                    WeightedSize { size: 2, weight: 0.4 },
                    WeightedSize { size: 3, weight: 0.25 },
                    WeightedSize { size: 4, weight: 0.15 },
                ],
            },
            rush: Some(RushConfig::default()),
            queue_start: Vec2::new(-8.0, 4.0),
            queue_direction: Vec2::new(0.0, -1.0),
            spacing: 1.1,
        }
    }
}

/// Escort trail settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EscortConfig {
    /// Number of remembered agent positions.
    pub memory: usize,
    /// Minimum agent movement before a new position is recorded.
    pub min_increment: f32,
    /// Trail entries between consecutive followers.
    pub spacing: usize,
    /// Fraction of the remaining distance covered per tick.
    pub lerp: f32,
}

impl Default for EscortConfig {
    fn default() -> Self {
        Self {
            memory: 121,
            min_increment: 0.005,
            spacing: 20,
            lerp: 0.3,
        }
    }
}

/// Timer thresholds, scoring weights and kitchen timings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Patience while standing in line.
    pub waiting_patience: f32,
    /// Leader's menu reading time range.
    pub reading_time: [f32; 2],
    /// Leader's eating time range.
    pub eating_time: [f32; 2],
    pub ordering_patience: f32,
    pub food_patience_base: f32,
    pub food_patience_per_member: f32,
    pub food_patience_buffer: f32,
    pub dismiss_patience: f32,
    /// Points added per fired latch.
    pub penalty_points: u32,
    pub base_score: i64,
    pub perfect_bonus: i64,
    /// Score lost per customer who walks out.
    pub abandon_penalty: i64,
    pub cook_base_time: f32,
    pub cook_per_member: f32,
    pub staging_slots: usize,
    /// Number of food variants handed to the renderer.
    pub food_variants: u8,
    pub interaction_radius: f32,
    pub spawn: SpawnConfig,
    pub escort: EscortConfig,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            waiting_patience: 60.0,
            reading_time: [10.0, 20.0],
            eating_time: [10.0, 20.0],
            ordering_patience: 30.0,
            food_patience_base: 30.0,
            food_patience_per_member: 8.0,
            food_patience_buffer: 10.0,
            dismiss_patience: 30.0,
            penalty_points: 10,
            base_score: 100,
            perfect_bonus: 50,
            abandon_penalty: 50,
            cook_base_time: 2.0,
            cook_per_member: 2.0,
            staging_slots: 4,
            food_variants: 4,
            interaction_radius: 1.5,
            spawn: SpawnConfig::default(),
            escort: EscortConfig::default(),
        }
    }
}

impl RulesConfig {
    /// Food patience for a party of `party_size`.
    pub fn food_patience(&self, party_size: usize) -> f32 {
        let extra = party_size.saturating_sub(1) as f32;
        self.food_patience_base + self.food_patience_per_member * extra + self.food_patience_buffer
    }

    /// Kitchen preparation time for a party of `party_size`.
    pub fn cook_time(&self, party_size: usize) -> f32 {
        self.cook_base_time + self.cook_per_member * party_size as f32
    }
}

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    /// Session length in seconds.
    pub countdown: u32,
    /// Count up forever instead of down.
    pub infinite_timer: bool,
    pub trophies: TrophyThresholds,
    pub next_level: Option<String>,
    pub tables: Vec<TableLayout>,
    /// Where ready food is staged.
    pub kitchen_pickup: Vec2,
    /// Offset between staging slots.
    pub staging_offset: Vec2,
    /// Bringing an escorted party here sends it back to the line.
    pub return_zone: Vec2,
    pub rules: RulesConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        let table = |id: TableId, x: f32, y: f32, seats: usize| {
            let seats = (0..seats)
                .map(|i| {
                    let angle = i as f32 / seats as f32 * std::f32::consts::TAU;
                    Vec2::new(x + angle.cos() * 0.8, y + angle.sin() * 0.8)
                })
                .collect();
            TableLayout {
                id,
                position: Vec2::new(x, y),
                seats,
            }
        };
        Self {
            name: "Diner".to_string(),
            countdown: 180,
            infinite_timer: false,
            trophies: TrophyThresholds::default(),
            next_level: None,
            tables: vec![
                table(1, -3.0, 2.0, 2),
                table(2, 0.0, 2.0, 4),
                table(3, 3.0, 2.0, 4),
                table(4, 0.0, -1.5, 2),
            ],
            kitchen_pickup: Vec2::new(6.0, -3.0),
            staging_offset: Vec2::new(1.2, 0.0),
            return_zone: Vec2::new(-8.0, 5.5),
            rules: RulesConfig::default(),
        }
    }
}

impl LevelConfig {
    /// Parse and validate a level from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let level: LevelConfig = toml::from_str(content)?;
        level.validate()?;
        Ok(level)
    }

    /// Load a level file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rules = &self.rules;
        let spawn = &rules.spawn;

        if self.tables.is_empty() {
            return Err(ConfigError::Invalid("level has no tables".into()));
        }
        let mut ids: Vec<TableId> = self.tables.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(ConfigError::Invalid("duplicate table id".into()));
        }
        if let Some(t) = self.tables.iter().find(|t| t.seats.is_empty()) {
            return Err(ConfigError::Invalid(format!("table {} has no seats", t.id)));
        }
        check_range("reading_time", rules.reading_time[0], rules.reading_time[1])?;
        check_range("eating_time", rules.eating_time[0], rules.eating_time[1])?;
        check_range("spawn interval", spawn.min_interval, spawn.max_interval)?;
        if let Some(rush) = &spawn.rush {
            check_range("rush interval", rush.min_interval, rush.max_interval)?;
        }
        for (name, value) in [
            ("waiting_patience", rules.waiting_patience),
            ("ordering_patience", rules.ordering_patience),
            ("dismiss_patience", rules.dismiss_patience),
            ("food_patience_base", rules.food_patience_base),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if rules.staging_slots == 0 {
            return Err(ConfigError::Invalid("staging_slots must be at least 1".into()));
        }
        if rules.escort.memory <= rules.escort.spacing {
            return Err(ConfigError::Invalid("escort memory shorter than spacing".into()));
        }
        match &spawn.party_size {
            PartySizeDist::Range { min, max } if *min == 0 || min > max => {
                return Err(ConfigError::Invalid("party size range must be 1..=max".into()));
            }
            PartySizeDist::Weighted { sizes }
                if sizes.is_empty() || sizes.iter().any(|s| s.size == 0 || s.weight < 0.0) =>
            {
                return Err(ConfigError::Invalid("party size table is empty or malformed".into()));
            }
            _ => {}
        }
        if spawn.party_size.largest() as usize > spawn.max_customers {
            return Err(ConfigError::Invalid(
                "largest party exceeds max_customers".into(),
            ));
        }
        Ok(())
    }
}

fn check_range(name: &str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min < 0.0 || min > max {
        return Err(ConfigError::Invalid(format!(
            "{name}: expected 0 <= min <= max, got [{min}, {max}]"
        )));
    }
    Ok(())
}
