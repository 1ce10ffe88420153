use instant::Instant;

/// Which phase of the simulation tick is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemPhase {
    Clock = 0,
    Spawner = 1,
    Customers = 2,
    Kitchen = 3,
    Escort = 4,
}

impl SystemPhase {
    pub const ALL: [SystemPhase; 5] = [
        Self::Clock,
        Self::Spawner,
        Self::Customers,
        Self::Kitchen,
        Self::Escort,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Clock => "Clock",
            Self::Spawner => "Spawner",
            Self::Customers => "Customers",
            Self::Kitchen => "Kitchen",
            Self::Escort => "Escort",
        }
    }
}

/// Per-system timing with exponential moving average smoothing.
pub struct SystemTimers {
    /// EMA-smoothed duration in microseconds per phase.
    pub durations_us: [f64; 5],
    /// Timestamp when `begin()` was called.
    start: Instant,
}

const EMA_ALPHA: f64 = 0.1;

impl SystemTimers {
    pub fn new() -> Self {
        Self {
            durations_us: [0.0; 5],
            start: Instant::now(),
        }
    }

    /// Call before a system runs.
    pub fn begin(&mut self) {
        self.start = Instant::now();
    }

    /// Call after a system finishes. Records elapsed time for `phase`.
    pub fn end(&mut self, phase: SystemPhase) {
        let elapsed_us = self.start.elapsed().as_secs_f64() * 1_000_000.0;
        let idx = phase as usize;
        self.durations_us[idx] =
            self.durations_us[idx] * (1.0 - EMA_ALPHA) + elapsed_us * EMA_ALPHA;
    }

    /// Sum of all phase durations (microseconds).
    pub fn total_us(&self) -> f64 {
        self.durations_us.iter().sum()
    }

    /// One-line breakdown for the periodic stats log.
    pub fn report(&self) -> String {
        SystemPhase::ALL
            .iter()
            .map(|&p| format!("{} {:.1}us", p.label(), self.durations_us[p as usize]))
            .chain(std::iter::once(format!("total {:.1}us", self.total_us())))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Default for SystemTimers {
    fn default() -> Self {
        Self::new()
    }
}
