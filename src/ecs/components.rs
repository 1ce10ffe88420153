use std::fmt;

use glam::Vec2;

use crate::tables::TableId;

/// Stable customer identifier. Assigned in spawn order, never reused.
/// Leader election compares these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomerId(pub u32);

/// Party membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartyId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Current position on the ground plane.
#[derive(Debug, Clone, Copy)]
pub struct Position(pub Vec2);

/// Previous tick's position, for render interpolation.
#[derive(Debug, Clone, Copy)]
pub struct PrevPosition(pub Vec2);

/// Which way the sprite looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Lifecycle phases, in service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CustomerPhase {
    Waiting,
    /// Back in line after a cancelled escort.
    InLine,
    Following,
    Seated,
    ReadingMenu,
    Ordering,
    WaitingFood,
    Eating,
    Finished,
}

impl CustomerPhase {
    /// Standing in the waiting line.
    pub fn is_queued(self) -> bool {
        matches!(self, CustomerPhase::Waiting | CustomerPhase::InLine)
    }

    /// The agent can advance this customer by interacting with it.
    pub fn is_interactible(self) -> bool {
        matches!(
            self,
            CustomerPhase::Waiting
                | CustomerPhase::InLine
                | CustomerPhase::Ordering
                | CustomerPhase::Finished
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            CustomerPhase::Waiting => "Waiting",
            CustomerPhase::InLine => "In line",
            CustomerPhase::Following => "Following",
            CustomerPhase::Seated => "Seated",
            CustomerPhase::ReadingMenu => "Reading menu",
            CustomerPhase::Ordering => "Ordering",
            CustomerPhase::WaitingFood => "Waiting for food",
            CustomerPhase::Eating => "Eating",
            CustomerPhase::Finished => "Finished",
        }
    }
}

/// Visual impatience level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Mood {
    #[default]
    Calm,
    Impatient,
    Angry,
}

/// One-shot penalty latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Latch {
    OrderingImpatient = 1 << 0,
    OrderingAngry = 1 << 1,
    FoodImpatient = 1 << 2,
    FoodAngry = 1 << 3,
    DismissImpatient = 1 << 4,
    DismissAngry = 1 << 5,
}

/// Set of fired latches, packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyLatches(u8);

impl PenaltyLatches {
    /// Fire `latch`. Returns true only the first time.
    pub fn fire(&mut self, latch: Latch) -> bool {
        let bit = latch as u8;
        if self.0 & bit != 0 {
            return false;
        }
        self.0 |= bit;
        true
    }

    pub fn has(self, latch: Latch) -> bool {
        self.0 & latch as u8 != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_clean(self) -> bool {
        self.0 == 0
    }
}

/// Seat slot held by a seated customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatRef {
    pub table: TableId,
    pub slot: usize,
}

/// Escort sub-state: which trail entry this follower chases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailFollow {
    pub index: usize,
}

/// Per-customer lifecycle state.
#[derive(Debug, Clone)]
pub struct Customer {
    pub phase: CustomerPhase,
    /// Time left in the current timed phase.
    pub timer: f32,
    /// Value `timer` started from; thresholds are fractions of it.
    pub ceiling: f32,
    /// Cached at phase entry for leader-timed phases.
    pub is_leader: bool,
    pub mood: Mood,
    pub latches: PenaltyLatches,
    /// Accumulated penalty points.
    pub penalty: u32,
    pub seat: Option<SeatRef>,
    /// Food consumption indicator, 0 (full plate) to 3 (empty).
    pub eaten_stage: u8,
    pub trail: Option<TrailFollow>,
}

impl Customer {
    pub fn new(waiting_patience: f32) -> Self {
        Self {
            phase: CustomerPhase::Waiting,
            timer: waiting_patience,
            ceiling: waiting_patience,
            is_leader: false,
            mood: Mood::Calm,
            latches: PenaltyLatches::default(),
            penalty: 0,
            seat: None,
            eaten_stage: 0,
            trail: None,
        }
    }

    /// Switch phase and restart the phase timer at `ceiling`.
    pub fn enter(&mut self, phase: CustomerPhase, ceiling: f32) {
        self.phase = phase;
        self.timer = ceiling;
        self.ceiling = ceiling;
        self.mood = Mood::Calm;
        self.is_leader = false;
    }

    pub fn table(&self) -> Option<TableId> {
        self.seat.map(|s| s.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_fire_once() {
        let mut latches = PenaltyLatches::default();
        assert!(latches.is_clean());
        assert!(latches.fire(Latch::FoodAngry));
        assert!(!latches.fire(Latch::FoodAngry));
        assert!(latches.fire(Latch::DismissImpatient));
        assert_eq!(latches.count(), 2);
        assert!(latches.has(Latch::FoodAngry));
        assert!(!latches.has(Latch::OrderingAngry));
    }

    #[test]
    fn phases_are_ordered_for_service() {
        assert!(CustomerPhase::ReadingMenu < CustomerPhase::Ordering);
        assert!(CustomerPhase::Eating < CustomerPhase::Finished);
        assert!(CustomerPhase::InLine.is_queued());
        assert!(!CustomerPhase::Eating.is_interactible());
    }
}
