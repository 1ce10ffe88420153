use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::ecs::components::{
    Customer, CustomerPhase, Facing, Mood, PartyId, Position, PrevPosition,
};

/// Sprite set to draw for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VisualPhase {
    Idle = 0,
    Impatient = 1,
    Angry = 2,
    Walking = 3,
    Seated = 4,
    Reading = 5,
    Ordering = 6,
    WaitingFood = 7,
    Eating = 8,
    Finished = 9,
}

impl VisualPhase {
    pub fn of(customer: &Customer) -> Self {
        match customer.phase {
            CustomerPhase::Waiting | CustomerPhase::InLine => match customer.mood {
                Mood::Calm => Self::Idle,
                Mood::Impatient => Self::Impatient,
                Mood::Angry => Self::Angry,
            },
            CustomerPhase::Following => Self::Walking,
            CustomerPhase::Seated => Self::Seated,
            CustomerPhase::ReadingMenu => Self::Reading,
            CustomerPhase::Ordering => Self::Ordering,
            CustomerPhase::WaitingFood => Self::WaitingFood,
            CustomerPhase::Eating => Self::Eating,
            CustomerPhase::Finished => Self::Finished,
        }
    }
}

/// Per-instance data handed to the renderer each frame.
/// Stride = 28 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CustomerInstance {
    /// World position (x, y).
    pub position: [f32; 2],
    /// `VisualPhase` discriminant.
    pub visual: u32,
    /// 0 calm, 1 impatient, 2 angry.
    pub mood: u32,
    /// 0 left, 1 right.
    pub facing: u32,
    /// Plate indicator, 0 (full) to 3 (empty).
    pub eaten: u32,
    /// Party id, for tinting.
    pub party: u32,
}

impl CustomerInstance {
    /// Build a CustomerInstance from ECS components, interpolating position.
    pub fn from_components(
        pos: &Position,
        prev_pos: &PrevPosition,
        facing: Facing,
        party: PartyId,
        customer: &Customer,
        alpha: f32,
    ) -> Self {
        // Lerp between previous and current position for smooth rendering
        let interp = Vec2::lerp(prev_pos.0, pos.0, alpha);

        Self {
            position: interp.into(),
            visual: VisualPhase::of(customer) as u32,
            mood: customer.mood as u32,
            facing: facing as u32,
            eaten: customer.eaten_stage as u32,
            party: party.0,
        }
    }
}
