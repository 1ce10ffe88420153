pub mod instance;

use self::instance::CustomerInstance;
use crate::ecs::components::{Customer, Facing, PartyId, Position, PrevPosition};

/// Rebuild `out` from the world. `alpha` interpolates between the previous
/// and current tick.
pub fn build_instances(world: &hecs::World, alpha: f32, out: &mut Vec<CustomerInstance>) {
    out.clear();
    for (_, (pos, prev_pos, facing, party, customer)) in world
        .query::<(&Position, &PrevPosition, &Facing, &PartyId, &Customer)>()
        .iter()
    {
        out.push(CustomerInstance::from_components(
            pos, prev_pos, *facing, *party, customer, alpha,
        ));
    }
}
