//! Customer spawner and the waiting line.
//!
//! Parties are created on a randomised interval and stand in a single line
//! of evenly spaced slots. Whenever anyone leaves the line the remaining
//! customers are packed forward so there are no gaps. Line order is the
//! order parties first arrived, which a re-queued party keeps.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::config::{RulesConfig, SpawnConfig};
use crate::ecs::components::{
    Customer, CustomerId, Facing, PartyId, Position, PrevPosition,
};
use crate::party::Roster;

#[derive(Debug, Clone)]
struct QueuedParty {
    party: PartyId,
    ticket: u64,
    /// Sorted by id.
    members: Vec<(CustomerId, hecs::Entity)>,
}

pub struct PartyQueue {
    line: Vec<QueuedParty>,
    /// Arrival ticket of every live party, kept while it is out of line.
    tickets: HashMap<PartyId, u64>,
    /// Every customer spawned and not yet exited.
    tracked: HashSet<hecs::Entity>,
    spawn: SpawnConfig,
    spawn_timer: f32,
    next_interval: f32,
    /// Size of the next party, drawn once and kept until it fits.
    pending_size: Option<usize>,
    rush_left: f32,
    next_party: u32,
    next_customer: u32,
    next_ticket: u64,
}

impl PartyQueue {
    pub fn new(spawn: &SpawnConfig, rng: &mut fastrand::Rng) -> Self {
        let mut queue = Self {
            line: Vec::new(),
            tickets: HashMap::new(),
            tracked: HashSet::new(),
            spawn: spawn.clone(),
            spawn_timer: 0.0,
            next_interval: 0.0,
            pending_size: None,
            rush_left: 0.0,
            next_party: 1,
            next_customer: 1,
            next_ticket: 0,
        };
        queue.next_interval = queue.roll_interval(rng);
        queue
    }

    pub fn reset(&mut self, spawn: &SpawnConfig, rng: &mut fastrand::Rng) {
        *self = Self::new(spawn, rng);
    }

    /// Advance the spawn timer; spawn a party when it is due and fits
    /// under the customer ceiling.
    pub fn update(
        &mut self,
        dt: f32,
        world: &mut hecs::World,
        roster: &mut Roster,
        rules: &RulesConfig,
        rng: &mut fastrand::Rng,
    ) -> Option<PartyId> {
        self.rush_left = (self.rush_left - dt).max(0.0);
        self.spawn_timer += dt;
        if self.spawn_timer < self.next_interval {
            return None;
        }

        let size = *self
            .pending_size
            .get_or_insert_with(|| self.spawn.party_size.sample(rng) as usize);
        if self.tracked.len() + size > self.spawn.max_customers {
            return None;
        }
        self.pending_size = None;

        let party = self.spawn_party(size, world, roster, rules);

        if let Some(rush) = &self.spawn.rush {
            if self.rush_left <= 0.0 && rng.f32() < rush.chance {
                self.rush_left = rush.duration;
                log::info!("rush hour for {:.0}s", rush.duration);
            }
        }
        self.spawn_timer = 0.0;
        self.next_interval = self.roll_interval(rng);
        Some(party)
    }

    /// Create a party of `size` at the back of the line.
    pub fn spawn_party(
        &mut self,
        size: usize,
        world: &mut hecs::World,
        roster: &mut Roster,
        rules: &RulesConfig,
    ) -> PartyId {
        let party = PartyId(self.next_party);
        self.next_party += 1;
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let mut members = Vec::with_capacity(size);
        for _ in 0..size {
            let id = CustomerId(self.next_customer);
            self.next_customer += 1;
            let pos = self.spawn.queue_start;
            let entity = world.spawn((
                id,
                party,
                Position(pos),
                PrevPosition(pos),
                Facing::default(),
                Customer::new(rules.waiting_patience),
            ));
            roster.insert(party, id, entity);
            self.tracked.insert(entity);
            members.push((id, entity));
        }

        self.tickets.insert(party, ticket);
        self.line.push(QueuedParty {
            party,
            ticket,
            members,
        });
        self.repack(world);
        log::debug!("spawned party {party} of {size}");
        party
    }

    /// Pull a whole party out of the line. Returns the members that were
    /// in it.
    pub fn take_party(&mut self, party: PartyId, world: &mut hecs::World) -> Vec<hecs::Entity> {
        let Some(idx) = self.line.iter().position(|q| q.party == party) else {
            return Vec::new();
        };
        let entry = self.line.remove(idx);
        self.repack(world);
        entry.members.into_iter().map(|(_, e)| e).collect()
    }

    /// Put members back in line at their party's original place. Members
    /// already in line are not added twice.
    pub fn requeue(
        &mut self,
        party: PartyId,
        members: &[(CustomerId, hecs::Entity)],
        world: &mut hecs::World,
    ) {
        let ticket = match self.tickets.get(&party) {
            Some(&t) => t,
            None => {
                let t = self.next_ticket;
                self.next_ticket += 1;
                self.tickets.insert(party, t);
                t
            }
        };

        let idx = match self.line.iter().position(|q| q.party == party) {
            Some(idx) => idx,
            None => {
                let at = self.line.partition_point(|q| q.ticket < ticket);
                self.line.insert(
                    at,
                    QueuedParty {
                        party,
                        ticket,
                        members: Vec::new(),
                    },
                );
                at
            }
        };
        let entry = &mut self.line[idx];
        for &(id, entity) in members {
            if !self.tracked.contains(&entity) {
                continue;
            }
            if entry.members.iter().all(|&(_, e)| e != entity) {
                entry.members.push((id, entity));
            }
        }
        entry.members.sort_by_key(|&(id, _)| id);
        if entry.members.is_empty() {
            self.line.remove(idx);
        }
        self.repack(world);
    }

    /// Drop a customer from the line, if it is there.
    pub fn remove(&mut self, entity: hecs::Entity, world: &mut hecs::World) -> bool {
        let mut removed = false;
        for entry in &mut self.line {
            let before = entry.members.len();
            entry.members.retain(|&(_, e)| e != entity);
            removed |= entry.members.len() != before;
        }
        if removed {
            self.line.retain(|q| !q.members.is_empty());
            self.repack(world);
        }
        removed
    }

    /// Stop tracking an exiting customer.
    pub fn forget(&mut self, entity: hecs::Entity, world: &mut hecs::World) {
        self.remove(entity, world);
        self.tracked.remove(&entity);
    }

    /// The party has no members left.
    pub fn forget_party(&mut self, party: PartyId) {
        self.tickets.remove(&party);
    }

    /// Move every queued customer to its slot, front to back.
    fn repack(&self, world: &mut hecs::World) {
        let mut slot = 0;
        for entry in &self.line {
            for &(_, entity) in &entry.members {
                if let Ok(mut pos) = world.get::<&mut Position>(entity) {
                    pos.0 = self.slot_pos(slot);
                }
                slot += 1;
            }
        }
    }

    pub fn slot_pos(&self, slot: usize) -> Vec2 {
        self.spawn.queue_start + self.spawn.queue_direction * self.spawn.spacing * slot as f32
    }

    /// Queued customers, front to back.
    pub fn line(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.line
            .iter()
            .flat_map(|q| q.members.iter().map(|&(_, e)| e))
    }

    /// Queued parties, front to back.
    pub fn parties(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.line.iter().map(|q| q.party)
    }

    pub fn line_len(&self) -> usize {
        self.line.iter().map(|q| q.members.len()).sum()
    }

    pub fn tracked(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_rush(&self) -> bool {
        self.rush_left > 0.0
    }

    fn roll_interval(&self, rng: &mut fastrand::Rng) -> f32 {
        let (min, max) = match &self.spawn.rush {
            Some(rush) if self.rush_left > 0.0 => (rush.min_interval, rush.max_interval),
            _ => (self.spawn.min_interval, self.spawn.max_interval),
        };
        min + rng.f32() * (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartySizeDist, RushConfig};

    fn rules() -> RulesConfig {
        let mut rules = RulesConfig::default();
        rules.spawn.min_interval = 1.0;
        rules.spawn.max_interval = 1.0;
        rules.spawn.max_customers = 6;
        rules.spawn.party_size = PartySizeDist::Range { min: 2, max: 2 };
        rules.spawn.rush = None;
        rules.spawn.queue_start = Vec2::ZERO;
        rules.spawn.queue_direction = Vec2::new(0.0, -1.0);
        rules.spawn.spacing = 1.0;
        rules
    }

    struct Fixture {
        world: hecs::World,
        roster: Roster,
        queue: PartyQueue,
        rules: RulesConfig,
        rng: fastrand::Rng,
    }

    fn fixture() -> Fixture {
        let rules = rules();
        let mut rng = fastrand::Rng::with_seed(3);
        Fixture {
            queue: PartyQueue::new(&rules.spawn, &mut rng),
            world: hecs::World::new(),
            roster: Roster::new(),
            rules,
            rng,
        }
    }

    impl Fixture {
        fn spawn(&mut self, size: usize) -> PartyId {
            self.queue
                .spawn_party(size, &mut self.world, &mut self.roster, &self.rules)
        }

        fn slot_of(&self, entity: hecs::Entity) -> Option<usize> {
            self.queue.line().position(|e| e == entity)
        }

        fn pos(&self, entity: hecs::Entity) -> Vec2 {
            self.world.get::<&Position>(entity).unwrap().0
        }
    }

    #[test]
    fn spawns_on_interval_up_to_ceiling() {
        let mut f = fixture();
        let mut spawned = 0;
        for _ in 0..10 {
            if f.queue
                .update(1.0, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
                .is_some()
            {
                spawned += 1;
            }
        }
        assert_eq!(spawned, 3);
        assert_eq!(f.queue.tracked(), 6);
        assert_eq!(f.roster.len(), 3);
    }

    #[test]
    fn leaving_packs_the_line() {
        let mut f = fixture();
        let a = f.spawn(2);
        let b = f.spawn(2);
        let first = f.roster.entities(a)[0];
        let b_members = f.roster.entities(b);

        f.queue.forget(first, &mut f.world);
        assert_eq!(f.queue.line_len(), 3);
        assert_eq!(f.slot_of(b_members[0]), Some(1));
        assert_eq!(f.pos(b_members[0]), Vec2::new(0.0, -1.0));
        assert_eq!(f.pos(b_members[1]), Vec2::new(0.0, -2.0));
    }

    #[test]
    fn requeue_restores_arrival_order_without_duplicates() {
        let mut f = fixture();
        let a = f.spawn(2);
        let b = f.spawn(3);
        let a_members: Vec<_> = f.roster.get(a).unwrap().members().collect();

        let taken = f.queue.take_party(a, &mut f.world);
        assert_eq!(taken.len(), 2);
        assert_eq!(f.queue.parties().collect::<Vec<_>>(), vec![b]);

        // Partial requeue first, then the full party.
        f.queue.requeue(a, &a_members[..1], &mut f.world);
        f.queue.requeue(a, &a_members, &mut f.world);
        assert_eq!(f.queue.parties().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(f.queue.line_len(), 5);
        assert_eq!(f.slot_of(a_members[1].1), Some(1));
        let b_first = f.roster.entities(b)[0];
        assert_eq!(f.pos(b_first), Vec2::new(0.0, -2.0));
    }

    #[test]
    fn rush_window_shortens_interval_then_closes() {
        let mut f = fixture();
        f.rules.spawn.max_customers = 2;
        f.rules.spawn.rush = Some(RushConfig {
            chance: 1.0,
            duration: 4.0,
            min_interval: 0.25,
            max_interval: 0.5,
        });
        f.queue = PartyQueue::new(&f.rules.spawn, &mut f.rng);
        assert!(!f.queue.is_rush());
        assert_eq!(f.queue.next_interval, 1.0);

        assert!(f.queue
            .update(1.0, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
            .is_some());
        assert!(f.queue.is_rush());
        assert!((0.25..=0.5).contains(&f.queue.next_interval));

        // Line is at the ceiling, so no spawn can reopen the window.
        assert!(f.queue
            .update(3.5, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
            .is_none());
        assert!(f.queue.is_rush());
        f.queue
            .update(0.5, &mut f.world, &mut f.roster, &f.rules, &mut f.rng);
        assert!(!f.queue.is_rush());
    }

    #[test]
    fn rush_never_opens_at_zero_chance() {
        let mut f = fixture();
        f.rules.spawn.rush = Some(RushConfig {
            chance: 0.0,
            ..RushConfig::default()
        });
        f.queue = PartyQueue::new(&f.rules.spawn, &mut f.rng);
        for _ in 0..3 {
            assert!(f.queue
                .update(1.0, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
                .is_some());
            assert!(!f.queue.is_rush());
            assert_eq!(f.queue.next_interval, 1.0);
        }
    }

    #[test]
    fn big_party_waits_for_room() {
        let mut f = fixture();
        f.rules.spawn.party_size = PartySizeDist::Range { min: 4, max: 4 };
        f.queue = PartyQueue::new(&f.rules.spawn, &mut f.rng);
        assert!(f.queue
            .update(1.0, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
            .is_some());
        assert!(f.queue
            .update(1.0, &mut f.world, &mut f.roster, &f.rules, &mut f.rng)
            .is_none());
        assert_eq!(f.queue.tracked(), 4);
    }
}
