//! Kitchen order queue.
//!
//! One order per table. Preparation time is fixed when the order is taken
//! and counted down by the tick; finished food is staged on the pickup
//! counter until the agent claims it.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::audio::AudioCue;
use crate::config::RulesConfig;
use crate::ecs::components::{CustomerId, PartyId};
use crate::error::{Result, ServiceError};
use crate::session::SessionState;
use crate::tables::{TableId, TableRegistry};
use crate::util::pool::Pool;

/// A plate of food. Exactly one instance exists per order once cooked:
/// on the counter, in the agent's hands, or gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodItem {
    pub order: u64,
    pub table: TableId,
    /// Visual variant for the renderer.
    pub variant: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    /// Staged on the counter at `slot`.
    Ready { slot: usize },
    /// In the agent's hands.
    Claimed,
}

#[derive(Debug, Clone)]
pub struct KitchenOrder {
    pub id: u64,
    pub table: TableId,
    pub party: PartyId,
    /// Party members when the order was taken.
    pub members: Vec<CustomerId>,
    /// Seconds of cooking left.
    pub remaining: f32,
    pub status: OrderStatus,
}

pub struct Kitchen {
    orders: BTreeMap<TableId, KitchenOrder>,
    staging: Pool<FoodItem>,
    pickup: Vec2,
    slot_offset: Vec2,
    active: usize,
    next_order: u64,
}

impl Kitchen {
    pub fn new(slots: usize, pickup: Vec2, slot_offset: Vec2) -> Self {
        Self {
            orders: BTreeMap::new(),
            staging: Pool::with_capacity(slots),
            pickup,
            slot_offset,
            active: 0,
            next_order: 1,
        }
    }

    /// Take an order for `table`. `members` is the party as it stands now;
    /// the preparation time is fixed from its size.
    pub fn submit(
        &mut self,
        table: TableId,
        party: PartyId,
        members: Vec<CustomerId>,
        rules: &RulesConfig,
        session: &mut SessionState,
    ) -> Result<u64> {
        if self.orders.contains_key(&table) {
            return Err(ServiceError::OrderInFlight(table));
        }
        let id = self.next_order;
        self.next_order += 1;
        let remaining = rules.cook_time(members.len());
        log::debug!(
            "kitchen: order {id} for table {table} ({} guests), ready in {remaining:.1}s",
            members.len()
        );
        self.orders.insert(
            table,
            KitchenOrder {
                id,
                table,
                party,
                members,
                remaining,
                status: OrderStatus::Pending,
            },
        );
        self.active += 1;
        session.submit_to_kitchen(table);
        Ok(id)
    }

    /// Advance cooking. Finished orders are staged and flagged ready;
    /// orders whose table no longer belongs to the ordering party are dropped.
    pub fn update(
        &mut self,
        dt: f32,
        tables: &TableRegistry,
        session: &mut SessionState,
        rules: &RulesConfig,
        rng: &mut fastrand::Rng,
        cues: &mut Vec<AudioCue>,
    ) {
        let mut stale = Vec::new();
        for order in self.orders.values_mut() {
            if order.status != OrderStatus::Pending {
                continue;
            }
            order.remaining -= dt;
            if order.remaining > 0.0 {
                continue;
            }

            let owner = tables.get(order.table).and_then(|t| t.locked_by());
            if owner != Some(order.party) {
                log::warn!(
                    "kitchen: dropping order {} for table {}, party {} is gone",
                    order.id,
                    order.table,
                    order.party
                );
                stale.push(order.table);
                continue;
            }

            let item = FoodItem {
                order: order.id,
                table: order.table,
                variant: rng.u8(..rules.food_variants.max(1)),
            };
            match self.staging.alloc(item) {
                Ok(slot) => {
                    order.status = OrderStatus::Ready { slot };
                    self.active -= 1;
                    session.mark_ready(order.table);
                    cues.push(AudioCue::OrderComplete);
                    log::debug!(
                        "kitchen: table {} ready in slot {slot} ({} plates)",
                        order.table,
                        order.members.len()
                    );
                }
                // Counter full: try again next tick.
                Err(_) => {}
            }
        }
        for table in stale {
            self.discard(table);
            session.clear_table(table);
        }
    }

    /// Hand the staged food for `table` to the agent.
    pub fn claim(&mut self, table: TableId, session: &mut SessionState) -> Result<FoodItem> {
        let order = self
            .orders
            .get_mut(&table)
            .ok_or(ServiceError::NotReady(table))?;
        let OrderStatus::Ready { slot } = order.status else {
            return Err(ServiceError::NotReady(table));
        };
        let item = self
            .staging
            .free(slot)
            .ok_or(ServiceError::NotReady(table))?;
        order.status = OrderStatus::Claimed;
        session.clear_ready(table);
        Ok(item)
    }

    /// The order reached its table; forget it.
    pub fn deliver(&mut self, item: &FoodItem) -> bool {
        match self.orders.get(&item.table) {
            Some(order) if order.id == item.order && order.status == OrderStatus::Claimed => {
                self.orders.remove(&item.table);
                true
            }
            _ => false,
        }
    }

    /// Throw away whatever the kitchen holds for `table`.
    pub fn discard(&mut self, table: TableId) -> bool {
        let Some(order) = self.orders.remove(&table) else {
            return false;
        };
        match order.status {
            OrderStatus::Pending => self.active -= 1,
            OrderStatus::Ready { slot } => {
                self.staging.free(slot);
            }
            OrderStatus::Claimed => {}
        }
        log::debug!("kitchen: discarded order {} for table {table}", order.id);
        true
    }

    pub fn order(&self, table: TableId) -> Option<&KitchenOrder> {
        self.orders.get(&table)
    }

    pub fn has_order(&self, table: TableId) -> bool {
        self.orders.contains_key(&table)
    }

    /// Orders still cooking.
    pub fn active_orders(&self) -> usize {
        self.active
    }

    /// The cook sprite switches on while anything is cooking.
    pub fn is_busy(&self) -> bool {
        self.active > 0
    }

    pub fn slot_pos(&self, slot: usize) -> Vec2 {
        self.pickup + self.slot_offset * slot as f32
    }

    /// Staged food, with its counter position.
    pub fn staged(&self) -> impl Iterator<Item = (Vec2, &FoodItem)> + '_ {
        self.staging
            .iter()
            .map(move |(slot, item)| (self.slot_pos(slot), item))
    }

    /// Nearest staged plate within `radius`. Ties go to the lower slot.
    pub fn nearest_ready(&self, pos: Vec2, radius: f32) -> Option<TableId> {
        let mut best = None;
        let mut best_dist_sq = radius * radius;
        for (slot_pos, item) in self.staged() {
            let dist_sq = slot_pos.distance_squared(pos);
            if dist_sq <= best_dist_sq && (best.is_none() || dist_sq < best_dist_sq) {
                best_dist_sq = dist_sq;
                best = Some(item.table);
            }
        }
        best
    }

    pub fn reset(&mut self, slots: usize, pickup: Vec2, slot_offset: Vec2) {
        *self = Self::new(slots, pickup, slot_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelConfig, TableLayout};

    struct Fixture {
        kitchen: Kitchen,
        tables: TableRegistry,
        session: SessionState,
        rules: RulesConfig,
        rng: fastrand::Rng,
        cues: Vec<AudioCue>,
    }

    impl Fixture {
        fn new(table_count: u32) -> Self {
            let layouts: Vec<TableLayout> = (1..=table_count)
                .map(|id| TableLayout {
                    id,
                    position: Vec2::new(id as f32 * 3.0, 0.0),
                    seats: vec![Vec2::ZERO; 4],
                })
                .collect();
            let mut tables = TableRegistry::new(&layouts);
            let mut world = hecs::World::new();
            for id in 1..=table_count {
                let e = world.spawn(());
                tables.seat(id, PartyId(id), &[e]).unwrap();
            }
            let rules = RulesConfig {
                cook_base_time: 2.0,
                cook_per_member: 2.0,
                staging_slots: 2,
                ..RulesConfig::default()
            };
            Self {
                kitchen: Kitchen::new(rules.staging_slots, Vec2::new(10.0, 0.0), Vec2::X),
                tables,
                session: SessionState::new(&LevelConfig::default()),
                rules,
                rng: fastrand::Rng::with_seed(1),
                cues: Vec::new(),
            }
        }

        fn order(&mut self, table: TableId, size: u32) -> Result<u64> {
            self.session.mark_wants_to_order(table);
            let members = (0..size).map(CustomerId).collect();
            self.kitchen
                .submit(table, PartyId(table), members, &self.rules, &mut self.session)
        }

        fn tick(&mut self, dt: f32) {
            self.kitchen.update(
                dt,
                &self.tables,
                &mut self.session,
                &self.rules,
                &mut self.rng,
                &mut self.cues,
            );
        }
    }

    #[test]
    fn ready_after_scaled_delay() {
        let mut f = Fixture::new(1);
        f.order(1, 3).unwrap();
        assert!(f.session.is_in_kitchen(1));
        assert!(f.kitchen.is_busy());

        for _ in 0..7 {
            f.tick(1.0);
        }
        assert!(!f.session.is_ready(1));

        f.tick(1.0);
        assert!(f.session.is_ready(1));
        assert!(!f.kitchen.is_busy());
        assert_eq!(f.cues, vec![AudioCue::OrderComplete]);
    }

    #[test]
    fn second_order_for_table_is_rejected() {
        let mut f = Fixture::new(1);
        f.order(1, 1).unwrap();
        assert_eq!(f.order(1, 1), Err(ServiceError::OrderInFlight(1)));
        assert_eq!(f.kitchen.active_orders(), 1);
    }

    #[test]
    fn busy_tracks_overlapping_orders() {
        let mut f = Fixture::new(2);
        f.order(1, 1).unwrap(); // 4s
        f.order(2, 3).unwrap(); // 8s
        assert_eq!(f.kitchen.active_orders(), 2);
        for _ in 0..4 {
            f.tick(1.0);
        }
        assert_eq!(f.kitchen.active_orders(), 1);
        assert!(f.kitchen.is_busy());
        for _ in 0..4 {
            f.tick(1.0);
        }
        assert!(!f.kitchen.is_busy());
    }

    #[test]
    fn claim_moves_the_single_plate() {
        let mut f = Fixture::new(1);
        f.order(1, 1).unwrap();
        f.tick(4.0);
        assert_eq!(f.kitchen.nearest_ready(Vec2::new(10.0, 0.0), 1.0), Some(1));

        let item = f.kitchen.claim(1, &mut f.session).unwrap();
        assert_eq!(item.table, 1);
        assert!(!f.session.is_ready(1));
        assert_eq!(f.kitchen.staged().count(), 0);
        assert!(f.kitchen.claim(1, &mut f.session).is_err());

        assert!(f.kitchen.deliver(&item));
        assert!(!f.kitchen.has_order(1));
    }

    #[test]
    fn staged_plates_never_share_a_slot() {
        let mut f = Fixture::new(3);
        for t in 1..=3 {
            f.order(t, 1).unwrap();
        }
        f.tick(4.0);
        // Two slots: the third plate waits.
        assert_eq!(f.kitchen.staged().count(), 2);
        assert!(!f.session.is_ready(3));
        assert!(f.kitchen.is_busy());

        f.kitchen.claim(1, &mut f.session).unwrap();
        f.tick(0.1);
        assert!(f.session.is_ready(3));
        let slots: Vec<Vec2> = f.kitchen.staged().map(|(p, _)| p).collect();
        assert_eq!(slots.len(), 2);
        assert_ne!(slots[0], slots[1]);
    }

    #[test]
    fn order_for_released_table_is_dropped() {
        let mut f = Fixture::new(1);
        f.order(1, 2).unwrap();
        f.tables.unlock(1, PartyId(1));
        f.tick(10.0);
        assert!(!f.kitchen.has_order(1));
        assert!(!f.session.is_ready(1));
        assert!(!f.kitchen.is_busy());
    }

    #[test]
    fn discard_frees_counter_slot() {
        let mut f = Fixture::new(1);
        f.order(1, 1).unwrap();
        f.tick(4.0);
        assert!(f.kitchen.discard(1));
        assert_eq!(f.kitchen.staged().count(), 0);
        assert!(!f.kitchen.discard(1));
    }
}
