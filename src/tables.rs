//! Tables, seat slots and party locks.

use glam::Vec2;

use crate::config::TableLayout;
use crate::ecs::components::PartyId;
use crate::error::{Result, ServiceError};

pub type TableId = u32;

#[derive(Debug, Clone)]
pub struct Seat {
    pub pos: Vec2,
    pub occupant: Option<hecs::Entity>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub position: Vec2,
    seats: Vec<Seat>,
    lock: Option<PartyId>,
}

impl Table {
    pub fn new(layout: &TableLayout) -> Self {
        Self {
            id: layout.id,
            position: layout.position,
            seats: layout
                .seats
                .iter()
                .map(|&pos| Seat {
                    pos,
                    occupant: None,
                })
                .collect(),
            lock: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    /// Indices of unoccupied seat slots.
    pub fn free_seats(&self) -> impl Iterator<Item = usize> + '_ {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupant.is_none())
            .map(|(i, _)| i)
    }

    pub fn free_seat_count(&self) -> usize {
        self.free_seats().count()
    }

    pub fn occupied_count(&self) -> usize {
        self.capacity() - self.free_seat_count()
    }

    pub fn is_available_for_seating(&self) -> bool {
        self.lock.is_none()
    }

    pub fn locked_by(&self) -> Option<PartyId> {
        self.lock
    }

    /// Entities currently sitting here, in slot order.
    pub fn occupants(&self) -> impl Iterator<Item = hecs::Entity> + '_ {
        self.seats.iter().filter_map(|s| s.occupant)
    }

    /// Can `party_size` customers be seated right now?
    pub fn fits(&self, party_size: usize) -> bool {
        self.is_available_for_seating() && self.free_seat_count() >= party_size
    }
}

/// A seat handed out by [`TableRegistry::seat`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatAssignment {
    pub entity: hecs::Entity,
    pub slot: usize,
    pub pos: Vec2,
}

/// Fixed set of tables for the level.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Vec<Table>,
}

impl TableRegistry {
    pub fn new(layouts: &[TableLayout]) -> Self {
        Self {
            tables: layouts.iter().map(Table::new).collect(),
        }
    }

    pub fn get(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Lock `table` to `party` and give every member a seat, in the order
    /// given. Nothing changes unless every member fits.
    pub fn seat(
        &mut self,
        table: TableId,
        party: PartyId,
        members: &[hecs::Entity],
    ) -> Result<Vec<SeatAssignment>> {
        let t = self
            .get_mut(table)
            .ok_or(ServiceError::TableNotFound(table))?;
        if let Some(holder) = t.lock {
            return Err(ServiceError::TableLocked {
                table,
                party: holder,
            });
        }
        let free: Vec<usize> = t.free_seats().collect();
        if free.len() < members.len() {
            return Err(ServiceError::NotEnoughSeats {
                table,
                free: free.len(),
                needed: members.len(),
            });
        }

        t.lock = Some(party);
        let assignments = members
            .iter()
            .zip(free)
            .map(|(&entity, slot)| {
                t.seats[slot].occupant = Some(entity);
                SeatAssignment {
                    entity,
                    slot,
                    pos: t.seats[slot].pos,
                }
            })
            .collect();
        log::debug!("table {table} locked to party {party}");
        Ok(assignments)
    }

    /// Free one seat slot. Stale slots are ignored.
    pub fn release_seat(&mut self, table: TableId, slot: usize) {
        if let Some(seat) = self.get_mut(table).and_then(|t| t.seats.get_mut(slot)) {
            seat.occupant = None;
        }
    }

    /// Remove `party`'s lock. A lock held by another party is left alone.
    pub fn unlock(&mut self, table: TableId, party: PartyId) -> bool {
        match self.get_mut(table) {
            Some(t) if t.lock == Some(party) => {
                t.lock = None;
                log::debug!("table {table} released by party {party}");
                true
            }
            _ => false,
        }
    }

    /// Nearest table within `radius` of `pos` that satisfies `pred`.
    /// Ties go to the table listed first.
    pub fn nearest(
        &self,
        pos: Vec2,
        radius: f32,
        mut pred: impl FnMut(&Table) -> bool,
    ) -> Option<TableId> {
        let mut best = None;
        let mut best_dist_sq = radius * radius;
        for t in &self.tables {
            let dist_sq = t.position.distance_squared(pos);
            if dist_sq <= best_dist_sq && pred(t) {
                // Strictly closer only, so the first of equals stays.
                if best.is_none() || dist_sq < best_dist_sq {
                    best_dist_sq = dist_sq;
                    best = Some(t.id);
                }
            }
        }
        best
    }

    pub fn in_range(&self, table: TableId, pos: Vec2, radius: f32) -> bool {
        self.get(table)
            .is_some_and(|t| t.position.distance_squared(pos) <= radius * radius)
    }

    pub fn reset(&mut self, layouts: &[TableLayout]) {
        *self = Self::new(layouts);
    }
}
