use thiserror::Error;

use crate::ecs::components::PartyId;
use crate::tables::TableId;

/// Why a service operation was refused. Callers absorb these: an
/// interaction that cannot go through leaves the state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    #[error("Table {table} is held by party {party}")]
    TableLocked { table: TableId, party: PartyId },

    #[error("Table {table} has {free} free seats, party needs {needed}")]
    NotEnoughSeats {
        table: TableId,
        free: usize,
        needed: usize,
    },

    #[error("Table {0} already has an order in the kitchen")]
    OrderInFlight(TableId),

    #[error("No ready order for table {0}")]
    NotReady(TableId),

    #[error("Party not found: {0}")]
    PartyNotFound(PartyId),

    #[error("Already escorting party {0}")]
    AlreadyEscorting(PartyId),

    #[error("No party is being escorted")]
    NotEscorting,

    #[error("Table {0} has nobody waiting on this")]
    NobodyWaiting(TableId),

    #[error("Hands are full")]
    HandsFull,

    #[error("Not carrying anything")]
    EmptyHands,
}

pub type Result<T> = std::result::Result<T, ServiceError>;
