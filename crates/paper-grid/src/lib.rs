//! Grid placement for rolling-paper boards.
//!
//! Every board is a fixed 12x10 grid of slots owned by one member. A slot holds
//! at most one message. [`PlacementService`] is the entry point: it validates a
//! request, claims the slot in the [`OccupancyIndex`] and persists the message
//! through a [`MessageStore`]. When the slot is taken it answers with the
//! nearest free slots instead.

pub mod bounds;
pub mod coords;
pub mod nearest;
pub mod occupancy;
pub mod placement;
pub mod store;

#[cfg(test)]
mod testing;

pub use bounds::{Axis, BOARD_HEIGHT, BOARD_WIDTH, OutOfBounds};
pub use occupancy::OccupancyIndex;
pub use placement::{
    Field, PlacementRequest, PlacementResult, PlacementService, RemoveOutcome, Unavailable,
};
pub use store::{MessageStore, NewMessage, StoreError};
