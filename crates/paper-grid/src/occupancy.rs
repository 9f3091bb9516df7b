use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use paper_types::models::{Coordinate, MemberId, MessageId};

/// Which slots are taken on each board.
///
/// Boards are independent: each owner gets its own mutex, and the outer map
/// is only write-locked to create a board entry. `try_insert` is the single
/// point where two writers racing for one slot are ordered.
#[derive(Default)]
pub struct OccupancyIndex {
    boards: RwLock<HashMap<MemberId, Arc<Mutex<BoardSlots>>>>,
}

#[derive(Default)]
struct BoardSlots {
    /// Set once the board has been loaded from persistence.
    seeded: bool,
    slots: BTreeMap<Coordinate, MessageId>,
}

impl OccupancyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `coord` for `message_id` if nobody holds it. Returns false if taken.
    pub fn try_insert(&self, owner: MemberId, coord: Coordinate, message_id: MessageId) -> bool {
        let board = self.board(owner);
        let mut board = lock(&board);
        if board.slots.contains_key(&coord) {
            return false;
        }
        board.slots.insert(coord, message_id);
        true
    }

    pub fn is_occupied(&self, owner: MemberId, coord: Coordinate) -> bool {
        self.existing_board(owner)
            .is_some_and(|board| lock(&board).slots.contains_key(&coord))
    }

    /// Free `coord` unconditionally. Returns the message that held it.
    pub fn remove(&self, owner: MemberId, coord: Coordinate) -> Option<MessageId> {
        let board = self.existing_board(owner)?;
        let mut board = lock(&board);
        board.slots.remove(&coord)
    }

    /// Free `coord` only if it is still held by `message_id`.
    pub fn release(&self, owner: MemberId, coord: Coordinate, message_id: MessageId) -> bool {
        let Some(board) = self.existing_board(owner) else {
            return false;
        };
        let mut board = lock(&board);
        if board.slots.get(&coord) == Some(&message_id) {
            board.slots.remove(&coord);
            true
        } else {
            false
        }
    }

    /// Point-in-time copy of the taken slots. May be stale by the time it is read.
    pub fn occupied_set(&self, owner: MemberId) -> BTreeSet<Coordinate> {
        self.existing_board(owner)
            .map(|board| lock(&board).slots.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn occupied_count(&self, owner: MemberId) -> usize {
        self.existing_board(owner)
            .map_or(0, |board| lock(&board).slots.len())
    }

    /// Load a board from persistence the first time it is needed.
    ///
    /// `load` runs under the board's lock, so no insert on this owner can
    /// interleave with seeding. Returns `Ok(false)` if the board was already
    /// seeded; `load` is not called in that case. On error the board stays
    /// unseeded, is dropped if nothing else holds it, and the next call retries.
    pub fn seed_with<F, E>(&self, owner: MemberId, load: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Vec<(Coordinate, MessageId)>, E>,
    {
        let result = {
            let board = self.board(owner);
            let mut board = lock(&board);
            if board.seeded {
                return Ok(false);
            }
            load().map(|entries| {
                absorb(&mut board, entries);
                board.seeded = true;
                true
            })
        };
        if result.is_err() {
            self.evict_if_idle(owner);
        }
        result
    }

    /// Reload a board's taken slots from persistence and record any this
    /// index is missing. Slots already held are left alone.
    ///
    /// `load` runs under the board's lock, so a concurrent `release` is
    /// ordered entirely before or after it and a freed slot cannot be brought
    /// back from a stale read. Returns how many slots were added.
    pub fn resync_with<F, E>(&self, owner: MemberId, load: F) -> Result<usize, E>
    where
        F: FnOnce() -> Result<Vec<(Coordinate, MessageId)>, E>,
    {
        let board = self.board(owner);
        let mut board = lock(&board);
        let entries = load()?;
        Ok(absorb(&mut board, entries))
    }

    /// True if this index holds an entry for `owner`'s board.
    pub fn is_tracked(&self, owner: MemberId) -> bool {
        self.existing_board(owner).is_some()
    }

    /// Number of boards with an entry in the index.
    pub fn tracked_boards(&self) -> usize {
        self.boards.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop `owner`'s board if it holds no slots and no caller is using it.
    /// The next touch reloads it from persistence.
    pub fn evict_if_idle(&self, owner: MemberId) -> bool {
        let mut boards = self.boards.write().unwrap_or_else(PoisonError::into_inner);
        // Handles are only cloned under the read lock, so with the write lock
        // held a count of one means the map owns the only handle.
        let idle = boards
            .get(&owner)
            .is_some_and(|board| Arc::strong_count(board) == 1 && lock(board).slots.is_empty());
        if idle {
            boards.remove(&owner);
        }
        idle
    }

    fn board(&self, owner: MemberId) -> Arc<Mutex<BoardSlots>> {
        if let Some(board) = self.existing_board(owner) {
            return board;
        }
        let mut boards = self.boards.write().unwrap_or_else(PoisonError::into_inner);
        boards.entry(owner).or_default().clone()
    }

    fn existing_board(&self, owner: MemberId) -> Option<Arc<Mutex<BoardSlots>>> {
        let boards = self.boards.read().unwrap_or_else(PoisonError::into_inner);
        boards.get(&owner).cloned()
    }
}

fn absorb(board: &mut BoardSlots, entries: Vec<(Coordinate, MessageId)>) -> usize {
    let mut added = 0;
    for (coord, id) in entries {
        if let std::collections::btree_map::Entry::Vacant(slot) = board.slots.entry(coord) {
            slot.insert(id);
            added += 1;
        }
    }
    added
}

// Critical sections are single map operations, so a poisoned lock still
// guards a consistent map.
fn lock(board: &Mutex<BoardSlots>) -> MutexGuard<'_, BoardSlots> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}
