use std::fmt;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use paper_types::api::PlaceMessageRequest;
use paper_types::models::{Coordinate, DecoType, MemberId, Message, MessageId};

use crate::bounds::{self, OutOfBounds};
use crate::nearest::{DEFAULT_SUGGESTION_LIMIT, nearest_free};
use crate::occupancy::OccupancyIndex;
use crate::store::{MessageStore, NewMessage, StoreError};

pub const CONTENT_MAX_CHARS: usize = 255;
pub const NICKNAME_MAX_CHARS: usize = 8;

#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub x: i64,
    pub y: i64,
    pub content: String,
    pub anonymous_nickname: String,
    pub deco_type: DecoType,
}

impl From<PlaceMessageRequest> for PlacementRequest {
    fn from(req: PlaceMessageRequest) -> Self {
        Self {
            x: req.x,
            y: req.y,
            content: req.content,
            anonymous_nickname: req.anonymous_nickname,
            deco_type: req.deco_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Content,
    AnonymousNickname,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::AnonymousNickname => "anonymous_nickname",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every outcome of a placement the caller is expected to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementResult {
    Placed(Message),
    /// The slot is taken. Suggestions may be empty if the board is full.
    Conflict { suggestions: Vec<Coordinate> },
    OutOfBounds(OutOfBounds),
    ValidationError { field: Field, reason: String },
}

/// The message store failed. Not retried here.
#[derive(Debug, thiserror::Error)]
#[error("message store unavailable: {0}")]
pub struct Unavailable(#[from] anyhow::Error);

impl From<StoreError> for Unavailable {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(e) => Self(e),
            StoreError::SlotTaken(coord) => Self(anyhow!("unexpected slot conflict at {coord}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    Removed(Message),
    NotFound,
    /// Only the board owner may delete from it.
    Forbidden,
}

/// Places messages on boards and keeps occupancy in step with the store.
///
/// Placement reserves the slot in the index first and only then writes the
/// message; a failed write releases the reservation. While a write is in
/// flight the slot already reads as occupied, so a racing request gets a
/// conflict rather than a second row.
pub struct PlacementService<S> {
    store: S,
    occupancy: OccupancyIndex,
}

impl<S: MessageStore> PlacementService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            occupancy: OccupancyIndex::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    pub fn place(
        &self,
        owner: MemberId,
        req: PlacementRequest,
    ) -> Result<PlacementResult, Unavailable> {
        if let Some(invalid) = validate_fields(&req) {
            return Ok(invalid);
        }

        let coord = match bounds::validate(req.x, req.y) {
            Ok(coord) => coord,
            Err(oob) => return Ok(PlacementResult::OutOfBounds(oob)),
        };

        self.ensure_seeded(owner)?;

        let id = MessageId::new();
        if !self.occupancy.try_insert(owner, coord, id) {
            debug!("Board {} slot {} taken", owner, coord);
            return Ok(self.conflict(owner, coord));
        }

        let new = NewMessage {
            id,
            owner_id: owner,
            coordinate: coord,
            deco_type: req.deco_type,
            anonymous_nickname: req.anonymous_nickname,
            content: req.content,
        };

        match self.store.create_message(&new) {
            Ok(message) => {
                debug!("Placed message {} on board {} at {}", id, owner, coord);
                Ok(PlacementResult::Placed(message))
            }
            Err(StoreError::SlotTaken(_)) => {
                // Someone outside this index got there first. Pick up what
                // the store knows so suggestions skip it.
                self.occupancy.release(owner, coord, id);
                warn!("Store rejected board {} slot {} as taken", owner, coord);
                self.occupancy
                    .resync_with(owner, || self.store.occupied_slots(owner))?;
                Ok(self.conflict(owner, coord))
            }
            Err(StoreError::Backend(e)) => {
                self.occupancy.release(owner, coord, id);
                self.occupancy.evict_if_idle(owner);
                error!("Failed to store message on board {}: {:#}", owner, e);
                Err(Unavailable(e))
            }
        }
    }

    /// Delete a message on behalf of `requester` and free its slot.
    pub fn remove(
        &self,
        owner: MemberId,
        requester: MemberId,
        id: MessageId,
    ) -> Result<RemoveOutcome, Unavailable> {
        if requester != owner {
            warn!("Member {} tried to delete from board {}", requester, owner);
            return Ok(RemoveOutcome::Forbidden);
        }

        let message = match self.store.get_message(id)? {
            Some(message) if message.owner_id == owner => message,
            _ => return Ok(RemoveOutcome::NotFound),
        };

        self.ensure_seeded(owner)?;

        if !self.store.delete_message(id)? {
            return Ok(RemoveOutcome::NotFound);
        }

        self.occupancy.release(owner, message.coordinate(), id);
        self.occupancy.evict_if_idle(owner);
        debug!("Removed message {} from board {}", id, owner);
        Ok(RemoveOutcome::Removed(message))
    }

    /// Nearest free slots around `target`, for callers that want to offer
    /// alternatives before submitting.
    ///
    /// Read-only: a board the index is not tracking is read straight from
    /// the store and is not added to the index.
    pub fn suggest(
        &self,
        owner: MemberId,
        target: Coordinate,
        limit: usize,
    ) -> Result<Vec<Coordinate>, Unavailable> {
        let occupied = if self.occupancy.is_tracked(owner) {
            self.ensure_seeded(owner)?;
            self.occupancy.occupied_set(owner)
        } else {
            self.store
                .occupied_slots(owner)?
                .into_iter()
                .map(|(coord, _)| coord)
                .collect()
        };
        Ok(nearest_free(target, &occupied, limit))
    }

    fn conflict(&self, owner: MemberId, coord: Coordinate) -> PlacementResult {
        let occupied = self.occupancy.occupied_set(owner);
        PlacementResult::Conflict {
            suggestions: nearest_free(coord, &occupied, DEFAULT_SUGGESTION_LIMIT),
        }
    }

    fn ensure_seeded(&self, owner: MemberId) -> Result<(), Unavailable> {
        let seeded = self
            .occupancy
            .seed_with(owner, || self.store.occupied_slots(owner))?;
        if seeded {
            info!(
                "Loaded board {} ({} slots taken)",
                owner,
                self.occupancy.occupied_count(owner)
            );
        }
        Ok(())
    }
}

/// Content is checked before the nickname.
fn validate_fields(req: &PlacementRequest) -> Option<PlacementResult> {
    check_length(Field::Content, &req.content, CONTENT_MAX_CHARS).or_else(|| {
        check_length(
            Field::AnonymousNickname,
            &req.anonymous_nickname,
            NICKNAME_MAX_CHARS,
        )
    })
}

fn check_length(field: Field, value: &str, max: usize) -> Option<PlacementResult> {
    let reason = if value.is_empty() {
        format!("{field} must not be empty")
    } else if value.chars().count() > max {
        format!("{field} must be at most {max} characters")
    } else {
        return None;
    };
    Some(PlacementResult::ValidationError { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Axis, BOARD_CELLS, all_coordinates};
    use crate::testing::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Barrier, Mutex, mpsc};
    use std::time::Duration;

    const OWNER: MemberId = MemberId(7);

    fn request(x: i64, y: i64) -> PlacementRequest {
        PlacementRequest {
            x,
            y,
            content: "hi".into(),
            anonymous_nickname: "friend".into(),
            deco_type: DecoType::Potato,
        }
    }

    fn service() -> PlacementService<MemoryStore> {
        PlacementService::new(MemoryStore::default())
    }

    fn placed(result: PlacementResult) -> Message {
        match result {
            PlacementResult::Placed(message) => message,
            other => panic!("expected Placed, got {other:?}"),
        }
    }

    fn suggestions(result: PlacementResult) -> Vec<Coordinate> {
        match result {
            PlacementResult::Conflict { suggestions } => suggestions,
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn places_on_an_empty_board() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(0, 0)).unwrap());
        assert_eq!(message.owner_id, OWNER);
        assert_eq!(message.coordinate(), Coordinate::new(0, 0));
        assert_eq!(message.content, "hi");
        assert!(svc.occupancy().is_occupied(OWNER, Coordinate::new(0, 0)));
        assert_eq!(svc.store().count(OWNER), 1);
    }

    #[test]
    fn second_placement_on_same_slot_conflicts() {
        let svc = service();
        placed(svc.place(OWNER, request(0, 0)).unwrap());

        let got = suggestions(svc.place(OWNER, request(0, 0)).unwrap());
        assert_eq!(
            got,
            vec![Coordinate::new(1, 0), Coordinate::new(0, 1), Coordinate::new(1, 1)]
        );
        assert_eq!(svc.occupancy().occupied_count(OWNER), 1);
        assert_eq!(svc.store().count(OWNER), 1);
    }

    #[test]
    fn out_of_bounds_x() {
        let svc = service();
        match svc.place(OWNER, request(12, 0)).unwrap() {
            PlacementResult::OutOfBounds(oob) => {
                assert_eq!(oob.axis, Axis::X);
                assert_eq!((oob.min, oob.max), (0, 11));
            }
            other => panic!("expected OutOfBounds, got {other:?}"),
        }
        assert_eq!(svc.store().count(OWNER), 0);
    }

    #[test]
    fn content_is_validated_before_nickname_and_bounds() {
        let svc = service();
        let mut req = request(99, 99);
        req.content = String::new();
        req.anonymous_nickname = String::new();
        match svc.place(OWNER, req).unwrap() {
            PlacementResult::ValidationError { field, reason } => {
                assert_eq!(field, Field::Content);
                assert_eq!(reason, "content must not be empty");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn length_limits_count_characters() {
        let svc = service();

        let mut req = request(0, 0);
        req.anonymous_nickname = "익명의친구입니다".into();
        placed(svc.place(OWNER, req).unwrap());

        let mut req = request(1, 0);
        req.anonymous_nickname = "123456789".into();
        assert_eq!(
            svc.place(OWNER, req).unwrap(),
            PlacementResult::ValidationError {
                field: Field::AnonymousNickname,
                reason: "anonymous_nickname must be at most 8 characters".into(),
            }
        );

        let mut req = request(1, 0);
        req.content = "가".repeat(CONTENT_MAX_CHARS);
        placed(svc.place(OWNER, req).unwrap());

        let mut req = request(2, 0);
        req.content = "a".repeat(CONTENT_MAX_CHARS + 1);
        assert!(matches!(
            svc.place(OWNER, req).unwrap(),
            PlacementResult::ValidationError { field: Field::Content, .. }
        ));
    }

    #[test]
    fn last_free_slot_then_full_board() {
        let svc = service();
        let last = Coordinate::new(7, 4);
        for c in all_coordinates().filter(|c| *c != last) {
            placed(svc.place(OWNER, request(c.x.into(), c.y.into())).unwrap());
        }
        assert_eq!(svc.occupancy().occupied_count(OWNER), BOARD_CELLS - 1);

        placed(svc.place(OWNER, request(7, 4)).unwrap());
        for (x, y) in [(0, 0), (7, 4), (11, 9)] {
            assert!(suggestions(svc.place(OWNER, request(x, y)).unwrap()).is_empty());
        }
        assert_eq!(svc.store().count(OWNER), BOARD_CELLS);
    }

    #[test]
    fn store_failure_releases_the_reservation() {
        let svc = service();
        svc.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(svc.place(OWNER, request(3, 3)).is_err());
        assert!(!svc.occupancy().is_occupied(OWNER, Coordinate::new(3, 3)));

        svc.store().fail_writes.store(false, Ordering::SeqCst);
        placed(svc.place(OWNER, request(3, 3)).unwrap());
    }

    #[test]
    fn store_uniqueness_backstop_becomes_conflict() {
        let svc = service();
        // Load the board before another writer sneaks a row in.
        placed(svc.place(OWNER, request(0, 0)).unwrap());
        svc.store().insert_foreign(OWNER, Coordinate::new(5, 5));
        svc.store().insert_foreign(OWNER, Coordinate::new(6, 5));

        let got = suggestions(svc.place(OWNER, request(5, 5)).unwrap());
        assert!(!got.contains(&Coordinate::new(6, 5)));
        assert_eq!(
            got,
            vec![Coordinate::new(5, 4), Coordinate::new(4, 5), Coordinate::new(5, 6)]
        );
        assert!(svc.occupancy().is_occupied(OWNER, Coordinate::new(5, 5)));
    }

    #[test]
    fn occupancy_is_loaded_from_the_store_once() {
        let store = MemoryStore::default();
        store.insert_foreign(OWNER, Coordinate::new(2, 2));
        let svc = PlacementService::new(store);

        suggestions(svc.place(OWNER, request(2, 2)).unwrap());
        placed(svc.place(OWNER, request(2, 3)).unwrap());
        assert_eq!(svc.store().seed_loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seed_failure_is_unavailable() {
        let svc = service();
        svc.store().fail_reads.store(true, Ordering::SeqCst);
        assert!(svc.place(OWNER, request(0, 0)).is_err());
        assert_eq!(svc.occupancy().occupied_count(OWNER), 0);
        assert_eq!(svc.occupancy().tracked_boards(), 0);
    }

    #[test]
    fn whitespace_only_text_has_length() {
        let svc = service();
        let mut req = request(0, 0);
        req.content = " ".into();
        req.anonymous_nickname = "  ".into();
        let message = placed(svc.place(OWNER, req).unwrap());
        assert_eq!(message.content, " ");
    }

    #[test]
    fn read_only_lookups_do_not_track_boards() {
        let svc = service();
        for owner in 1000..1200 {
            let got = svc.suggest(MemberId(owner), Coordinate::new(0, 0), 3).unwrap();
            assert_eq!(got.len(), 3);
            let outcome = svc.remove(MemberId(owner), MemberId(owner), MessageId::new());
            assert_eq!(outcome.unwrap(), RemoveOutcome::NotFound);
        }
        assert_eq!(svc.occupancy().tracked_boards(), 0);
    }

    #[test]
    fn suggest_on_untracked_board_reads_the_store() {
        let svc = service();
        svc.store().insert_foreign(OWNER, Coordinate::new(1, 0));
        let got = svc.suggest(OWNER, Coordinate::new(0, 0), 2).unwrap();
        assert_eq!(got, vec![Coordinate::new(0, 1), Coordinate::new(1, 1)]);
        assert!(!svc.occupancy().is_tracked(OWNER));
    }

    #[test]
    fn failed_writes_do_not_pile_up_boards() {
        let svc = service();
        svc.store().fail_writes.store(true, Ordering::SeqCst);
        for owner in 0..100 {
            assert!(svc.place(MemberId(owner), request(0, 0)).is_err());
        }
        assert_eq!(svc.occupancy().tracked_boards(), 0);
    }

    #[test]
    fn removing_the_last_message_untracks_the_board() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(2, 2)).unwrap());
        assert!(svc.occupancy().is_tracked(OWNER));
        svc.remove(OWNER, OWNER, message.id).unwrap();
        assert!(!svc.occupancy().is_tracked(OWNER));

        // Reloaded from the store on next use.
        svc.store().insert_foreign(OWNER, Coordinate::new(3, 3));
        suggestions(svc.place(OWNER, request(3, 3)).unwrap());
    }

    /// Wraps `MemoryStore` and, once armed, holds the next `occupied_slots`
    /// call open after it has read its rows.
    struct PausingStore {
        inner: MemoryStore,
        armed: AtomicBool,
        loaded: Mutex<mpsc::Sender<()>>,
        resume: Mutex<mpsc::Receiver<()>>,
    }

    impl MessageStore for PausingStore {
        fn create_message(&self, new: &NewMessage) -> Result<Message, StoreError> {
            self.inner.create_message(new)
        }

        fn delete_message(&self, id: MessageId) -> Result<bool, StoreError> {
            self.inner.delete_message(id)
        }

        fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
            self.inner.get_message(id)
        }

        fn list_messages(&self, owner: MemberId) -> Result<Vec<Message>, StoreError> {
            self.inner.list_messages(owner)
        }

        fn occupied_slots(
            &self,
            owner: MemberId,
        ) -> Result<Vec<(Coordinate, MessageId)>, StoreError> {
            let slots = self.inner.occupied_slots(owner)?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.loaded.lock().unwrap().send(()).unwrap();
                let _ = self
                    .resume
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_millis(300));
            }
            Ok(slots)
        }
    }

    #[test]
    fn delete_during_conflict_reload_does_not_resurrect_the_slot() {
        let (loaded_tx, loaded_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        let svc = PlacementService::new(PausingStore {
            inner: MemoryStore::default(),
            armed: AtomicBool::new(false),
            loaded: Mutex::new(loaded_tx),
            resume: Mutex::new(resume_rx),
        });

        let first = placed(svc.place(OWNER, request(0, 0)).unwrap());
        svc.store().inner.insert_foreign(OWNER, Coordinate::new(5, 5));
        svc.store().armed.store(true, Ordering::SeqCst);

        std::thread::scope(|s| {
            // The store rejects (5,5) and the board is reloaded from it.
            let conflicting = s.spawn(|| svc.place(OWNER, request(5, 5)).unwrap());
            loaded_rx.recv().unwrap();

            // The owner deletes (0,0) while that reload is in flight.
            let removal = s.spawn(|| svc.remove(OWNER, OWNER, first.id).unwrap());
            assert_eq!(removal.join().unwrap(), RemoveOutcome::Removed(first.clone()));
            let _ = resume_tx.send(());

            suggestions(conflicting.join().unwrap());
        });

        assert!(svc.store().get_message(first.id).unwrap().is_none());
        assert!(!svc.occupancy().is_occupied(OWNER, Coordinate::new(0, 0)));
        placed(svc.place(OWNER, request(0, 0)).unwrap());
    }

    #[test]
    fn owner_can_remove_and_slot_is_reusable() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(4, 4)).unwrap());

        let outcome = svc.remove(OWNER, OWNER, message.id).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed(message.clone()));
        assert!(!svc.occupancy().is_occupied(OWNER, Coordinate::new(4, 4)));
        assert_eq!(svc.remove(OWNER, OWNER, message.id).unwrap(), RemoveOutcome::NotFound);

        placed(svc.place(OWNER, request(4, 4)).unwrap());
    }

    #[test]
    fn only_the_owner_may_remove() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(4, 4)).unwrap());
        assert_eq!(
            svc.remove(OWNER, MemberId(8), message.id).unwrap(),
            RemoveOutcome::Forbidden
        );
        assert!(svc.occupancy().is_occupied(OWNER, Coordinate::new(4, 4)));
    }

    #[test]
    fn cannot_remove_through_another_board() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(4, 4)).unwrap());
        let other = MemberId(8);
        assert_eq!(svc.remove(other, other, message.id).unwrap(), RemoveOutcome::NotFound);
        assert_eq!(svc.store().count(OWNER), 1);
    }

    #[test]
    fn failed_delete_keeps_the_slot() {
        let svc = service();
        let message = placed(svc.place(OWNER, request(4, 4)).unwrap());
        svc.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(svc.remove(OWNER, OWNER, message.id).is_err());
        assert!(svc.occupancy().is_occupied(OWNER, Coordinate::new(4, 4)));
    }

    #[test]
    fn suggest_excludes_target_and_taken_slots() {
        let svc = service();
        placed(svc.place(OWNER, request(1, 0)).unwrap());
        let got = svc.suggest(OWNER, Coordinate::new(0, 0), 2).unwrap();
        assert_eq!(got, vec![Coordinate::new(0, 1), Coordinate::new(1, 1)]);
    }

    #[test]
    fn concurrent_placements_on_one_slot_have_one_winner() {
        const WRITERS: usize = 24;
        let svc = service();
        let barrier = Barrier::new(WRITERS);

        let results: Vec<PlacementResult> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        svc.place(OWNER, request(6, 6)).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = results
            .iter()
            .filter(|r| matches!(r, PlacementResult::Placed(_)))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, PlacementResult::Conflict { .. }))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, WRITERS - 1);
        assert_eq!(svc.store().count(OWNER), 1);
    }

    #[test]
    fn concurrent_placements_across_slots_never_share_one() {
        let svc = service();
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for t in 0..8 {
                let svc = &svc;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..30 {
                        let slot = (t * 7 + i * 5) % BOARD_CELLS;
                        let (x, y) = ((slot % 12) as i64, (slot / 12) as i64);
                        svc.place(OWNER, request(x, y)).unwrap();
                    }
                });
            }
        });

        let messages = svc.store().list_messages(OWNER).unwrap();
        let mut coords: Vec<_> = messages.iter().map(Message::coordinate).collect();
        let total = coords.len();
        coords.sort();
        coords.dedup();
        assert_eq!(coords.len(), total);
        assert_eq!(svc.occupancy().occupied_count(OWNER), total);
    }
}
