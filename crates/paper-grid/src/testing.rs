use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use paper_types::models::{Coordinate, DecoType, MemberId, Message, MessageId};

use crate::store::{MessageStore, NewMessage, StoreError};

/// In-memory store that enforces `(owner, x, y)` uniqueness like the SQLite
/// schema does, with switches for simulating outages.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<MessageId, Message>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub seed_loads: AtomicUsize,
}

impl MemoryStore {
    /// Insert a row behind the service's back, as another process would.
    pub fn insert_foreign(&self, owner: MemberId, coord: Coordinate) -> MessageId {
        let id = MessageId::new();
        self.rows.lock().unwrap().insert(
            id,
            Message {
                id,
                owner_id: owner,
                x: coord.x,
                y: coord.y,
                deco_type: DecoType::Onion,
                anonymous_nickname: "other".into(),
                content: "placed elsewhere".into(),
                created_at: chrono::Utc::now(),
            },
        );
        id
    }

    pub fn count(&self, owner: MemberId) -> usize {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner_id == owner)
            .count()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("read failed").into());
        }
        Ok(())
    }
}

impl MessageStore for MemoryStore {
    fn create_message(&self, new: &NewMessage) -> Result<Message, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full").into());
        }
        let mut rows = self.rows.lock().unwrap();
        let taken = rows
            .values()
            .any(|m| m.owner_id == new.owner_id && m.coordinate() == new.coordinate);
        if taken {
            return Err(StoreError::SlotTaken(new.coordinate));
        }
        let message = Message {
            id: new.id,
            owner_id: new.owner_id,
            x: new.coordinate.x,
            y: new.coordinate.y,
            deco_type: new.deco_type,
            anonymous_nickname: new.anonymous_nickname.clone(),
            content: new.content.clone(),
            created_at: chrono::Utc::now(),
        };
        rows.insert(new.id, message.clone());
        Ok(message)
    }

    fn delete_message(&self, id: MessageId) -> Result<bool, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full").into());
        }
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        self.check_reads()?;
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    fn list_messages(&self, owner: MemberId) -> Result<Vec<Message>, StoreError> {
        self.check_reads()?;
        let mut messages: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner_id == owner)
            .cloned()
            .collect();
        messages.sort_by_key(Message::coordinate);
        Ok(messages)
    }

    fn occupied_slots(&self, owner: MemberId) -> Result<Vec<(Coordinate, MessageId)>, StoreError> {
        self.check_reads()?;
        self.seed_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner_id == owner)
            .map(|m| (m.coordinate(), m.id))
            .collect())
    }
}
