use paper_types::models::{Coordinate, DecoType, MemberId, Message, MessageId};

/// A message ready to be written. The id is assigned before the slot is
/// claimed, so the store never invents one.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: MessageId,
    pub owner_id: MemberId,
    pub coordinate: Coordinate,
    pub deco_type: DecoType,
    pub anonymous_nickname: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend's own uniqueness check on `(owner_id, x, y)` fired.
    #[error("slot {0} is already taken")]
    SlotTaken(Coordinate),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for board messages.
pub trait MessageStore: Send + Sync {
    /// Write `new` and return it with its creation time stamped.
    fn create_message(&self, new: &NewMessage) -> Result<Message, StoreError>;

    /// Returns true if a row was deleted.
    fn delete_message(&self, id: MessageId) -> Result<bool, StoreError>;

    fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    /// All messages on a board, row-major.
    fn list_messages(&self, owner: MemberId) -> Result<Vec<Message>, StoreError>;

    fn occupied_slots(&self, owner: MemberId) -> Result<Vec<(Coordinate, MessageId)>, StoreError>;
}
