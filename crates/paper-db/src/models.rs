//! Database row types. These map directly to SQLite rows and are converted
//! to `paper_types` models at the store boundary.
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use paper_types::models::{DecoType, MemberId, Message, MessageId};
use uuid::Uuid;

pub struct MessageRow {
    pub id: String,
    pub owner_id: i64,
    pub x: u8,
    pub y: u8,
    pub deco_type: String,
    pub anonymous_nickname: String,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        let id: Uuid = self.id.parse()?;
        let deco_type = DecoType::parse(&self.deco_type)
            .ok_or_else(|| anyhow!("Unknown deco type {:?} on message {}", self.deco_type, id))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc);

        Ok(Message {
            id: MessageId(id),
            owner_id: MemberId(self.owner_id),
            x: self.x,
            y: self.y,
            deco_type,
            anonymous_nickname: self.anonymous_nickname,
            content: self.content,
            created_at,
        })
    }
}
