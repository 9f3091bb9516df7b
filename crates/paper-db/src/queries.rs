use crate::Database;
use crate::models::MessageRow;
use anyhow::Result;
use paper_grid::{MessageStore, NewMessage, StoreError};
use paper_types::models::{Coordinate, MemberId, Message, MessageId};
use rusqlite::{Connection, ErrorCode, Row};
use tracing::error;

const MESSAGE_COLUMNS: &str =
    "id, owner_id, x, y, deco_type, anonymous_nickname, content, created_at";

impl Database {
    // -- Messages --

    pub fn insert_message(&self, new: &NewMessage, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                    (id, owner_id, x, y, deco_type, anonymous_nickname, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    new.id.to_string(),
                    new.owner_id.0,
                    new.coordinate.x,
                    new.coordinate.y,
                    new.deco_type.as_str(),
                    new.anonymous_nickname,
                    new.content,
                    created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_message_row(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn get_board_rows(&self, owner_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_board(conn, owner_id))
    }

    pub fn delete_message_row(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    pub fn get_board_slots(&self, owner_id: i64) -> Result<Vec<(u8, u8, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT x, y, id FROM messages WHERE owner_id = ?1")?;
            let rows = stmt
                .query_map([owner_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

impl MessageStore for Database {
    fn create_message(&self, new: &NewMessage) -> Result<Message, StoreError> {
        let created_at = chrono::Utc::now();
        let stamp = created_at.to_rfc3339();

        if let Err(e) = self.insert_message(new, &stamp) {
            if is_unique_violation(&e) {
                return Err(StoreError::SlotTaken(new.coordinate));
            }
            error!("Failed to insert message {}: {:#}", new.id, e);
            return Err(e.into());
        }

        Ok(Message {
            id: new.id,
            owner_id: new.owner_id,
            x: new.coordinate.x,
            y: new.coordinate.y,
            deco_type: new.deco_type,
            anonymous_nickname: new.anonymous_nickname.clone(),
            content: new.content.clone(),
            created_at,
        })
    }

    fn delete_message(&self, id: MessageId) -> Result<bool, StoreError> {
        Ok(self.delete_message_row(&id.to_string())?)
    }

    fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        let row = self.get_message_row(&id.to_string())?;
        Ok(row.map(MessageRow::into_message).transpose()?)
    }

    fn list_messages(&self, owner: MemberId) -> Result<Vec<Message>, StoreError> {
        let rows = self.get_board_rows(owner.0)?;
        let messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<Result<Vec<_>>>()?;
        Ok(messages)
    }

    fn occupied_slots(&self, owner: MemberId) -> Result<Vec<(Coordinate, MessageId)>, StoreError> {
        let slots = self
            .get_board_slots(owner.0)?
            .into_iter()
            .map(|(x, y, id)| -> Result<(Coordinate, MessageId)> {
                Ok((Coordinate::new(x, y), MessageId(id.parse()?)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(slots)
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?;

    let row = stmt.query_row([id], message_row).optional()?;

    Ok(row)
}

fn query_board(conn: &Connection, owner_id: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE owner_id = ?1 ORDER BY y, x"
    ))?;

    let rows = stmt
        .query_map([owner_id], message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        x: row.get(2)?,
        y: row.get(3)?,
        deco_type: row.get(4)?,
        anonymous_nickname: row.get(5)?,
        content: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
