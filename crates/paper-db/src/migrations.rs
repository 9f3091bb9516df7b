use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (messages)");
        conn.execute_batch(
            "
            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                owner_id            INTEGER NOT NULL,
                x                   INTEGER NOT NULL CHECK (x BETWEEN 0 AND 11),
                y                   INTEGER NOT NULL CHECK (y BETWEEN 0 AND 9),
                deco_type           TEXT NOT NULL,
                anonymous_nickname  TEXT NOT NULL,
                content             TEXT NOT NULL,
                created_at          TEXT NOT NULL,
                UNIQUE (owner_id, x, y)
            );

            CREATE INDEX idx_messages_owner
                ON messages(owner_id, y, x);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
