use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Result};

/// Initialise every table owned by the store.
///
/// Safe to call on every startup: `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_producers_table(conn)?;
    create_inventory_table(conn)?;
    create_conversations_table(conn)?;
    create_messages_table(conn)?;
    create_market_data_table(conn)?;
    Ok(())
}

fn create_producers_table(conn: &Connection) -> Result<()> {
    // UNIQUE(phone) makes resolve-or-create converge under concurrent inserts.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS producers (
            id          TEXT PRIMARY KEY NOT NULL,
            phone       TEXT NOT NULL UNIQUE,
            name        TEXT,
            company     TEXT,
            location    TEXT,
            hectares    REAL,
            main_crops  TEXT NOT NULL DEFAULT '[]',  -- JSON array
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )
}

fn create_inventory_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS inventory (
            id          TEXT PRIMARY KEY NOT NULL,
            producer_id TEXT NOT NULL REFERENCES producers(id) ON DELETE CASCADE,
            crop        TEXT NOT NULL,
            quantity    REAL NOT NULL,
            quality     TEXT,
            harvest     TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_inventory_producer
            ON inventory(producer_id, created_at);",
    )
}

/// At most one ACTIVE conversation per producer, enforced by a partial
/// unique index rather than by the caller.
fn create_conversations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY NOT NULL,
            producer_id TEXT NOT NULL REFERENCES producers(id) ON DELETE CASCADE,
            status      TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_producer
            ON conversations(producer_id, status, updated_at DESC);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_one_active
            ON conversations(producer_id) WHERE status = 'ACTIVE';",
    )
}

/// Append-only log. The autoincrement id is the ordering key; two rows
/// written in the same millisecond still sort in insertion order.
fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            role            TEXT NOT NULL,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, id DESC);",
    )
}

fn create_market_data_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS market_data (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            crop        TEXT NOT NULL,
            market      TEXT NOT NULL,
            kind        TEXT NOT NULL DEFAULT 'spot',
            position    TEXT,
            price       REAL NOT NULL,
            currency    TEXT NOT NULL DEFAULT 'USD',
            date        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_market_data_date
            ON market_data(date DESC);",
    )
}

/// Canonical timestamp format for every TEXT time column.
///
/// Fixed width with millisecond precision so lexical order equals time order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_ts() -> String {
    format_ts(Utc::now())
}
