use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rodo_core::types::{ConversationStatus, MessageRole, RecordId};
use rusqlite::{params, types::Type, Connection};
use tracing::{debug, info, instrument};

use crate::db::{init_db, now_ts};
use crate::error::{Result, StoreError};
use crate::types::{Conversation, InventoryItem, Message, Producer, ResolvedProducer};

const PRODUCER_SELECT_SQL: &str = "SELECT id, phone, name, company, location, hectares,
        main_crops, created_at, updated_at
     FROM producers WHERE phone = ?1";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CONVERSATION_COLUMNS: &str = "id, producer_id, status, created_at, updated_at";

/// Persistence policy for producers, conversations and messages.
///
/// Every operation is resolve-or-create or append-only; nothing here
/// updates or deletes prior messages. Wraps a single SQLite connection in a
/// `Mutex`, which is enough for one gateway process.
pub struct ConversationStore {
    db: Mutex<Connection>,
}

impl ConversationStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Open (or create) the database file and run migrations.
    ///
    /// Several stores may share one file; writers wait on each other for up
    /// to `BUSY_TIMEOUT` instead of failing with SQLITE_BUSY.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(Self::new(conn))
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(Self::new(conn))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Trivial round-trip used by the health endpoint.
    pub fn ping(&self) -> Result<()> {
        let db = self.conn()?;
        db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ── Producers ─────────────────────────────────────────────────────────────

    /// Look a producer up by phone, creating an empty profile if absent.
    ///
    /// Inventory is loaded eagerly.
    #[instrument(skip(self))]
    pub fn resolve_producer(&self, phone: &str) -> Result<ResolvedProducer> {
        let db = self.conn()?;

        if let Some(producer) = find_producer(&db, phone)? {
            debug!(producer_id = %producer.id, "known producer");
            return Ok(ResolvedProducer::Known(producer));
        }

        let now = now_ts();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO producers (id, phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![RecordId::new().as_str(), phone, now],
        )?;

        // Read back: another connection may have won the insert.
        let producer = find_producer(&db, phone)?.ok_or_else(|| StoreError::NotFound {
            what: "producer",
            id: phone.to_string(),
        })?;

        if inserted == 1 {
            info!(producer_id = %producer.id, "new producer created");
            Ok(ResolvedProducer::NewlyCreated(producer))
        } else {
            Ok(ResolvedProducer::Known(producer))
        }
    }

    /// Fetch a producer by phone without creating one.
    pub fn get_producer(&self, phone: &str) -> Result<Option<Producer>> {
        let db = self.conn()?;
        find_producer(&db, phone)
    }

    // ── Conversations ─────────────────────────────────────────────────────────

    /// Return the producer's ACTIVE conversation, creating one if none exists.
    ///
    /// The partial unique index on `conversations` guarantees a single ACTIVE
    /// row per producer, so concurrent callers converge on the same id.
    #[instrument(skip(self))]
    pub fn resolve_active_conversation(&self, producer_id: &str) -> Result<Conversation> {
        let db = self.conn()?;

        if let Some(conversation) = find_active_conversation(&db, producer_id)? {
            debug!(conversation_id = %conversation.id, "active conversation found");
            return Ok(conversation);
        }

        let now = now_ts();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO conversations (id, producer_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                RecordId::new().as_str(),
                producer_id,
                ConversationStatus::Active.as_str(),
                now
            ],
        )?;

        let conversation =
            find_active_conversation(&db, producer_id)?.ok_or_else(|| StoreError::NotFound {
                what: "active conversation for producer",
                id: producer_id.to_string(),
            })?;

        if inserted == 1 {
            info!(conversation_id = %conversation.id, producer_id, "conversation opened");
        }
        Ok(conversation)
    }

    /// Number of conversations (any status) owned by a producer.
    pub fn conversation_count(&self, producer_id: &str) -> Result<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM conversations WHERE producer_id = ?1",
            params![producer_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    /// Append a message to a conversation. Never touches earlier rows.
    ///
    /// Bumps the conversation's `updated_at` so the most recently used
    /// conversation sorts first.
    #[instrument(skip(self, content))]
    pub fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let db = self.conn()?;
        let now = now_ts();

        let touched = db.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now, conversation_id],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound {
                what: "conversation",
                id: conversation_id.to_string(),
            });
        }

        db.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role.as_str(), content, now],
        )?;

        Ok(Message {
            id: db.last_insert_rowid(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// The `limit` most recent messages of a conversation, newest first.
    ///
    /// Callers rendering history must reverse the result.
    #[instrument(skip(self))]
    pub fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![conversation_id, limit as i64], row_to_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Total number of messages stored for a conversation.
    pub fn message_count(&self, conversation_id: &str) -> Result<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = self.conn()?;
        f(&db)
    }
}

fn find_producer(db: &Connection, phone: &str) -> Result<Option<Producer>> {
    let mut producer = match db.query_row(PRODUCER_SELECT_SQL, params![phone], row_to_producer) {
        Ok(p) => p,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(StoreError::Database(e)),
    };
    producer.inventory = load_inventory(db, &producer.id)?;
    Ok(Some(producer))
}

fn load_inventory(db: &Connection, producer_id: &str) -> Result<Vec<InventoryItem>> {
    let mut stmt = db.prepare(
        "SELECT id, crop, quantity, quality, harvest
         FROM inventory
         WHERE producer_id = ?1
         ORDER BY created_at, rowid",
    )?;
    let rows = stmt.query_map(params![producer_id], |row| {
        Ok(InventoryItem {
            id: row.get(0)?,
            crop: row.get(1)?,
            quantity: row.get(2)?,
            quality: row.get(3)?,
            harvest: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn find_active_conversation(db: &Connection, producer_id: &str) -> Result<Option<Conversation>> {
    let sql = format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations
         WHERE producer_id = ?1 AND status = 'ACTIVE'
         ORDER BY updated_at DESC, rowid DESC
         LIMIT 1"
    );
    match db.query_row(&sql, params![producer_id], row_to_conversation) {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e)),
    }
}

/// Map a producer row (column order from PRODUCER_SELECT_SQL). Inventory is
/// filled in by the caller.
fn row_to_producer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Producer> {
    let main_crops: Vec<String> = serde_json::from_str(&row.get::<_, String>(6)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(Producer {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        company: row.get(3)?,
        location: row.get(4)?,
        hectares: row.get(5)?,
        main_crops,
        inventory: Vec::new(),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let status = row
        .get::<_, String>(2)?
        .parse::<ConversationStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(Conversation {
        id: row.get(0)?,
        producer_id: row.get(1)?,
        status,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role = row
        .get::<_, String>(2)?
        .parse::<MessageRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
