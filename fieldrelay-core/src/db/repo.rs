//! Event queue repository
//!
//! Durable, insertion-ordered storage for captured events. Producers append
//! concurrently; the relay worker reads the whole queue and later deletes
//! exactly the ids it managed to deliver.

use crate::error::Result;
use crate::types::{Event, Payload};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite keeps bound parameters under a fixed limit; stay well inside it
/// when expanding `IN (...)` lists.
const DELETE_CHUNK: usize = 500;

/// Handle to the event queue database (single connection)
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open or create the queue database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode so producer inserts don't block worker reads
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Insert one event, assigning its id and capture timestamp.
    pub fn insert(&self, source: &str, payload: &Payload) -> Result<Event> {
        let captured_at = Utc::now();
        let payload_json = serde_json::to_string(payload)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO events (source, payload, captured_at) VALUES (?1, ?2, ?3)",
            params![source, payload_json, captured_at.to_rfc3339()],
        )?;

        Ok(Event {
            id: conn.last_insert_rowid(),
            source: source.to_string(),
            payload: payload.clone(),
            captured_at,
        })
    }

    /// Best-effort producer path: insert, or log and drop on storage failure.
    ///
    /// Capture is opportunistic; a failed insert must never take the
    /// producer down with it.
    pub fn capture(&self, source: &str, payload: Payload) -> Option<Event> {
        match self.insert(source, &payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(source, error = %e, "Dropping event: insert failed");
                None
            }
        }
    }

    /// Return every queued event, oldest first.
    pub fn list_all(&self) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, source, payload, captured_at FROM events ORDER BY id ASC")?;

        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }

    /// Delete exactly the named events. Absent ids are a no-op, not an error.
    ///
    /// Returns the number of rows actually deleted. The id list is explicit
    /// on purpose: events inserted after the caller's read keep their rows.
    pub fn delete_by_ids(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock().unwrap();
        let mut deleted = 0;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM events WHERE id IN ({})", placeholders);
            let mut stmt = conn.prepare(&sql)?;
            deleted += stmt.execute(rusqlite::params_from_iter(chunk.iter()))?;
        }

        Ok(deleted)
    }

    /// Number of events currently queued.
    pub fn pending_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Remove every queued event. Returns the number of rows deleted.
    pub fn purge_all(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM events", [])?;
        Ok(deleted)
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
        let payload_str: String = row.get("payload")?;
        let captured_at_str: String = row.get("captured_at")?;

        Ok(Event {
            id: row.get("id")?,
            source: row.get("source")?,
            // A corrupt payload row degrades to an empty map rather than
            // wedging the whole queue.
            payload: serde_json::from_str(&payload_str).unwrap_or_default(),
            captured_at: DateTime::parse_from_rfc3339(&captured_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore").finish_non_exhaustive()
    }
}
