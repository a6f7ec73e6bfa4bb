//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `emotion_records`: append-only emotion history, one row per report.
//! - `virtue_entries`: emotion → virtue reference data, unique by name.
//! - `symbolic_triggers`: every detected pattern.
//! - `knowledge_base`: free-text facts used to enrich reply prompts.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloelia::{
    ActionType, EmotionRecord, NewEmotionRecord, NewTrigger, SymbolicTrigger, VirtueEntry,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS emotion_records (
    record_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id             INTEGER NOT NULL,
    emotion             TEXT NOT NULL,
    context_note        TEXT,
    microexpression_img TEXT,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_emotion_records_user ON emotion_records(user_id, record_id);

CREATE TABLE IF NOT EXISTS virtue_entries (
    virtue_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL UNIQUE,
    emotion_link TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_virtue_entries_link ON virtue_entries(emotion_link);

CREATE TABLE IF NOT EXISTS symbolic_triggers (
    trigger_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL,
    symbol         TEXT NOT NULL,
    emotion_match  TEXT NOT NULL,
    action_type    TEXT NOT NULL,
    narration_file TEXT NOT NULL,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_symbolic_triggers_user ON symbolic_triggers(user_id, trigger_id);

CREATE TABLE IF NOT EXISTS knowledge_base (
    fact_id INTEGER PRIMARY KEY AUTOINCREMENT,
    fact    TEXT NOT NULL
);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions and row mapping
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Internal("connection mutex poisoned".into()))
}

fn conversion_err(
    col: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_timestamp(row: &Row<'_>, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_err(col, e))
}

fn emotion_from_row(row: &Row<'_>) -> rusqlite::Result<EmotionRecord> {
    Ok(EmotionRecord {
        record_id: row.get(0)?,
        user_id: row.get(1)?,
        emotion: row.get(2)?,
        context_note: row.get(3)?,
        microexpression_img: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

fn virtue_from_row(row: &Row<'_>) -> rusqlite::Result<VirtueEntry> {
    Ok(VirtueEntry {
        virtue_id: row.get(0)?,
        name: row.get(1)?,
        emotion_link: row.get(2)?,
    })
}

#[derive(Debug)]
struct BadActionType(String);

impl std::fmt::Display for BadActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BadActionType {}

fn trigger_from_row(row: &Row<'_>) -> rusqlite::Result<SymbolicTrigger> {
    let action: String = row.get(4)?;
    let action_type = action
        .parse::<ActionType>()
        .map_err(|e| conversion_err(4, BadActionType(e)))?;
    Ok(SymbolicTrigger {
        trigger_id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        emotion_match: row.get(3)?,
        action_type,
        narration_file: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
    })
}

const EMOTION_COLUMNS: &str =
    "record_id, user_id, emotion, context_note, microexpression_img, created_at";
const TRIGGER_COLUMNS: &str =
    "trigger_id, user_id, symbol, emotion_match, action_type, narration_file, created_at";

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    async fn ping(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    // --- Emotions ------------------------------------------------------------

    async fn insert_emotion(
        &self,
        record: &NewEmotionRecord,
    ) -> Result<EmotionRecord, StorageError> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO emotion_records
                     (user_id, emotion, context_note, microexpression_img, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.user_id,
                    record.emotion,
                    record.context_note,
                    record.microexpression_img,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(map_err)?;
            Ok(EmotionRecord {
                record_id: conn.last_insert_rowid(),
                user_id: record.user_id,
                emotion: record.emotion,
                context_note: record.context_note,
                microexpression_img: record.microexpression_img,
                created_at,
            })
        })
        .await
    }

    async fn recent_emotions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<EmotionRecord>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {EMOTION_COLUMNS} FROM emotion_records
                 WHERE user_id = ?1 ORDER BY record_id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_err)?;
            let rows = stmt
                .query_map(params![user_id, limit as i64], emotion_from_row)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(rows)
        })
        .await
    }

    // --- Virtues -------------------------------------------------------------

    async fn put_virtue(
        &self,
        name: &str,
        emotion_link: &str,
    ) -> Result<VirtueEntry, StorageError> {
        let name = name.to_string();
        let emotion_link = emotion_link.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO virtue_entries (name, emotion_link) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET emotion_link = excluded.emotion_link",
                params![name, emotion_link],
            )
            .map_err(map_err)?;
            conn.query_row(
                "SELECT virtue_id, name, emotion_link FROM virtue_entries WHERE name = ?1",
                params![name],
                virtue_from_row,
            )
            .map_err(map_err)
        })
        .await
    }

    async fn find_virtue(&self, emotion: &str) -> Result<Option<VirtueEntry>, StorageError> {
        let emotion = emotion.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT virtue_id, name, emotion_link FROM virtue_entries
                 WHERE emotion_link = ?1 ORDER BY virtue_id LIMIT 1",
                params![emotion],
                virtue_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn list_virtues(&self) -> Result<Vec<VirtueEntry>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT virtue_id, name, emotion_link FROM virtue_entries ORDER BY virtue_id")
                .map_err(map_err)?;
            let rows = stmt
                .query_map([], virtue_from_row)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(rows)
        })
        .await
    }

    // --- Triggers ------------------------------------------------------------

    async fn insert_trigger(&self, trigger: &NewTrigger) -> Result<SymbolicTrigger, StorageError> {
        let trigger = trigger.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO symbolic_triggers
                     (user_id, symbol, emotion_match, action_type, narration_file, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    trigger.user_id,
                    trigger.symbol,
                    trigger.emotion_match,
                    trigger.action_type.to_string(),
                    trigger.narration_file,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(map_err)?;
            let trigger_id = tx.last_insert_rowid();
            tx.commit().map_err(map_err)?;

            Ok(SymbolicTrigger {
                trigger_id,
                user_id: trigger.user_id,
                symbol: trigger.symbol,
                emotion_match: trigger.emotion_match,
                action_type: trigger.action_type,
                narration_file: trigger.narration_file,
                created_at,
            })
        })
        .await
    }

    async fn get_trigger(&self, trigger_id: i64) -> Result<Option<SymbolicTrigger>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT {TRIGGER_COLUMNS} FROM symbolic_triggers WHERE trigger_id = ?1");
            conn.query_row(&sql, params![trigger_id], trigger_from_row)
                .optional()
                .map_err(map_err)
        })
        .await
    }

    async fn list_triggers(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<SymbolicTrigger>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {TRIGGER_COLUMNS} FROM symbolic_triggers
                 WHERE user_id = ?1 ORDER BY trigger_id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_err)?;
            let rows = stmt
                .query_map(params![user_id, limit as i64], trigger_from_row)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(rows)
        })
        .await
    }

    // --- Knowledge -----------------------------------------------------------

    async fn add_knowledge_fact(&self, fact: &str) -> Result<(), StorageError> {
        let fact = fact.to_string();
        self.with_conn(move |conn| {
            conn.execute("INSERT INTO knowledge_base (fact) VALUES (?1)", params![fact])
                .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn knowledge_fact(&self) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT fact FROM knowledge_base ORDER BY fact_id LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
