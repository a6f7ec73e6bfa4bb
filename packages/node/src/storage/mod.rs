//! Storage abstraction layer for the Cloelia node.
//!
//! The [`Storage`] trait is the contract between the engine/handlers and the
//! relational store. It is deliberately narrow: fetch a user's recent
//! emotions, look a virtue up by emotion, insert a trigger and get its id.
//! Pattern logic lives in [`crate::engine`], not here.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, the end-to-end suite, ephemeral nodes |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use cloelia::graph::EMOTION_VIRTUE_EDGES;
use cloelia::{EmotionRecord, NewEmotionRecord, NewTrigger, SymbolicTrigger, VirtueEntry};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a Cloelia node.
///
/// All methods are `async` and return `Result<_, StorageError>`.
/// Implementations must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Cheap round trip used by `GET /db/test`.
    async fn ping(&self) -> Result<(), StorageError>;

    // --- Emotions ------------------------------------------------------------

    /// Append an emotion record. Storage assigns `record_id` and `created_at`.
    async fn insert_emotion(
        &self,
        record: &NewEmotionRecord,
    ) -> Result<EmotionRecord, StorageError>;

    /// Return up to `limit` of `user_id`'s records, most recent first.
    async fn recent_emotions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<EmotionRecord>, StorageError>;

    // --- Virtues -------------------------------------------------------------

    /// Insert or update a virtue (upsert by `name`).
    async fn put_virtue(&self, name: &str, emotion_link: &str)
        -> Result<VirtueEntry, StorageError>;

    /// The virtue linked to `emotion`. When several are linked, the one with
    /// the lowest `virtue_id` wins.
    async fn find_virtue(&self, emotion: &str) -> Result<Option<VirtueEntry>, StorageError>;

    /// All virtues, ordered by `virtue_id`.
    async fn list_virtues(&self) -> Result<Vec<VirtueEntry>, StorageError>;

    // --- Triggers ------------------------------------------------------------

    /// Record a trigger. Storage assigns a monotonically increasing
    /// `trigger_id` and `created_at`.
    async fn insert_trigger(&self, trigger: &NewTrigger) -> Result<SymbolicTrigger, StorageError>;

    /// Retrieve a trigger by id. Returns `None` if not found.
    async fn get_trigger(&self, trigger_id: i64) -> Result<Option<SymbolicTrigger>, StorageError>;

    /// Up to `limit` of `user_id`'s triggers, most recent first.
    async fn list_triggers(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<SymbolicTrigger>, StorageError>;

    // --- Knowledge -----------------------------------------------------------

    /// Add a fact used to enrich text-generation prompts.
    async fn add_knowledge_fact(&self, fact: &str) -> Result<(), StorageError>;

    /// The first stored fact, if any.
    async fn knowledge_fact(&self) -> Result<Option<String>, StorageError>;
}

/// Seed the base emotion → virtue links if the virtue table is empty.
///
/// Existing rows are left alone so operator edits survive restarts.
/// Returns the number of virtues inserted.
pub async fn seed_default_virtues(storage: &dyn Storage) -> Result<usize, StorageError> {
    if !storage.list_virtues().await?.is_empty() {
        return Ok(0);
    }
    for (emotion, virtue) in EMOTION_VIRTUE_EDGES {
        storage.put_virtue(&capitalize(virtue), emotion).await?;
    }
    Ok(EMOTION_VIRTUE_EDGES.len())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::MemoryStorage;

    #[tokio::test]
    async fn seeding_is_one_shot() {
        let s = MemoryStorage::new();
        assert_eq!(seed_default_virtues(&s).await.unwrap(), 6);
        assert_eq!(seed_default_virtues(&s).await.unwrap(), 0);

        let fear = s.find_virtue("fear").await.unwrap().unwrap();
        assert_eq!(fear.name, "Courage");
        assert_eq!(s.list_virtues().await.unwrap().len(), 6);
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("patience"), "Patience");
        assert_eq!(capitalize(""), "");
    }
}
