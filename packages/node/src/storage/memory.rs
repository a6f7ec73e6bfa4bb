//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the end-to-end suite, and ephemeral nodes.
//!
//! Records live in insertion-ordered vectors, so "most recent first" is a
//! reverse scan and ids are simply `len + 1`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use cloelia::{EmotionRecord, NewEmotionRecord, NewTrigger, SymbolicTrigger, VirtueEntry};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    emotions: Vec<EmotionRecord>,
    virtues: Vec<VirtueEntry>,
    next_virtue_id: i64,
    triggers: Vec<SymbolicTrigger>,
    facts: Vec<String>,
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    // --- Emotions ------------------------------------------------------------

    async fn insert_emotion(
        &self,
        record: &NewEmotionRecord,
    ) -> Result<EmotionRecord, StorageError> {
        let mut inner = self.write();
        let stored = EmotionRecord {
            record_id: inner.emotions.len() as i64 + 1,
            user_id: record.user_id,
            emotion: record.emotion.clone(),
            context_note: record.context_note.clone(),
            microexpression_img: record.microexpression_img.clone(),
            created_at: Utc::now(),
        };
        inner.emotions.push(stored.clone());
        Ok(stored)
    }

    async fn recent_emotions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<EmotionRecord>, StorageError> {
        let inner = self.read();
        Ok(inner
            .emotions
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    // --- Virtues -------------------------------------------------------------

    async fn put_virtue(
        &self,
        name: &str,
        emotion_link: &str,
    ) -> Result<VirtueEntry, StorageError> {
        let mut inner = self.write();
        if let Some(existing) = inner.virtues.iter_mut().find(|v| v.name == name) {
            existing.emotion_link = emotion_link.to_string();
            return Ok(existing.clone());
        }
        inner.next_virtue_id += 1;
        let entry = VirtueEntry {
            virtue_id: inner.next_virtue_id,
            name: name.to_string(),
            emotion_link: emotion_link.to_string(),
        };
        inner.virtues.push(entry.clone());
        Ok(entry)
    }

    async fn find_virtue(&self, emotion: &str) -> Result<Option<VirtueEntry>, StorageError> {
        let inner = self.read();
        Ok(inner
            .virtues
            .iter()
            .filter(|v| v.emotion_link == emotion)
            .min_by_key(|v| v.virtue_id)
            .cloned())
    }

    async fn list_virtues(&self) -> Result<Vec<VirtueEntry>, StorageError> {
        let inner = self.read();
        let mut virtues = inner.virtues.clone();
        virtues.sort_by_key(|v| v.virtue_id);
        Ok(virtues)
    }

    // --- Triggers ------------------------------------------------------------

    async fn insert_trigger(&self, trigger: &NewTrigger) -> Result<SymbolicTrigger, StorageError> {
        let mut inner = self.write();
        let stored = SymbolicTrigger {
            trigger_id: inner.triggers.len() as i64 + 1,
            user_id: trigger.user_id,
            symbol: trigger.symbol.clone(),
            emotion_match: trigger.emotion_match.clone(),
            action_type: trigger.action_type,
            narration_file: trigger.narration_file.clone(),
            created_at: Utc::now(),
        };
        inner.triggers.push(stored.clone());
        Ok(stored)
    }

    async fn get_trigger(&self, trigger_id: i64) -> Result<Option<SymbolicTrigger>, StorageError> {
        let inner = self.read();
        Ok(inner
            .triggers
            .iter()
            .find(|t| t.trigger_id == trigger_id)
            .cloned())
    }

    async fn list_triggers(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<SymbolicTrigger>, StorageError> {
        let inner = self.read();
        Ok(inner
            .triggers
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    // --- Knowledge -----------------------------------------------------------

    async fn add_knowledge_fact(&self, fact: &str) -> Result<(), StorageError> {
        self.write().facts.push(fact.to_string());
        Ok(())
    }

    async fn knowledge_fact(&self) -> Result<Option<String>, StorageError> {
        Ok(self.read().facts.first().cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
