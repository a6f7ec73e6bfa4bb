//! Emotion-to-virtue detection.
//!
//! [`SymbolicEngine::detect`] looks at a user's most recent emotions, picks
//! the dominant one, and when a virtue is linked to it records a
//! [`SymbolicTrigger`](cloelia::SymbolicTrigger) and appends the outcome to
//! the symbolic memory log.

use std::sync::Arc;

use cloelia::{
    dominant_emotion, narration_file, ActionType, NewTrigger, SymbolicMemoryEntry, RECENT_WINDOW,
};

use crate::request_log::JsonlLog;
use crate::storage::{Storage, StorageError};

/// A detected pattern and the trigger recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub emotion: String,
    pub virtue: String,
    pub action: ActionType,
    pub trigger_id: i64,
}

#[derive(Clone)]
pub struct SymbolicEngine {
    storage: Arc<dyn Storage>,
    memory_log: JsonlLog<SymbolicMemoryEntry>,
}

impl SymbolicEngine {
    pub fn new(storage: Arc<dyn Storage>, memory_log: JsonlLog<SymbolicMemoryEntry>) -> Self {
        Self {
            storage,
            memory_log,
        }
    }

    pub fn memory_log(&self) -> &JsonlLog<SymbolicMemoryEntry> {
        &self.memory_log
    }

    /// Run detection for `user_id`.
    ///
    /// `Ok(None)` means no history or no virtue linked to the dominant
    /// emotion. Nothing is written in that case.
    pub async fn detect(&self, user_id: i64) -> Result<Option<Detection>, StorageError> {
        let recent = self.storage.recent_emotions(user_id, RECENT_WINDOW).await?;
        let labels: Vec<&str> = recent.iter().map(|r| r.emotion.as_str()).collect();
        let Some(dominant) = dominant_emotion(&labels) else {
            return Ok(None);
        };

        let Some(virtue) = self.storage.find_virtue(dominant).await? else {
            tracing::debug!(user_id, emotion = dominant, "no virtue linked");
            return Ok(None);
        };

        let trigger = self
            .storage
            .insert_trigger(&NewTrigger {
                user_id,
                symbol: virtue.name.clone(),
                emotion_match: dominant.to_string(),
                action_type: ActionType::ReflectionPrompt,
                narration_file: narration_file(&virtue.name),
            })
            .await?;

        tracing::info!(
            user_id,
            emotion = dominant,
            virtue = %virtue.name,
            trigger_id = trigger.trigger_id,
            "symbolic trigger recorded"
        );

        self.memory_log
            .append(SymbolicMemoryEntry {
                timestamp: trigger.created_at.to_rfc3339(),
                user_id,
                emotion: trigger.emotion_match.clone(),
                virtue: trigger.symbol.clone(),
                action: trigger.action_type,
                trigger_id: trigger.trigger_id,
            })
            .await;

        Ok(Some(Detection {
            emotion: trigger.emotion_match,
            virtue: trigger.symbol,
            action: trigger.action_type,
            trigger_id: trigger.trigger_id,
        }))
    }
}
