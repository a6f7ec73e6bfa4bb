use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::NewEmotionRecord;

pub const MAX_CONTEXT_NOTE_CHARS: usize = 2000;
pub const MAX_IMAGE_REF_CHARS: usize = 2048;
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Errors returned when caller-supplied input is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("user_id must be a positive integer, got {0}")]
    InvalidUserId(i64),

    #[error("emotion must not be empty")]
    EmptyEmotion,

    #[error(
        "emotion {0:?} is invalid; labels are 1-64 characters of letters, spaces, \
         '_', '\\'' or '-', starting with a letter"
    )]
    InvalidEmotion(String),

    #[error("context_note must be at most {MAX_CONTEXT_NOTE_CHARS} characters")]
    ContextNoteTooLong,

    #[error("microexpression_img must be at most {MAX_IMAGE_REF_CHARS} characters")]
    ImageRefTooLong,

    #[error("message field is required")]
    EmptyMessage,

    #[error("message must be at most {MAX_MESSAGE_CHARS} characters")]
    MessageTooLong,
}

/// Check that a user id is usable as a key.
pub fn validate_user_id(user_id: i64) -> Result<(), ValidationError> {
    if user_id <= 0 {
        return Err(ValidationError::InvalidUserId(user_id));
    }
    Ok(())
}

/// Trim and lower-case an emotion label, rejecting anything that is not a
/// plain word or phrase.
pub fn normalize_emotion(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyEmotion);
    }
    if !EMOTION_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidEmotion(trimmed.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

/// Validate and normalise the fields of a `POST /log-emotion` body.
///
/// Blank optional fields are treated as absent.
pub fn prepare_emotion_record(
    user_id: i64,
    emotion: &str,
    context_note: Option<String>,
    microexpression_img: Option<String>,
) -> Result<NewEmotionRecord, ValidationError> {
    validate_user_id(user_id)?;
    let emotion = normalize_emotion(emotion)?;

    let context_note = non_blank(context_note);
    if context_note
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_CONTEXT_NOTE_CHARS)
    {
        return Err(ValidationError::ContextNoteTooLong);
    }

    let microexpression_img = non_blank(microexpression_img);
    if microexpression_img
        .as_ref()
        .is_some_and(|i| i.chars().count() > MAX_IMAGE_REF_CHARS)
    {
        return Err(ValidationError::ImageRefTooLong);
    }

    Ok(NewEmotionRecord {
        user_id,
        emotion,
        context_note,
        microexpression_img,
    })
}

/// Trim a free-text message destined for the reply pipeline.
pub fn prepare_message(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong);
    }
    Ok(trimmed.to_string())
}

// --- helpers -----------------------------------------------------------------

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `^\p{L}[\p{L} _'-]{0,63}$`
static EMOTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{L}[\p{L} _'-]{0,63}$").expect("invalid emotion regex")
});
