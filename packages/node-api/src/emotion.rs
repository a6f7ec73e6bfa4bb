//! Emotion logging and analysis types: `POST /log-emotion` and
//! `POST /analyze-emotion`.

use cloelia::ActionType;
use serde::{Deserialize, Serialize};

/// Request body for `POST /log-emotion`.
///
/// # Example
///
/// ```json
/// { "user_id": 7, "emotion": "anger", "context_note": "traffic" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEmotionRequest {
    pub user_id: i64,
    pub emotion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microexpression_img: Option<String>,
}

/// Request body for `POST /analyze-emotion`.
///
/// `emotion` is the caller's latest reported emotion. Detection runs over
/// the stored history only, so this value is validated but not recorded;
/// log it through `POST /log-emotion` first if it should count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeRequest {
    pub user_id: i64,
    pub emotion: String,
}

/// Response body for `POST /analyze-emotion`.
///
/// Both variants are returned with HTTP 200; "no pattern" is a domain
/// outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    /// A dominant emotion matched a virtue and a trigger was recorded.
    Detected {
        emotion_detected: String,
        suggested_virtue: String,
        action: ActionType,
        trigger_id: i64,
    },
    /// No history, or no virtue linked to the dominant emotion.
    NoPattern { message: String },
}

impl AnalyzeResponse {
    pub const NO_PATTERN: &'static str = "No symbolic pattern detected.";

    pub fn no_pattern() -> Self {
        AnalyzeResponse::NoPattern {
            message: Self::NO_PATTERN.to_string(),
        }
    }
}

/// Generic `{ "message": ... }` acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
