//! Reply pipeline types: `POST /gpt/generate-response`.

use serde::{Deserialize, Serialize};

/// Request body for `POST /gpt/generate-response`.
///
/// `message` defaults to empty so that a missing field is reported as a
/// validation error rather than a JSON shape error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    #[serde(default)]
    pub message: String,
}

/// The generated text and the location of its narration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyBody {
    pub text: String,
    /// Path under this node, e.g. `/gpt/audio/reply_1a2b3c4d.mp3`.
    pub audio_url: String,
}

/// Response body for `POST /gpt/generate-response`.
///
/// ```json
/// { "response": { "text": "...", "audio_url": "/gpt/audio/reply_1a2b3c4d.mp3" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub response: ReplyBody,
}
