//! Emotion handlers: `POST /log-emotion` and `POST /analyze-emotion`.

use axum::{extract::State, Json};
use cloelia::{normalize_emotion, prepare_emotion_record, validate_user_id};
use cloelia_node_api::{AnalyzeRequest, AnalyzeResponse, LogEmotionRequest, MessageResponse};

use crate::error::{ApiJson, AppError};

use super::AppState;

/// `POST /log-emotion`: append one emotion record for a user.
pub async fn log_emotion(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LogEmotionRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let record = prepare_emotion_record(
        req.user_id,
        &req.emotion,
        req.context_note,
        req.microexpression_img,
    )?;
    let stored = state.storage.insert_emotion(&record).await?;
    tracing::debug!(
        user_id = stored.user_id,
        record_id = stored.record_id,
        emotion = %stored.emotion,
        "emotion logged"
    );
    Ok(Json(MessageResponse::new("Emotion logged successfully.")))
}

/// `POST /analyze-emotion`: run detection over the user's recent history.
///
/// "No pattern" is a 200 with a message body, not an error.
pub async fn analyze_emotion(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    validate_user_id(req.user_id)?;
    normalize_emotion(&req.emotion)?;

    let resp = match state.engine.detect(req.user_id).await? {
        Some(d) => AnalyzeResponse::Detected {
            emotion_detected: d.emotion,
            suggested_virtue: d.virtue,
            action: d.action,
            trigger_id: d.trigger_id,
        },
        None => AnalyzeResponse::no_pattern(),
    };
    Ok(Json(resp))
}
