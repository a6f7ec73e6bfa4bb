//! Narrated replies: `POST /gpt/generate-response` and
//! `GET /gpt/audio/{filename}`.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use cloelia::prepare_message;
use cloelia_node_api::{GenerateRequest, GenerateResponse, ReplyBody};

use crate::error::{ApiJson, AppError};

use super::AppState;

/// `POST /gpt/generate-response`: generate reply text and its narration.
pub async fn generate_response(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let message = prepare_message(&req.message)?;
    let reply = state.replies.generate(&message).await?;
    Ok(Json(GenerateResponse {
        response: ReplyBody {
            audio_url: reply.audio_url(),
            text: reply.text,
        },
    }))
}

/// `GET /gpt/audio/{filename}`: serve a generated MP3.
///
/// Anything that is not a plain `.mp3` name in the audio directory is a 404,
/// indistinguishable from a missing file.
pub async fn serve_audio(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let not_found = || AppError::NotFound("Audio file not found.".into());
    let path = state.replies.audio_path(&filename).ok_or_else(not_found)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(format!("reading {}: {e}", path.display()))),
    };
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], bytes))
}
