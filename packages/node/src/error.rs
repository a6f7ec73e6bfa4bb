//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON format and map to the
//! appropriate HTTP status code. Internal and upstream details are logged
//! here and never reach the client.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cloelia::ValidationError;
use cloelia_node_api::{codes, ErrorResponse};
use serde::de::DeserializeOwned;

use crate::reply::ReplyError;
use crate::storage::StorageError;

/// Message sent to clients for any 500.
const INTERNAL_MESSAGE: &str = "internal server error";

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    InvalidJson(String),
    NotFound(String),
    /// Storage or other local failure. The detail is logged, not returned.
    Internal(String),
    /// An external service (text generation, speech synthesis) failed.
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_PARAMETER, msg),
            AppError::InvalidJson(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_JSON, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, codes::NOT_FOUND, msg),
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                )
            }
            AppError::Upstream(detail) => {
                tracing::error!(%detail, "external service failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::UPSTREAM_ERROR,
                    "reply generation failed".to_string(),
                )
            }
        };
        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        let StorageError::Internal(msg) = e;
        AppError::Internal(msg)
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<ReplyError> for AppError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::Io(_) => AppError::Internal(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiJson extractor
// ---------------------------------------------------------------------------

/// `Json<T>` whose rejection is an [`AppError`], so malformed bodies get the
/// same `{error, code}` shape as every other failure.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::InvalidJson(rejection_message(&rejection))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "expected Content-Type: application/json".into()
        }
        other => other.body_text(),
    }
}
