//! Liveness handlers: `GET /`, `GET /cloelia/`, `GET /db/test`.

use axum::{extract::State, Json};
use cloelia_node_api::{DbStatusResponse, MessageResponse, StatusResponse};

use super::AppState;

/// `GET /`: process liveness.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new(
        "Cloelia AI Agent System is online and operational.",
    ))
}

/// `GET /cloelia/`: emotion router liveness.
pub async fn cloelia_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Cloelia AI router is online.".into(),
    })
}

/// `GET /db/test`: store round trip. Always 200; failures are reported in
/// the body.
pub async fn db_test(State(state): State<AppState>) -> Json<DbStatusResponse> {
    match state.storage.ping().await {
        Ok(()) => Json(DbStatusResponse::connected()),
        Err(e) => {
            tracing::error!(error = %e, "database check failed");
            Json(DbStatusResponse::error(e.to_string()))
        }
    }
}
