//! Stored trigger lookups: `GET /triggers/{trigger_id}` and
//! `GET /users/{user_id}/triggers`.
//!
//! These read the relational store directly, unlike `/trigger-feed`, which
//! replays the symbolic memory log.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use cloelia::{validate_user_id, SymbolicTrigger};
use cloelia_node_api::{TriggerListQuery, TriggerListResponse};

use crate::error::AppError;

use super::AppState;

/// `GET /triggers/{trigger_id}`
pub async fn get_trigger(
    State(state): State<AppState>,
    trigger_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SymbolicTrigger>, AppError> {
    let Path(trigger_id) = trigger_id.map_err(|e| AppError::BadRequest(e.body_text()))?;
    state
        .storage
        .get_trigger(trigger_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("trigger {trigger_id} not found")))
}

/// `GET /users/{user_id}/triggers?limit=`: most recent first.
pub async fn list_user_triggers(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<TriggerListQuery>, QueryRejection>,
) -> Result<Json<TriggerListResponse>, AppError> {
    let Path(user_id) = user_id.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Query(q) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validate_user_id(user_id)?;

    let triggers = state
        .storage
        .list_triggers(user_id, q.effective_limit())
        .await?;
    Ok(Json(TriggerListResponse { user_id, triggers }))
}
