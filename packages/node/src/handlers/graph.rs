//! Symbolic graph queries: `GET /graph/virtues/{emotion}` and
//! `GET /graph/path?from=&to=`.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use cloelia::normalize_emotion;
use cloelia_node_api::{PathQuery, PathResponse, VirtuesResponse};

use crate::error::AppError;

use super::AppState;

/// `GET /graph/virtues/{emotion}`: virtues directly linked to an emotion.
/// Unknown emotions yield an empty list.
pub async fn virtues(
    State(state): State<AppState>,
    Path(emotion): Path<String>,
) -> Result<Json<VirtuesResponse>, AppError> {
    let emotion = normalize_emotion(&emotion)?;
    let virtues = state
        .graph
        .virtues_for(&emotion)
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(VirtuesResponse { emotion, virtues }))
}

/// `GET /graph/path?from=&to=`: shortest path between two nodes, empty when
/// none exists.
pub async fn path(
    State(state): State<AppState>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<PathResponse>, AppError> {
    let Query(q) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let from = q.from.trim().to_lowercase();
    let to = q.to.trim().to_lowercase();
    Ok(Json(PathResponse {
        path: state.graph.path(&from, &to),
    }))
}
