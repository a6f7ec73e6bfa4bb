//! Log feeds: `GET /firewall-log` and `GET /trigger-feed`.
//!
//! Both flush their writer first, so a request sees every entry queued
//! before it, including its own firewall line.

use axum::{extract::State, Json};
use cloelia_node_api::{FirewallLogResponse, TriggerFeedResponse};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppError;
use crate::request_log::JsonlLog;

use super::AppState;

/// `GET /firewall-log`
pub async fn firewall_log(
    State(state): State<AppState>,
) -> Result<Json<FirewallLogResponse>, AppError> {
    let log = read_feed(&state.firewall_log).await?;
    Ok(Json(FirewallLogResponse { log }))
}

/// `GET /trigger-feed`
pub async fn trigger_feed(
    State(state): State<AppState>,
) -> Result<Json<TriggerFeedResponse>, AppError> {
    let log = read_feed(state.engine.memory_log()).await?;
    Ok(Json(TriggerFeedResponse { log }))
}

/// Read a whole log, reporting any lines this process failed to write.
async fn read_feed<T>(log: &JsonlLog<T>) -> Result<Vec<T>, AppError>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    let entries = log
        .read_all()
        .await
        .map_err(|e| AppError::Internal(format!("reading {}: {e}", log.path().display())))?;

    let failed = log.write_errors();
    if failed > 0 {
        tracing::warn!(
            path = %log.path().display(),
            failed,
            written = log.lines_written(),
            "feed is missing entries that could not be written"
        );
    } else {
        tracing::debug!(
            path = %log.path().display(),
            entries = entries.len(),
            written = log.lines_written(),
            "feed read"
        );
    }
    Ok(entries)
}
