//! HTTP request handlers for all Cloelia node endpoints.
//!
//! Each submodule covers a logical group of endpoints. Handlers are plain
//! async functions that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`. Validation happens here; storage
//! and the engine only ever see normalised input.

pub mod emotions;
pub mod graph;
pub mod health;
pub mod logs;
pub mod reply;
pub mod triggers;

use std::sync::Arc;

use cloelia::{FirewallLogEntry, SymbolicGraph};

use crate::{
    engine::SymbolicEngine, reply::ReplyPipeline, request_log::JsonlLog, storage::Storage,
};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub engine: SymbolicEngine,
    pub replies: Arc<ReplyPipeline>,
    /// Read side of the firewall log; the middleware holds the write side.
    pub firewall_log: JsonlLog<FirewallLogEntry>,
    pub graph: Arc<SymbolicGraph>,
}
