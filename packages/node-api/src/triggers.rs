//! Stored trigger lookups: `GET /triggers/{trigger_id}` and
//! `GET /users/{user_id}/triggers`.

use cloelia::SymbolicTrigger;
use serde::{Deserialize, Serialize};

/// Default page size for `GET /users/{user_id}/triggers`.
pub const DEFAULT_TRIGGER_LIMIT: usize = 20;
/// Largest `limit` honoured; bigger values are clamped.
pub const MAX_TRIGGER_LIMIT: usize = 100;

/// Query parameters for `GET /users/{user_id}/triggers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl TriggerListQuery {
    /// The requested limit, defaulted and clamped to `1..=MAX_TRIGGER_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_TRIGGER_LIMIT)
            .clamp(1, MAX_TRIGGER_LIMIT)
    }
}

/// Response body for `GET /users/{user_id}/triggers`, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerListResponse {
    pub user_id: i64,
    pub triggers: Vec<SymbolicTrigger>,
}
