//! Symbolic graph query types: `GET /graph/virtues/{emotion}` and
//! `GET /graph/path`.

use serde::{Deserialize, Serialize};

/// Response body for `GET /graph/virtues/{emotion}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtuesResponse {
    pub emotion: String,
    /// Virtues directly linked to `emotion`; empty for unknown emotions.
    pub virtues: Vec<String>,
}

/// Query parameters for `GET /graph/path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathQuery {
    pub from: String,
    pub to: String,
}

/// Response body for `GET /graph/path`. `path` is empty when the nodes are
/// unknown or not connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathResponse {
    pub path: Vec<String>,
}
