//! Health-check types: `GET /`, `GET /cloelia/`, and `GET /db/test`.

use serde::{Deserialize, Serialize};

/// Response body for `GET /cloelia/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

/// Response body for `GET /db/test`.
///
/// Always returned with HTTP 200; `status` is `"connected"` or `"error"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DbStatusResponse {
    pub fn connected() -> Self {
        Self {
            status: "connected".into(),
            details: None,
        }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            details: Some(details.into()),
        }
    }
}
