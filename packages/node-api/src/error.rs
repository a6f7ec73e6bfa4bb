//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// { "error": "emotion must not be empty", "code": "invalid_parameter" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code, one of [`codes`].
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_json` | 400 |
    /// | `invalid_parameter` | 400 |
    /// | `not_found` | 404 |
    /// | `rate_limit_exceeded` | 429 |
    /// | `internal_error` | 500 |
    /// | `upstream_error` | 500 |
    pub code: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a static code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

/// Well-known error codes.
pub mod codes {
    pub const INVALID_JSON: &str = "invalid_json";
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMIT_EXCEEDED: &str = "rate_limit_exceeded";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
}
