//! Log feed types: `GET /firewall-log` and `GET /trigger-feed`.

use cloelia::{FirewallLogEntry, SymbolicMemoryEntry};
use serde::{Deserialize, Serialize};

/// Response body for `GET /firewall-log`, oldest entry first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallLogResponse {
    pub log: Vec<FirewallLogEntry>,
}

/// Response body for `GET /trigger-feed`, oldest entry first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerFeedResponse {
    pub log: Vec<SymbolicMemoryEntry>,
}
