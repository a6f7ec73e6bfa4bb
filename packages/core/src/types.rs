//! Core data types for Cloelia.
//!
//! This module defines the records the service stores and serves:
//! [`EmotionRecord`], [`VirtueEntry`], [`SymbolicTrigger`],
//! [`FirewallLogEntry`], and [`SymbolicMemoryEntry`]. All types serialise to
//! and from JSON with the field names used on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a symbolic trigger asks the user to do.
///
/// Serialises as a snake_case string (e.g. `"reflection_prompt"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Prompt the user to reflect on the suggested virtue.
    #[default]
    ReflectionPrompt,
}

/// Formats the action as its snake_case wire-format string.
impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::ReflectionPrompt => write!(f, "reflection_prompt"),
        }
    }
}

/// Parses an [`ActionType`] from its snake_case wire-format string.
impl std::str::FromStr for ActionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflection_prompt" => Ok(ActionType::ReflectionPrompt),
            _ => Err(format!(
                "unknown action type {:?}; expected: reflection_prompt",
                s
            )),
        }
    }
}

/// A single reported emotion for a user.
///
/// Records are immutable once written. `record_id` is assigned by storage in
/// insertion order and doubles as the recency tiebreaker when two records
/// share a `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionRecord {
    pub record_id: i64,
    pub user_id: i64,
    /// Normalised (trimmed, lower-cased) emotion label.
    pub emotion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_note: Option<String>,
    /// Reference to a captured micro-expression image (path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microexpression_img: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The fields a caller supplies when logging an emotion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmotionRecord {
    pub user_id: i64,
    pub emotion: String,
    pub context_note: Option<String>,
    pub microexpression_img: Option<String>,
}

/// Static reference data linking an emotion to the virtue that answers it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtueEntry {
    pub virtue_id: i64,
    pub name: String,
    pub emotion_link: String,
}

/// A detected symbolic trigger, as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolicTrigger {
    pub trigger_id: i64,
    pub user_id: i64,
    /// Name of the matched virtue.
    pub symbol: String,
    pub emotion_match: String,
    pub action_type: ActionType,
    pub narration_file: String,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to record a new trigger. Storage assigns the id and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrigger {
    pub user_id: i64,
    pub symbol: String,
    pub emotion_match: String,
    pub action_type: ActionType,
    pub narration_file: String,
}

/// One line of the firewall log: a single inbound request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallLogEntry {
    /// RFC 3339 UTC timestamp of when the request was seen.
    pub timestamp: String,
    pub ip: String,
    pub path: String,
    pub threat_detected: bool,
}

impl FirewallLogEntry {
    /// Build an entry stamped with the current UTC time.
    pub fn now(ip: impl Into<String>, path: impl Into<String>, threat_detected: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            ip: ip.into(),
            path: path.into(),
            threat_detected,
        }
    }
}

/// One line of the symbolic memory log, appended after every successful
/// detection and served by the trigger feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolicMemoryEntry {
    pub timestamp: String,
    pub user_id: i64,
    pub emotion: String,
    pub virtue: String,
    pub action: ActionType,
    pub trigger_id: i64,
}
