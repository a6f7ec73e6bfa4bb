//! Human-readable text rendering of triggers and log entries.
//!
//! Used by the `cloelia` CLI. The output is plain text for terminals; only
//! the JSON wire format is normative.

use crate::types::{FirewallLogEntry, SymbolicMemoryEntry};

/// Render one symbolic memory entry on a single line.
///
/// ```text
/// #12  user 7  anger -> patience  (reflection_prompt)  2026-05-08T12:00:00+00:00
/// ```
pub fn render_memory_entry(entry: &SymbolicMemoryEntry) -> String {
    format!(
        "#{}  user {}  {} -> {}  ({})  {}",
        entry.trigger_id, entry.user_id, entry.emotion, entry.virtue, entry.action, entry.timestamp
    )
}

/// Render one firewall log entry on a single line, flagging threats.
///
/// ```text
/// 2026-05-08T12:00:00+00:00  10.0.0.1         /log-emotion  THREAT
/// ```
pub fn render_firewall_entry(entry: &FirewallLogEntry) -> String {
    let flag = if entry.threat_detected { "  THREAT" } else { "" };
    format!("{}  {:<15}  {}{}", entry.timestamp, entry.ip, entry.path, flag)
}

/// Render a graph path as `a -> b -> c`, or a placeholder when empty.
pub fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        return "(no path)".to_string();
    }
    path.join(" -> ")
}
