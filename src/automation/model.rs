//! Persisted records shared by the cycle runner and the dashboard.
//!
//! Field names serialize as camelCase so stored values stay readable by the
//! pipe's web UI.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Most recent connection suggestions kept in storage.
pub const SUGGESTION_CAP: usize = 5;

/// Error-log entries kept in storage.
pub const ERROR_LOG_CAP: usize = 10;

/// `lastActivity` text written by a stats reset.
pub const RESET_ACTIVITY: &str = "Stats reset";

/// Whether automation is switched on. Defaults to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSettings {
    pub enabled: bool,
}

/// Running counters plus the rate-limit timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub connections_suggested: u64,
    pub posts_liked: u64,
    pub messages_sent: u64,
    pub last_activity: String,
    /// Milliseconds since the Unix epoch; `0` means never ran.
    pub last_run: i64,
}

impl Stats {
    /// The state a user-triggered reset produces.
    pub fn reset() -> Self {
        Self {
            last_activity: RESET_ACTIVITY.to_string(),
            ..Self::default()
        }
    }

    /// Milliseconds elapsed since `last_run`, as seen at `now`.
    pub fn millis_since_last_run(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().saturating_sub(self.last_run)
    }

    /// Record a cycle at `now`. `last_run` never moves backwards.
    pub fn mark_run(&mut self, now: DateTime<Utc>) {
        self.last_run = self.last_run.max(now.timestamp_millis());
    }
}

/// A person worth connecting with, as suggested on a people-search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSuggestion {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

/// Verdict for a single profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAnalysis {
    pub should_connect: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One entry in the bounded error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    pub error: String,
}

impl ErrorLogEntry {
    pub fn new(at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            error: error.into(),
        }
    }
}

/// Append `item`, then drop from the front until at most `cap` remain.
pub fn push_bounded<T>(items: &mut Vec<T>, item: T, cap: usize) {
    items.push(item);
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}
