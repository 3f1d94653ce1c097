//! Typed view over the settings store.
//!
//! Every record lives under its own key and is read and written as a whole
//! value. Nothing here is transactional across keys: the runner and the
//! dashboard both read-modify-write, and the last writer wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::traits::SettingsStore;
use crate::automation::model::{
    AutomationSettings, ConnectionSuggestion, ERROR_LOG_CAP, ErrorLogEntry, ProfileAnalysis,
    SUGGESTION_CAP, Stats, push_bounded,
};
use crate::error::StoreError;

/// Fully-qualified persisted keys for one prefix.
#[derive(Debug, Clone)]
pub struct StateKeys {
    pub enabled: String,
    pub stats: String,
    pub suggestions: String,
    pub errors: String,
    pub profile_analysis: String,
}

impl StateKeys {
    pub fn new(prefix: &str) -> Self {
        Self {
            enabled: format!("{prefix}-enabled"),
            stats: format!("{prefix}-stats"),
            suggestions: format!("{prefix}-suggestions"),
            errors: format!("{prefix}-errors"),
            profile_analysis: format!("{prefix}-profile-analysis"),
        }
    }
}

/// Shared automator state on top of a [`SettingsStore`].
#[derive(Clone)]
pub struct AutomatorState {
    store: Arc<dyn SettingsStore>,
    keys: StateKeys,
}

impl AutomatorState {
    pub fn new(store: Arc<dyn SettingsStore>, prefix: &str) -> Self {
        Self {
            store,
            keys: StateKeys::new(prefix),
        }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Serialization {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, &value).await
    }

    // ── Enablement ──────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<AutomationSettings, StoreError> {
        let enabled = self.load::<bool>(&self.keys.enabled).await?.unwrap_or(false);
        Ok(AutomationSettings { enabled })
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.save(&self.keys.enabled, &enabled).await
    }

    // ── Stats ───────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<Stats, StoreError> {
        Ok(self.load(&self.keys.stats).await?.unwrap_or_default())
    }

    pub async fn save_stats(&self, stats: &Stats) -> Result<(), StoreError> {
        self.save(&self.keys.stats, stats).await
    }

    // ── Suggestions ─────────────────────────────────────────────────

    pub async fn suggestions(&self) -> Result<Vec<ConnectionSuggestion>, StoreError> {
        Ok(self.load(&self.keys.suggestions).await?.unwrap_or_default())
    }

    /// Replace the stored batch with the first [`SUGGESTION_CAP`] of `batch`.
    pub async fn replace_suggestions(
        &self,
        batch: &[ConnectionSuggestion],
    ) -> Result<usize, StoreError> {
        let kept = &batch[..batch.len().min(SUGGESTION_CAP)];
        self.save(&self.keys.suggestions, &kept).await?;
        Ok(kept.len())
    }

    pub async fn clear_suggestions(&self) -> Result<(), StoreError> {
        self.save(&self.keys.suggestions, &Vec::<ConnectionSuggestion>::new())
            .await
    }

    // ── Error log ───────────────────────────────────────────────────

    pub async fn errors(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        Ok(self.load(&self.keys.errors).await?.unwrap_or_default())
    }

    /// Append one entry, keeping only the newest [`ERROR_LOG_CAP`].
    pub async fn push_error(
        &self,
        at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut log = self.errors().await?;
        push_bounded(&mut log, ErrorLogEntry::new(at, error), ERROR_LOG_CAP);
        debug!(entries = log.len(), "Error log updated");
        self.save(&self.keys.errors, &log).await
    }

    pub async fn clear_errors(&self) -> Result<(), StoreError> {
        self.save(&self.keys.errors, &Vec::<ErrorLogEntry>::new())
            .await
    }

    // ── Profile analysis ────────────────────────────────────────────

    pub async fn profile_analysis(&self) -> Result<Option<ProfileAnalysis>, StoreError> {
        self.load(&self.keys.profile_analysis).await
    }

    pub async fn save_profile_analysis(&self, analysis: &ProfileAnalysis) -> Result<(), StoreError> {
        self.save(&self.keys.profile_analysis, analysis).await
    }

    // ── Reset ───────────────────────────────────────────────────────

    /// Zero the counters and clear suggestions and the error log.
    ///
    /// Every write is attempted even if an earlier one fails; the first
    /// failure is returned. On success returns the stats that were written.
    pub async fn reset(&self) -> Result<Stats, StoreError> {
        let stats = Stats::reset();
        let results = [
            self.save_stats(&stats).await,
            self.clear_suggestions().await,
            self.clear_errors().await,
        ];
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "Partial reset");
                return Err(e);
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySettingsStore;
    use serde_json::json;

    fn state() -> (Arc<MemorySettingsStore>, AutomatorState) {
        let store = Arc::new(MemorySettingsStore::new());
        let state = AutomatorState::new(store.clone(), "linkedin-automator");
        (store, state)
    }

    fn suggestion(i: usize) -> ConnectionSuggestion {
        ConnectionSuggestion {
            name: format!("Person {i}"),
            title: "CTO".into(),
            reason: "fit".into(),
        }
    }

    #[test]
    fn keys_use_prefix() {
        let keys = StateKeys::new("linkedin-automator");
        assert_eq!(keys.enabled, "linkedin-automator-enabled");
        assert_eq!(keys.stats, "linkedin-automator-stats");
        assert_eq!(keys.suggestions, "linkedin-automator-suggestions");
        assert_eq!(keys.errors, "linkedin-automator-errors");
        assert_eq!(keys.profile_analysis, "linkedin-automator-profile-analysis");
    }

    #[tokio::test]
    async fn enabled_defaults_false() {
        let (_, state) = state();
        assert!(!state.settings().await.unwrap().enabled);
        state.set_enabled(true).await.unwrap();
        assert!(state.settings().await.unwrap().enabled);
    }

    #[tokio::test]
    async fn enabled_stored_as_plain_bool() {
        let (store, state) = state();
        state.set_enabled(true).await.unwrap();
        assert_eq!(
            store.get("linkedin-automator-enabled").await.unwrap(),
            Some(json!(true))
        );
    }

    #[tokio::test]
    async fn suggestions_truncated_and_replaced() {
        let (_, state) = state();
        let batch: Vec<_> = (0..8).map(suggestion).collect();
        assert_eq!(state.replace_suggestions(&batch).await.unwrap(), 5);
        let stored = state.suggestions().await.unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(stored[0].name, "Person 0");

        // A later, smaller batch replaces rather than merges
        state.replace_suggestions(&[suggestion(42)]).await.unwrap();
        let stored = state.suggestions().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Person 42");
    }

    #[tokio::test]
    async fn error_log_bounded_fifo() {
        let (_, state) = state();
        for i in 0..12 {
            state.push_error(Utc::now(), format!("error {i}")).await.unwrap();
        }
        let log = state.errors().await.unwrap();
        assert_eq!(log.len(), 10);
        assert_eq!(log[0].error, "error 2");
        assert_eq!(log[9].error, "error 11");
    }

    #[tokio::test]
    async fn corrupt_stats_surface_serialization_error() {
        let (store, state) = state();
        store
            .set("linkedin-automator-stats", &json!("not an object"))
            .await
            .unwrap();
        let err = state.stats().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let (_, state) = state();
        state
            .save_stats(&Stats {
                connections_suggested: 4,
                posts_liked: 2,
                messages_sent: 1,
                last_activity: "busy".into(),
                last_run: 99,
            })
            .await
            .unwrap();
        state.replace_suggestions(&[suggestion(1)]).await.unwrap();
        state.push_error(Utc::now(), "boom").await.unwrap();

        for _ in 0..2 {
            let stats = state.reset().await.unwrap();
            assert_eq!(stats, Stats::reset());
            assert_eq!(state.stats().await.unwrap(), Stats::reset());
            assert!(state.suggestions().await.unwrap().is_empty());
            assert!(state.errors().await.unwrap().is_empty());
        }
    }

    /// Memory store that rejects writes to one key.
    struct KeyFailingStore {
        inner: MemorySettingsStore,
        failing_key: &'static str,
    }

    #[async_trait::async_trait]
    impl SettingsStore for KeyFailingStore {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
            if key == self.failing_key {
                return Err(StoreError::Query(format!("write to {key} refused")));
            }
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn reset_attempts_every_write() {
        let store = Arc::new(KeyFailingStore {
            inner: MemorySettingsStore::new(),
            failing_key: "linkedin-automator-suggestions",
        });
        let state = AutomatorState::new(store.clone(), "linkedin-automator");
        state
            .save_stats(&Stats {
                posts_liked: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        state.push_error(Utc::now(), "boom").await.unwrap();

        let err = state.reset().await.unwrap_err();
        assert!(err.to_string().contains("linkedin-automator-suggestions"));
        assert_eq!(state.stats().await.unwrap(), Stats::reset());
        assert!(state.errors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_analysis_overwrites() {
        let (_, state) = state();
        assert!(state.profile_analysis().await.unwrap().is_none());
        for reason in ["first", "second"] {
            state
                .save_profile_analysis(&ProfileAnalysis {
                    should_connect: true,
                    reason: reason.into(),
                    message: None,
                })
                .await
                .unwrap();
        }
        let stored = state.profile_analysis().await.unwrap().unwrap();
        assert_eq!(stored.reason, "second");
    }
}
