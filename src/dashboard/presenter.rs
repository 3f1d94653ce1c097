//! Dashboard state model and actions.
//!
//! The presenter polls the persisted automator state on its own timer and keeps
//! a render-ready [`DashboardView`]. It shares nothing with the cycle runner
//! beyond the settings store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::automation::model::{ConnectionSuggestion, ErrorLogEntry, ProfileAnalysis, Stats};
use crate::error::{DashboardError, StoreError};
use crate::store::AutomatorState;

/// Suggestions and errors shown on the dashboard.
pub const VIEW_LIST_CAP: usize = 5;

/// Everything the dashboard renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub enabled: bool,
    pub stats: Stats,
    pub suggestions: Vec<ConnectionSuggestion>,
    /// Most recent first.
    pub recent_errors: Vec<ErrorLogEntry>,
    pub profile_analysis: Option<ProfileAnalysis>,
    /// Transient banner for the last failed read or action.
    pub error: Option<String>,
    pub toggle_in_flight: bool,
}

struct Snapshot {
    enabled: bool,
    stats: Stats,
    suggestions: Vec<ConnectionSuggestion>,
    errors: Vec<ErrorLogEntry>,
    profile_analysis: Option<ProfileAnalysis>,
}

/// Clears the in-flight flag when a toggle finishes or its future is dropped.
struct ToggleGuard<'a>(&'a AtomicBool);

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DashboardPresenter {
    state: AutomatorState,
    view: RwLock<DashboardView>,
    toggling: AtomicBool,
}

impl DashboardPresenter {
    pub fn new(state: AutomatorState) -> Self {
        Self {
            state,
            view: RwLock::new(DashboardView::default()),
            toggling: AtomicBool::new(false),
        }
    }

    /// Latest view.
    pub async fn view(&self) -> DashboardView {
        let view = self.view.read().await;
        self.rendered(&view)
    }

    /// Clone of `view` with the in-flight flag taken from the live toggle state.
    fn rendered(&self, view: &DashboardView) -> DashboardView {
        DashboardView {
            toggle_in_flight: self.toggling.load(Ordering::Acquire),
            ..view.clone()
        }
    }

    /// Re-read persisted state. A failed read keeps the previous data and
    /// sets the error banner.
    pub async fn refresh(&self) -> DashboardView {
        match self.load().await {
            Ok(snapshot) => {
                let mut view = self.view.write().await;
                view.enabled = snapshot.enabled;
                view.stats = snapshot.stats;
                view.suggestions = snapshot.suggestions;
                view.recent_errors = recent_first(&snapshot.errors);
                view.profile_analysis = snapshot.profile_analysis;
                view.error = None;
                self.rendered(&view)
            }
            Err(e) => {
                warn!(error = %e, "Dashboard refresh failed");
                let mut view = self.view.write().await;
                view.error = Some(format!("Failed to load automation state: {e}"));
                self.rendered(&view)
            }
        }
    }

    async fn load(&self) -> Result<Snapshot, StoreError> {
        let settings = self.state.settings().await?;
        let stats = self.state.stats().await?;
        let mut suggestions = self.state.suggestions().await?;
        suggestions.truncate(VIEW_LIST_CAP);
        let errors = self.state.errors().await?;
        let profile_analysis = self.state.profile_analysis().await?;
        Ok(Snapshot {
            enabled: settings.enabled,
            stats,
            suggestions,
            errors,
            profile_analysis,
        })
    }

    /// Flip the enabled flag and stamp `last_activity`.
    ///
    /// Rejected with [`DashboardError::ToggleInFlight`] while a previous toggle
    /// is still writing.
    pub async fn toggle(&self) -> Result<DashboardView, DashboardError> {
        self.toggle_at(Local::now()).await
    }

    pub async fn toggle_at(&self, now: DateTime<Local>) -> Result<DashboardView, DashboardError> {
        if self
            .toggling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Toggle rejected, previous toggle in flight");
            return Err(DashboardError::ToggleInFlight);
        }
        let guard = ToggleGuard(&self.toggling);
        let result = self.apply_toggle(now).await;
        drop(guard);

        let mut view = self.view.write().await;
        match result {
            Ok((enabled, stats)) => {
                info!(enabled, "Automation toggled");
                view.enabled = enabled;
                view.stats = stats;
                view.error = None;
                Ok(self.rendered(&view))
            }
            Err(e) => {
                warn!(error = %e, "Toggle failed");
                view.error = Some(format!("Failed to toggle automation: {e}"));
                Err(e.into())
            }
        }
    }

    async fn apply_toggle(&self, now: DateTime<Local>) -> Result<(bool, Stats), StoreError> {
        let enabled = !self.state.settings().await?.enabled;
        self.state.set_enabled(enabled).await?;

        let mut stats = self.state.stats().await?;
        stats.last_activity = format!(
            "Automation {} at {}",
            if enabled { "started" } else { "stopped" },
            now.format("%H:%M:%S")
        );
        self.state.save_stats(&stats).await?;
        Ok((enabled, stats))
    }

    /// Zero the counters and clear suggestions and errors.
    ///
    /// The view is cleared even when the write fails; the failure shows up
    /// as the banner.
    pub async fn reset(&self) -> Result<DashboardView, DashboardError> {
        let result = self.state.reset().await;

        let mut view = self.view.write().await;
        view.stats = Stats::reset();
        view.suggestions.clear();
        view.recent_errors.clear();
        match result {
            Ok(_) => {
                info!("Stats reset");
                view.error = None;
                Ok(self.rendered(&view))
            }
            Err(e) => {
                warn!(error = %e, "Stats reset failed");
                view.error = Some(format!("Failed to reset stats: {e}"));
                Err(e.into())
            }
        }
    }
}

fn recent_first(errors: &[ErrorLogEntry]) -> Vec<ErrorLogEntry> {
    errors.iter().rev().take(VIEW_LIST_CAP).cloned().collect()
}

/// Spawn a background task that refreshes the presenter every `interval`,
/// starting immediately.
pub fn spawn_poll_task(
    presenter: Arc<DashboardPresenter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            presenter.refresh().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use crate::store::{MemorySettingsStore, SettingsStore};

    /// Memory store whose reads and/or writes can be made to fail or hang.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemorySettingsStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        stall_writes: AtomicBool,
    }

    #[async_trait]
    impl SettingsStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Query("disk unavailable".into()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
            if self.stall_writes.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Query("read-only".into()));
            }
            self.inner.set(key, value).await
        }
    }

    fn setup() -> (Arc<FlakyStore>, AutomatorState, DashboardPresenter) {
        let store = Arc::new(FlakyStore::default());
        let state = AutomatorState::new(store.clone(), "linkedin-automator");
        let presenter = DashboardPresenter::new(state.clone());
        (store, state, presenter)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn refresh_reads_everything() {
        let (_, state, presenter) = setup();
        state.set_enabled(true).await.unwrap();
        state
            .save_stats(&Stats {
                connections_suggested: 3,
                posts_liked: 1,
                last_activity: "Found 3 connection suggestions".into(),
                last_run: 1_700_000_000_000,
                ..Default::default()
            })
            .await
            .unwrap();
        state
            .replace_suggestions(&[ConnectionSuggestion {
                name: "Ana".into(),
                title: "VP Sales".into(),
                reason: "buyer".into(),
            }])
            .await
            .unwrap();

        let view = presenter.refresh().await;
        assert!(view.enabled);
        assert_eq!(view.stats.connections_suggested, 3);
        assert_eq!(view.suggestions.len(), 1);
        assert!(view.error.is_none());
        assert_eq!(presenter.view().await, view);
    }

    #[tokio::test]
    async fn refresh_shows_five_most_recent_errors() {
        let (_, state, presenter) = setup();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        for i in 0..8 {
            state
                .push_error(base + chrono::Duration::seconds(i), format!("error {i}"))
                .await
                .unwrap();
        }

        let view = presenter.refresh().await;
        let shown: Vec<_> = view.recent_errors.iter().map(|e| e.error.as_str()).collect();
        assert_eq!(shown, ["error 7", "error 6", "error 5", "error 4", "error 3"]);
    }

    #[tokio::test]
    async fn refresh_failure_sets_banner_and_keeps_data() {
        let (store, state, presenter) = setup();
        state.set_enabled(true).await.unwrap();
        presenter.refresh().await;

        store.fail_reads.store(true, Ordering::SeqCst);
        let view = presenter.refresh().await;
        assert!(view.enabled, "previous data kept");
        assert!(view.error.as_deref().unwrap().contains("disk unavailable"));

        store.fail_reads.store(false, Ordering::SeqCst);
        let view = presenter.refresh().await;
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn toggle_starts_and_stops() {
        let (_, state, presenter) = setup();

        let view = presenter.toggle_at(at(9, 5, 7)).await.unwrap();
        assert!(view.enabled);
        assert_eq!(view.stats.last_activity, "Automation started at 09:05:07");
        assert!(state.settings().await.unwrap().enabled);
        assert_eq!(
            state.stats().await.unwrap().last_activity,
            "Automation started at 09:05:07"
        );

        let view = presenter.toggle_at(at(17, 30, 0)).await.unwrap();
        assert!(!view.enabled);
        assert_eq!(view.stats.last_activity, "Automation stopped at 17:30:00");
        assert!(!view.toggle_in_flight);
    }

    #[tokio::test]
    async fn toggle_rejected_while_in_flight() {
        let (_, state, presenter) = setup();
        presenter.toggling.store(true, Ordering::SeqCst);

        let err = presenter.toggle().await.unwrap_err();
        assert!(matches!(err, DashboardError::ToggleInFlight));
        assert!(!state.settings().await.unwrap().enabled);
    }

    #[tokio::test]
    async fn toggle_failure_releases_flag() {
        let (store, _, presenter) = setup();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = presenter.toggle().await.unwrap_err();
        assert!(matches!(err, DashboardError::Store(_)));
        let view = presenter.view().await;
        assert!(!view.toggle_in_flight);
        assert!(view.error.as_deref().unwrap().starts_with("Failed to toggle"));

        store.fail_writes.store(false, Ordering::SeqCst);
        assert!(presenter.toggle().await.unwrap().enabled);
    }

    #[tokio::test]
    async fn aborted_toggle_does_not_leave_control_disabled() {
        let store = Arc::new(FlakyStore::default());
        let state = AutomatorState::new(store.clone(), "linkedin-automator");
        let presenter = Arc::new(DashboardPresenter::new(state));
        store.stall_writes.store(true, Ordering::SeqCst);

        let task = tokio::spawn({
            let presenter = Arc::clone(&presenter);
            async move { presenter.toggle().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(presenter.view().await.toggle_in_flight);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!presenter.refresh().await.toggle_in_flight);
        assert!(!presenter.view().await.toggle_in_flight);

        store.stall_writes.store(false, Ordering::SeqCst);
        assert!(presenter.toggle().await.unwrap().enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_task_recovers_after_failed_reads() {
        let store = Arc::new(FlakyStore::default());
        let state = AutomatorState::new(store.clone(), "linkedin-automator");
        state.set_enabled(true).await.unwrap();
        let presenter = Arc::new(DashboardPresenter::new(state));

        store.fail_reads.store(true, Ordering::SeqCst);
        let handle = spawn_poll_task(Arc::clone(&presenter), Duration::from_secs(5));

        // Several failed polls in a row.
        tokio::time::sleep(Duration::from_secs(12)).await;
        let view = presenter.view().await;
        assert!(view.error.as_deref().unwrap().contains("disk unavailable"));
        assert!(!view.enabled);

        store.fail_reads.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = presenter.view().await;
        assert!(view.error.is_none());
        assert!(view.enabled);

        handle.abort();
    }

    #[tokio::test]
    async fn reset_clears_state_and_is_idempotent() {
        let (_, state, presenter) = setup();
        state
            .save_stats(&Stats {
                connections_suggested: 9,
                posts_liked: 4,
                last_run: 42,
                ..Default::default()
            })
            .await
            .unwrap();
        state.push_error(Utc::now(), "boom").await.unwrap();
        presenter.refresh().await;

        for _ in 0..2 {
            let view = presenter.reset().await.unwrap();
            assert_eq!(view.stats, Stats::reset());
            assert!(view.suggestions.is_empty());
            assert!(view.recent_errors.is_empty());
            assert_eq!(presenter.refresh().await.stats, Stats::reset());
        }
    }

    #[tokio::test]
    async fn reset_failure_still_clears_view() {
        let (store, state, presenter) = setup();
        state.push_error(Utc::now(), "boom").await.unwrap();
        presenter.refresh().await;

        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(presenter.reset().await.is_err());
        let view = presenter.view().await;
        assert!(view.recent_errors.is_empty());
        assert!(view.error.is_some());
    }

    #[test]
    fn view_serializes_camel_case() {
        let json = serde_json::to_value(DashboardView::default()).unwrap();
        assert!(json.get("recentErrors").is_some());
        assert!(json.get("toggleInFlight").is_some());
        assert!(json["stats"].get("connectionsSuggested").is_some());
    }
}
