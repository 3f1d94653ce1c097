//! Automation cycle runner.
//!
//! One call to [`CycleRunner::run_cycle`] is one host tick:
//! 1. enabled flag (off → nothing)
//! 2. rate-limit gate on `Stats::last_run` (before any model call)
//! 3. screen context, must carry a LinkedIn URL
//! 4. general page analysis → `last_activity`
//! 5. URL dispatch to every matching handler, sequentially
//! 6. `last_run = now`, stats persisted
//!
//! Nothing escapes a cycle: failures are written to the bounded error log.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::handlers::{HandlerContext, HandlerOutcome, PageHandler, default_handlers};
use super::model::Stats;
use super::prompts;
use crate::error::CycleError;
use crate::llm::{ChatMessage, ChatProvider, CompletionRequest};
use crate::screen::ScreenSource;
use crate::store::AutomatorState;

/// Longest page-analysis excerpt kept in `last_activity`.
const ANALYSIS_ACTIVITY_CHARS: usize = 200;

/// Host capabilities the runner depends on.
pub struct RunnerDeps {
    pub state: AutomatorState,
    pub llm: Arc<dyn ChatProvider>,
    pub screen: Arc<dyn ScreenSource>,
}

/// Result of one handler within a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledPage {
    pub handler: &'static str,
    /// `Err` carries the message that was written to the error log.
    pub result: Result<HandlerOutcome, String>,
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle is still in progress on this runner.
    AlreadyRunning,
    Disabled,
    RateLimited { wait: Duration },
    NoContext,
    NotLinkedIn,
    /// The cycle ran to the end; `handled` may be empty.
    Completed { handled: Vec<HandledPage> },
    /// A cycle-level failure, already recorded to the error log.
    Failed { error: String },
}

/// Runs automation cycles against injected host capabilities.
pub struct CycleRunner {
    deps: RunnerDeps,
    handlers: Vec<Box<dyn PageHandler>>,
    rate_limit: Duration,
    cycle_lock: Mutex<()>,
}

impl CycleRunner {
    /// Create a runner with the built-in handlers.
    pub fn new(deps: RunnerDeps, rate_limit: Duration) -> Self {
        Self::with_handlers(deps, rate_limit, default_handlers())
    }

    pub fn with_handlers(
        deps: RunnerDeps,
        rate_limit: Duration,
        handlers: Vec<Box<dyn PageHandler>>,
    ) -> Self {
        Self {
            deps,
            handlers,
            rate_limit,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &AutomatorState {
        &self.deps.state
    }

    /// Run one cycle now.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the current time were `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("Previous cycle still running, skipping tick");
            return CycleOutcome::AlreadyRunning;
        };

        let settings = match self.deps.state.settings().await {
            Ok(settings) => settings,
            Err(e) => return self.fail(now, e.into()).await,
        };
        if !settings.enabled {
            debug!("Automation disabled");
            return CycleOutcome::Disabled;
        }

        let mut stats = match self.deps.state.stats().await {
            Ok(stats) => stats,
            Err(e) => return self.fail(now, e.into()).await,
        };

        let limit_ms = i64::try_from(self.rate_limit.as_millis()).unwrap_or(i64::MAX);
        let elapsed_ms = stats.millis_since_last_run(now);
        if elapsed_ms < limit_ms {
            let wait = Duration::from_millis(limit_ms.saturating_sub(elapsed_ms).max(0) as u64);
            debug!(wait_ms = wait.as_millis() as u64, "Rate limited");
            return CycleOutcome::RateLimited { wait };
        }

        match self.run_page(now, &mut stats).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(now, e).await,
        }
    }

    async fn run_page(
        &self,
        now: DateTime<Utc>,
        stats: &mut Stats,
    ) -> Result<CycleOutcome, CycleError> {
        let Some(screen) = self.deps.screen.current_context().await? else {
            debug!("No screen context");
            return Ok(CycleOutcome::NoContext);
        };
        let Some(url) = screen.url() else {
            debug!("Screen context has no URL");
            return Ok(CycleOutcome::NoContext);
        };
        if !url.contains("linkedin.com") {
            debug!(url, "Not on LinkedIn, skipping");
            return Ok(CycleOutcome::NotLinkedIn);
        }

        info!(url, model = self.deps.llm.model_name(), "Analyzing LinkedIn page");

        let analysis = self
            .deps
            .llm
            .chat(CompletionRequest::new(vec![ChatMessage::system(
                prompts::page_analysis_prompt(screen.text(), url),
            )]))
            .await?;
        stats.last_activity = format!(
            "Page analysis: {}",
            prompts::truncate_chars(analysis.trim(), ANALYSIS_ACTIVITY_CHARS)
        );
        debug!(analysis = %analysis.trim(), "Page analysis");

        let cx = HandlerContext {
            llm: self.deps.llm.as_ref(),
            state: &self.deps.state,
            screen: &screen,
        };

        let mut handled = Vec::new();
        for handler in self.handlers.iter().filter(|h| h.matches(url)) {
            let result = match handler.handle(&cx, stats).await {
                Ok(outcome) => {
                    debug!(handler = handler.name(), ?outcome, "Handler finished");
                    Ok(outcome)
                }
                Err(e) => {
                    let err = CycleError::Handler {
                        handler: handler.name(),
                        source: Box::new(e),
                    };
                    warn!(error = %err, "Handler failed");
                    self.record_error(now, &err).await;
                    Err(err.to_string())
                }
            };
            handled.push(HandledPage {
                handler: handler.name(),
                result,
            });
        }

        stats.mark_run(now);
        self.deps.state.save_stats(stats).await?;

        info!(
            handlers = handled.len(),
            connections = stats.connections_suggested,
            likes = stats.posts_liked,
            "Cycle complete"
        );
        Ok(CycleOutcome::Completed { handled })
    }

    async fn fail(&self, now: DateTime<Utc>, err: CycleError) -> CycleOutcome {
        error!(error = %err, "Automation cycle failed");
        self.record_error(now, &err).await;
        CycleOutcome::Failed {
            error: err.to_string(),
        }
    }

    async fn record_error(&self, now: DateTime<Utc>, err: &CycleError) {
        if let Err(e) = self.deps.state.push_error(now, err.to_string()).await {
            warn!(error = %e, "Could not append to error log");
        }
    }
}

/// Spawn a background task that runs one cycle per `interval`.
///
/// Each cycle is awaited before the next tick, so cycles never overlap.
pub fn spawn_cycle_ticker(
    runner: Arc<CycleRunner>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let outcome = runner.run_cycle().await;
            debug!(?outcome, "Tick");
        }
    })
}
