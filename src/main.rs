use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use linkedin_automator::automation::{CycleRunner, RunnerDeps, spawn_cycle_ticker};
use linkedin_automator::config::AutomatorConfig;
use linkedin_automator::dashboard::{DashboardPresenter, dashboard_routes, spawn_poll_task};
use linkedin_automator::llm::{LlmConfig, create_provider};
use linkedin_automator::screen::ScreenpipeClient;
use linkedin_automator::store::{
    AutomatorState, LibSqlSettingsStore, MemorySettingsStore, SettingsStore,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console logging, plus a daily-rolling file when `AUTOMATOR_LOG_DIR` is set.
fn init_tracing() -> anyhow::Result<Option<PathBuf>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = std::env::var("AUTOMATOR_LOG_DIR").ok().map(PathBuf::from);
    let file_layer = match &log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log dir {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("linkedin-automator")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(log_dir)
}

async fn open_store(db_path: &str) -> anyhow::Result<Arc<dyn SettingsStore>> {
    if db_path == ":memory:" {
        return Ok(Arc::new(MemorySettingsStore::new()));
    }
    let store = LibSqlSettingsStore::new_local(Path::new(db_path))
        .await
        .with_context(|| format!("opening settings store at {db_path}"))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = init_tracing()?;

    let config = AutomatorConfig::from_env();
    config.validate()?;
    let llm_config = LlmConfig::from_env();

    eprintln!("💼 LinkedIn Automator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Model: {} ({:?}) @ {}",
        llm_config.model,
        llm_config.backend,
        llm_config.base_url.as_deref().unwrap_or("provider default")
    );
    eprintln!("   Screenpipe: {}", config.screenpipe_url);
    eprintln!("   Database: {}", config.db_path);
    eprintln!(
        "   Cycle: every {}s (rate limit {}ms)",
        config.tick_interval.as_secs(),
        config.rate_limit.as_millis()
    );
    eprintln!("   Dashboard API: http://127.0.0.1:{}/api/dashboard", config.http_port);
    if let Some(dir) = &log_dir {
        eprintln!("   Logs: {}", dir.display());
    }
    if llm_config.api_key.is_none() {
        tracing::warn!("AI_API_KEY not set, requests will be sent without auth");
    }

    // ── Capabilities ─────────────────────────────────────────────────────
    let store = open_store(&config.db_path).await?;
    let state = AutomatorState::new(store, &config.key_prefix);
    let llm = create_provider(&llm_config)?;
    let screen = Arc::new(ScreenpipeClient::new(
        config.screenpipe_url.clone(),
        config.screenpipe_timeout,
    )?);

    // ── Runner + presenter ───────────────────────────────────────────────
    let runner = Arc::new(CycleRunner::new(
        RunnerDeps {
            state: state.clone(),
            llm,
            screen,
        },
        config.rate_limit,
    ));
    let presenter = Arc::new(DashboardPresenter::new(state));

    let cycle_handle = spawn_cycle_ticker(Arc::clone(&runner), config.tick_interval);
    let poll_handle = spawn_poll_task(Arc::clone(&presenter), config.poll_interval);

    // ── Dashboard API ────────────────────────────────────────────────────
    let app = dashboard_routes(presenter);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("binding dashboard port {}", config.http_port))?;
    tracing::info!(port = config.http_port, "Dashboard API started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down");
    cycle_handle.abort();
    poll_handle.abort();
    Ok(())
}
