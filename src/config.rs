//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default key namespace for persisted state.
pub const DEFAULT_KEY_PREFIX: &str = "linkedin-automator";

/// Minimum time between two cycles that issue AI calls.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(30_000);

/// Automator configuration.
#[derive(Debug, Clone)]
pub struct AutomatorConfig {
    /// Rate-limit gate applied before any AI call in a cycle.
    pub rate_limit: Duration,
    /// How often the standalone host ticks the cycle runner.
    pub tick_interval: Duration,
    /// How often the dashboard presenter re-reads persisted state.
    pub poll_interval: Duration,
    /// Namespace prefix for every persisted key.
    pub key_prefix: String,
    /// libSQL database path (`:memory:` for a volatile store).
    pub db_path: String,
    /// Port for the dashboard API.
    pub http_port: u16,
    /// Screenpipe local API base URL.
    pub screenpipe_url: String,
    /// Timeout for a single screen query.
    pub screenpipe_timeout: Duration,
}

impl Default for AutomatorConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            tick_interval: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            db_path: "./data/linkedin-automator.db".to_string(),
            http_port: 8787,
            screenpipe_url: "http://localhost:3030".to_string(),
            screenpipe_timeout: Duration::from_secs(10),
        }
    }
}

impl AutomatorConfig {
    /// Build from `AUTOMATOR_*` / `SCREENPIPE_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_limit: env_parse::<u64>("AUTOMATOR_RATE_LIMIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.rate_limit),
            tick_interval: env_parse::<u64>("AUTOMATOR_TICK_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick_interval),
            poll_interval: env_parse::<u64>("AUTOMATOR_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            key_prefix: std::env::var("AUTOMATOR_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            db_path: std::env::var("AUTOMATOR_DB_PATH").unwrap_or(defaults.db_path),
            http_port: env_parse("AUTOMATOR_HTTP_PORT").unwrap_or(defaults.http_port),
            screenpipe_url: std::env::var("SCREENPIPE_URL").unwrap_or(defaults.screenpipe_url),
            screenpipe_timeout: env_parse::<u64>("SCREENPIPE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.screenpipe_timeout),
        }
    }

    /// Reject values that would disable the rate limiter or spin the timers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "AUTOMATOR_RATE_LIMIT_MS".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.tick_interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                key: "AUTOMATOR_TICK_SECS".into(),
                message: "must be at least 1 second".into(),
            });
        }
        if self.poll_interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                key: "AUTOMATOR_POLL_SECS".into(),
                message: "must be at least 1 second".into(),
            });
        }
        if self.key_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "AUTOMATOR_KEY_PREFIX".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Parse an env var, warning (not failing) when it is set but unparseable.
pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}
