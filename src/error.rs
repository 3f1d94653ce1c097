//! Error types for the LinkedIn automator.

use std::time::Duration;

/// Error raised by a page handler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settings-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error for key {key}: {reason}")]
    Serialization { key: String, reason: String },
}

/// Chat provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Screen-context query errors.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("Screen query failed: {0}")]
    RequestFailed(String),

    #[error("Screen query returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid screen query response: {0}")]
    InvalidResponse(String),
}

/// Errors raised inside an automation cycle.
///
/// Every variant is recorded to the bounded error log by the runner and never
/// escapes a cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("{handler} handler failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Screen context unavailable: {0}")]
    Screen(#[from] ScreenError),

    #[error("Page analysis failed: {0}")]
    Llm(#[from] LlmError),

    #[error("State update failed: {0}")]
    Store(#[from] StoreError),
}

/// Dashboard action errors.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("A toggle is already in progress")]
    ToggleInFlight,

    #[error("Failed to update automation state: {0}")]
    Store(#[from] StoreError),
}

/// An AI response that carried no usable structured payload.
///
/// Deliberately not convertible into [`Error`]: a parse miss means "nothing
/// actionable" and is never written to the error log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMiss {
    #[error("no {0} delimited payload found")]
    NotFound(&'static str),

    #[error("payload did not parse: {0}")]
    Malformed(String),
}

/// Result type alias for handler code.
pub type Result<T> = std::result::Result<T, Error>;
