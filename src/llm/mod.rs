//! Chat-completion integration.
//!
//! The automator only needs one capability from a model: take a list of chat
//! messages and return free text. [`ChatProvider`] is that seam; the runner
//! never assumes the text is well-formed JSON.
//!
//! Supports:
//! - **OpenAI** and OpenAI-compatible local servers (custom base URL) via rig-core
//! - **Anthropic** via rig-core
//!
//! [`RigAdapter`] bridges rig's `CompletionModel` to [`ChatProvider`].

mod rig_adapter;

pub use rig_adapter::RigAdapter;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::env_parse;
use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Host AI chat capability: one free-text completion per call, no streaming.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Run a completion and return the raw response text.
    async fn chat(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Supported chat backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Anthropic,
}

impl LlmBackend {
    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!("unknown AI provider '{other}'")),
        }
    }
}

/// Configuration for creating a chat provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Endpoint override, e.g. `http://localhost:11434/v1` for Ollama.
    /// `None` uses the backend's public API.
    pub base_url: Option<String>,
    /// `None` for local servers that don't check auth.
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Build from `AI_*` environment variables.
    pub fn from_env() -> Self {
        let backend = env_parse::<LlmBackend>("AI_PROVIDER").unwrap_or(LlmBackend::OpenAi);
        Self {
            backend,
            base_url: std::env::var("AI_BASE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            api_key: std::env::var("AI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(secrecy::SecretString::from),
            model: std::env::var("AI_MODEL")
                .unwrap_or_else(|_| backend.default_model().to_string()),
            timeout: env_parse::<u64>("AI_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60)),
        }
    }

    fn api_key(&self) -> &str {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .unwrap_or_default()
    }
}

/// Create a chat provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn ChatProvider>, LlmError> {
    match config.backend {
        LlmBackend::OpenAi => create_openai_provider(config),
        LlmBackend::Anthropic => create_anthropic_provider(config),
    }
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn ChatProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> = match &config.base_url {
        Some(url) => openai::Client::builder()
            .api_key(config.api_key())
            .base_url(url.as_str())
            .build(),
        None => openai::Client::new(config.api_key()),
    }
    .map_err(|e| LlmError::RequestFailed {
        provider: "openai".to_string(),
        reason: format!("Failed to create OpenAI client: {e}"),
    })?;

    // Local servers only speak chat completions, not the Responses API.
    let model = client.completion_model(&config.model).completions_api();
    tracing::info!(
        model = %config.model,
        base_url = config.base_url.as_deref().unwrap_or("default"),
        "Using OpenAI chat provider"
    );
    Ok(Arc::new(RigAdapter::new(
        model,
        &config.model,
        "openai",
        config.timeout,
    )))
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn ChatProvider>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> = match &config.base_url {
        Some(url) => anthropic::Client::builder()
            .api_key(config.api_key())
            .base_url(url.as_str())
            .build(),
        None => anthropic::Client::new(config.api_key()),
    }
    .map_err(|e| LlmError::RequestFailed {
        provider: "anthropic".to_string(),
        reason: format!("Failed to create Anthropic client: {e}"),
    })?;

    let model = client.completion_model(&config.model);
    tracing::info!(model = %config.model, "Using Anthropic chat provider");
    // Anthropic rejects requests without max_tokens.
    Ok(Arc::new(
        RigAdapter::new(model, &config.model, "anthropic", config.timeout)
            .with_default_max_tokens(1024),
    ))
}
