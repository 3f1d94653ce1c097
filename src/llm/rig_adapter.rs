//! Adapter from rig's `CompletionModel` to [`ChatProvider`].

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::completion::message::{AssistantContent, Message};

use super::{ChatMessage, ChatProvider, CompletionRequest, Role};
use crate::error::LlmError;

/// Wraps any rig completion model as a [`ChatProvider`].
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    timeout: Duration,
    default_max_tokens: Option<u64>,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str, timeout: Duration) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            timeout,
            default_max_tokens: None,
        }
    }

    /// `max_tokens` to send when the request leaves it unset.
    pub fn with_default_max_tokens(mut self, max_tokens: u64) -> Self {
        self.default_max_tokens = Some(max_tokens);
        self
    }
}

/// A chat transcript reshaped into rig's preamble / history / prompt form.
#[derive(Debug, PartialEq, Eq)]
struct PromptParts {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: String,
}

/// System messages become the preamble and the last non-system message the
/// prompt. A transcript of only system messages is sent as the prompt itself.
fn split_messages(messages: &[ChatMessage]) -> PromptParts {
    let system = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut history: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();

    match history.pop() {
        Some(last) => PromptParts {
            preamble: (!system.is_empty()).then_some(system),
            history,
            prompt: last.content,
        },
        None => PromptParts {
            preamble: None,
            history,
            prompt: system,
        },
    }
}

fn to_rig_message(message: ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content),
        Role::User | Role::System => Message::user(message.content),
    }
}

/// Map a rig error message onto [`LlmError`].
fn classify_error(provider: &str, message: String) -> LlmError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else if lower.starts_with("jsonerror") || lower.starts_with("responseerror") {
        LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: message,
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: message,
        }
    }
}

#[async_trait]
impl<M> ChatProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn chat(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let parts = split_messages(&request.messages);

        let mut builder = self.model.completion_request(Message::user(parts.prompt));
        if let Some(preamble) = parts.preamble {
            builder = builder.preamble(preamble);
        }
        if !parts.history.is_empty() {
            builder = builder.messages(parts.history.into_iter().map(to_rig_message).collect());
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens.map(u64::from).or(self.default_max_tokens) {
            builder = builder.max_tokens(max_tokens);
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| classify_error(self.provider, e.to_string()))?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response had no text content".to_string(),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_only_transcript_becomes_prompt() {
        let parts = split_messages(&[ChatMessage::system("Classify this page")]);
        assert_eq!(
            parts,
            PromptParts {
                preamble: None,
                history: vec![],
                prompt: "Classify this page".into(),
            }
        );
    }

    #[test]
    fn system_messages_become_preamble() {
        let parts = split_messages(&[
            ChatMessage::system("You are terse."),
            ChatMessage::system("Answer LIKE or SKIP."),
            ChatMessage::user("first"),
            ChatMessage {
                role: Role::Assistant,
                content: "SKIP".into(),
            },
            ChatMessage::user("second"),
        ]);
        assert_eq!(
            parts.preamble.as_deref(),
            Some("You are terse.\n\nAnswer LIKE or SKIP.")
        );
        assert_eq!(parts.history.len(), 2);
        assert_eq!(parts.prompt, "second");
    }

    #[test]
    fn errors_classified() {
        assert!(matches!(
            classify_error("openai", "ProviderError: 429 Too Many Requests".into()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_error("openai", "ProviderError: 401 Unauthorized".into()),
            LlmError::AuthFailed { .. }
        ));
        assert!(matches!(
            classify_error("openai", "JsonError: missing field `choices`".into()),
            LlmError::InvalidResponse { .. }
        ));
        assert!(matches!(
            classify_error("openai", "HttpError: connection refused".into()),
            LlmError::RequestFailed { .. }
        ));
    }
}
