//! Screen-context capability.

mod screenpipe;

pub use screenpipe::ScreenpipeClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

/// Snapshot of the current foreground screen/browser content.
///
/// Every field is optional; the host may return an empty or partial snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenContext {
    pub text: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ScreenContext {
    /// The URL, if present and non-blank.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Screen text, or an empty string when none was captured.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Host screen-context query.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    /// Fetch the latest screen snapshot. `Ok(None)` means nothing was captured.
    async fn current_context(&self) -> Result<Option<ScreenContext>, ScreenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_treated_as_missing() {
        let ctx = ScreenContext {
            url: Some("   ".into()),
            ..Default::default()
        };
        assert!(ctx.url().is_none());
    }

    #[test]
    fn missing_text_is_empty() {
        assert_eq!(ScreenContext::default().text(), "");
    }
}
