//! Screenpipe local API client.
//!
//! Reads the newest OCR frame from `GET /search?limit=1&content_type=ocr`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{ScreenContext, ScreenSource};
use crate::error::ScreenError;

/// HTTP client for a running Screenpipe instance.
pub struct ScreenpipeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScreenpipeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ScreenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "type")]
    kind: String,
    content: OcrContent,
}

#[derive(Debug, Deserialize)]
struct OcrContent {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    browser_url: Option<String>,
    #[serde(default)]
    window_name: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl From<OcrContent> for ScreenContext {
    fn from(content: OcrContent) -> Self {
        Self {
            text: content.text,
            url: content.browser_url.filter(|u| !u.is_empty()),
            title: content.window_name,
            timestamp: content
                .timestamp
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Pick the newest OCR frame out of a search response.
fn context_from_response(resp: SearchResponse) -> Option<ScreenContext> {
    resp.data
        .into_iter()
        .find(|item| item.kind.eq_ignore_ascii_case("ocr"))
        .map(|item| item.content.into())
}

#[async_trait]
impl ScreenSource for ScreenpipeClient {
    async fn current_context(&self) -> Result<Option<ScreenContext>, ScreenError> {
        let resp = self
            .client
            .get(self.search_url())
            .query(&[("limit", "1"), ("content_type", "ocr")])
            .send()
            .await
            .map_err(|e| ScreenError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScreenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ScreenError::InvalidResponse(e.to_string()))?;

        let context = context_from_response(parsed);
        debug!(
            has_context = context.is_some(),
            url = context.as_ref().and_then(|c| c.url.as_deref()).unwrap_or(""),
            "Screenpipe context fetched"
        );
        Ok(context)
    }
}
