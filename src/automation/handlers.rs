//! Page-category handlers.
//!
//! Each handler decides from the URL alone whether it applies, makes one model
//! call, and records an advisory result. None of them touch the live page.
//!
//! A response without a usable payload yields [`HandlerOutcome::NoResult`],
//! not an error: only capability failures (model, store) are `Err`.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use super::extract::{extract_list, extract_object};
use super::model::{ConnectionSuggestion, ProfileAnalysis, Stats};
use super::prompts;
use crate::error::{LlmError, ParseMiss, Result};
use crate::llm::{ChatMessage, ChatProvider, CompletionRequest};
use crate::screen::ScreenContext;
use crate::store::AutomatorState;

/// Temperature for classification calls.
const CLASSIFY_TEMPERATURE: f32 = 0.2;

static PROFILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/in/[\w-]+/?$").expect("profile path regex is valid"));

/// Everything a handler may read or write during one cycle.
pub struct HandlerContext<'a> {
    pub llm: &'a dyn ChatProvider,
    pub state: &'a AutomatorState,
    pub screen: &'a ScreenContext,
}

impl HandlerContext<'_> {
    async fn ask(&self, prompt: String, max_tokens: u32) -> std::result::Result<String, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::system(prompt)])
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(max_tokens);
        self.llm.chat(request).await
    }
}

/// What a handler concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// People-search: this many suggestions were found.
    Suggested { count: usize },
    /// Feed: the post is worth liking.
    Liked,
    /// Feed: not worth liking, or the verdict was unreadable.
    Skipped,
    /// Profile: connecting is recommended.
    Connect,
    /// Profile: connecting is not recommended.
    NoConnect,
    /// The response carried no usable payload.
    NoResult(ParseMiss),
}

/// A page-category-specific classification routine.
#[async_trait]
pub trait PageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this handler applies to `url`.
    fn matches(&self, url: &str) -> bool;

    /// Classify the page, updating `stats` in place.
    async fn handle(
        &self,
        cx: &HandlerContext<'_>,
        stats: &mut Stats,
    ) -> Result<HandlerOutcome>;
}

/// The three built-in handlers, in dispatch order.
pub fn default_handlers() -> Vec<Box<dyn PageHandler>> {
    vec![
        Box::new(PeopleSearchHandler),
        Box::new(FeedPostHandler),
        Box::new(ProfilePageHandler),
    ]
}

// ── People search ───────────────────────────────────────────────────

pub struct PeopleSearchHandler;

#[async_trait]
impl PageHandler for PeopleSearchHandler {
    fn name(&self) -> &'static str {
        "people-search"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("/search/results/people")
    }

    async fn handle(
        &self,
        cx: &HandlerContext<'_>,
        stats: &mut Stats,
    ) -> Result<HandlerOutcome> {
        let response = cx
            .ask(prompts::people_search_prompt(cx.screen.text()), 800)
            .await?;

        let suggestions: Vec<ConnectionSuggestion> = match extract_list(&response) {
            Ok(list) => list,
            Err(miss) => {
                debug!(error = %miss, "No suggestion list in response");
                return Ok(HandlerOutcome::NoResult(miss));
            }
        };

        let count = suggestions.len();
        let kept = cx.state.replace_suggestions(&suggestions).await?;
        stats.connections_suggested += count as u64;
        stats.last_activity = format!("Found {count} connection suggestions");

        info!(count, kept, "Connection suggestions recorded");
        Ok(HandlerOutcome::Suggested { count })
    }
}

// ── Feed post ───────────────────────────────────────────────────────

pub struct FeedPostHandler;

/// `true` only for a bare `LIKE`, ignoring case and surrounding whitespace.
pub fn is_like_verdict(response: &str) -> bool {
    response.trim().to_uppercase() == "LIKE"
}

#[async_trait]
impl PageHandler for FeedPostHandler {
    fn name(&self) -> &'static str {
        "feed-post"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("/feed/")
    }

    async fn handle(
        &self,
        cx: &HandlerContext<'_>,
        stats: &mut Stats,
    ) -> Result<HandlerOutcome> {
        let response = cx
            .ask(prompts::feed_post_prompt(cx.screen.text()), 10)
            .await?;

        if is_like_verdict(&response) {
            stats.posts_liked += 1;
            stats.last_activity = "Recommended liking a relevant post".to_string();
            info!("Post recommended for a like");
            Ok(HandlerOutcome::Liked)
        } else {
            stats.last_activity = "Skipped post (not relevant enough)".to_string();
            debug!(verdict = %response.trim(), "Post skipped");
            Ok(HandlerOutcome::Skipped)
        }
    }
}

// ── Profile page ────────────────────────────────────────────────────

pub struct ProfilePageHandler;

#[async_trait]
impl PageHandler for ProfilePageHandler {
    fn name(&self) -> &'static str {
        "profile-page"
    }

    fn matches(&self, url: &str) -> bool {
        PROFILE_PATH.is_match(url)
    }

    async fn handle(
        &self,
        cx: &HandlerContext<'_>,
        stats: &mut Stats,
    ) -> Result<HandlerOutcome> {
        let response = cx
            .ask(prompts::profile_prompt(cx.screen.text()), 400)
            .await?;

        let analysis: ProfileAnalysis = match extract_object(&response) {
            Ok(analysis) => analysis,
            Err(miss) => {
                debug!(error = %miss, "No profile verdict in response");
                return Ok(HandlerOutcome::NoResult(miss));
            }
        };

        if !analysis.should_connect {
            info!(reason = %analysis.reason, "Profile not worth connecting");
            return Ok(HandlerOutcome::NoConnect);
        }

        cx.state.save_profile_analysis(&analysis).await?;
        stats.connections_suggested += 1;
        stats.last_activity = format!("Suggested connecting: {}", analysis.reason);

        info!(
            reason = %analysis.reason,
            has_message = analysis.message.is_some(),
            "Profile connection suggested"
        );
        Ok(HandlerOutcome::Connect)
    }
}
