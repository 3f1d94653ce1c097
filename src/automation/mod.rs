//! Automation core: data model, prompts, payload extraction, page handlers
//! and the cycle runner.

pub mod extract;
pub mod handlers;
pub mod model;
pub mod prompts;
pub mod runner;

pub use handlers::{HandlerContext, HandlerOutcome, PageHandler, default_handlers};
pub use model::{
    AutomationSettings, ConnectionSuggestion, ErrorLogEntry, ProfileAnalysis, Stats,
};
pub use runner::{CycleOutcome, CycleRunner, HandledPage, RunnerDeps, spawn_cycle_ticker};
