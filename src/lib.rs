//! LinkedIn Automator: advisory LinkedIn assistant driven by screen context.

pub mod automation;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod llm;
pub mod screen;
pub mod store;
