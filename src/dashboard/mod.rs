//! Dashboard presenter and its HTTP surface.

pub mod presenter;
pub mod routes;

pub use presenter::{DashboardPresenter, DashboardView, spawn_poll_task};
pub use routes::dashboard_routes;
