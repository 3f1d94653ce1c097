//! Persistence layer: key/value settings store and the typed state on top.

pub mod libsql_backend;
pub mod memory;
pub mod state;
pub mod traits;

pub use libsql_backend::LibSqlSettingsStore;
pub use memory::MemorySettingsStore;
pub use state::{AutomatorState, StateKeys};
pub use traits::SettingsStore;
