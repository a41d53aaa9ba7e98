// Core business logic module

pub mod config;
pub mod diagnostics;
pub mod monitor;
pub mod ops;
pub mod report;
pub mod session;

// Re-export commonly used items
pub use config::Config;
pub use monitor::{MonitorRuntime, MonitorState, SharedMonitor};
pub use ops::{OpOutcome, Status};
pub use session::Session;
