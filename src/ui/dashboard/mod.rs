//! Terminal dashboard: live gauges and sparklines plus one-key operations.
//!
//! The sampler runs on its own runtime; the dashboard only reads snapshots
//! of its state. Operations started from here run as bulk operations on a
//! background thread and stream their progress into the log pane.

mod app;
mod event_handler;
mod render;
mod widgets;

pub use app::{run_dashboard, DashboardApp, LogLine};
pub use event_handler::{event_for_key, DashboardEvent};
