// User interface module
// Terminal output for one-shot commands and the live dashboard

pub mod dashboard;
pub mod formatters;
pub mod printer;
pub mod progress;
pub mod prompts;

// Re-exports for convenience
pub use formatters::{format_bytes, format_duration, format_percent, format_time};
pub use printer::{print_outcome, print_summary};
pub use progress::follow_bulk;
pub use prompts::{confirm, confirm_or_skip, error, info, success, warn};
