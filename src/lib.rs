// QDesk Library - Public API

// Re-export error types
pub mod error;
pub use error::{QdError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::config::Config;
pub use core::session::Session;

// Initialize logging
pub fn init_logging() {
    init_logging_with(log::LevelFilter::Info);
}

/// Initialize logging with a default level; `RUST_LOG` still takes precedence.
pub fn init_logging_with(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}
