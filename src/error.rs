use std::io;
use thiserror::Error;

/// Custom error type for QDesk
#[derive(Error, Debug)]
pub enum QdError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Elevation required: {0}")]
    ElevationRequired(String),

    #[error("Command `{program}` failed: {detail}")]
    CommandFailed { program: String, detail: String },

    #[error("Not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Metric unavailable: {0}")]
    MetricUnavailable(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for QDesk
pub type Result<T> = std::result::Result<T, QdError>;

impl QdError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        QdError::Config(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        QdError::PermissionDenied(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path<S: Into<String>>(msg: S) -> Self {
        QdError::InvalidPath(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        QdError::InvalidInput(msg.into())
    }

    /// Create an elevation required error
    pub fn elevation_required<S: Into<String>>(msg: S) -> Self {
        QdError::ElevationRequired(msg.into())
    }

    pub fn command_failed<P: Into<String>, D: Into<String>>(program: P, detail: D) -> Self {
        QdError::CommandFailed {
            program: program.into(),
            detail: detail.into(),
        }
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        QdError::Unsupported(msg.into())
    }

    pub fn metric_unavailable<S: Into<String>>(msg: S) -> Self {
        QdError::MetricUnavailable(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        QdError::GpuNotAvailable(msg.into())
    }

    pub fn task<S: Into<String>>(msg: S) -> Self {
        QdError::Task(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        QdError::Other(msg.into())
    }
}
