//! Uniform result record returned by every one-shot operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{QdError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Warning => write!(f, "warning"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// `{status, message, items, detail}`; `detail` carries operation-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpOutcome<T = ()> {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<T>,
}

impl<T> OpOutcome<T> {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            items: Vec::new(),
            detail: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Status::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_detail(mut self, detail: T) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Drop the detail payload (for bulk steps and printers)
    pub fn erase(self) -> OpOutcome {
        OpOutcome {
            status: self.status,
            message: self.message,
            items: self.items,
            detail: None,
        }
    }
}

/// Run an operation, turning both `Err` and panics into an error record.
pub fn guard<T, F>(name: &str, f: F) -> OpOutcome<T>
where
    F: FnOnce() -> Result<OpOutcome<T>>,
{
    let outcome = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(QdError::Unsupported(what))) => {
            OpOutcome::warning(format!("{} is not available here: {}", name, what))
        }
        Ok(Err(e)) => {
            log::error!("{} failed: {}", name, e);
            OpOutcome::error(format!("{} failed: {}", name, e))
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unexpected failure".to_string());
            log::error!("{} panicked: {}", name, reason);
            OpOutcome::error(format!("{} failed unexpectedly: {}", name, reason))
        }
    };

    if outcome.status != Status::Error {
        log::info!("{}: {}", name, outcome.message);
    }
    outcome
}

/// Record for operations that are deliberately not performed
pub fn unimplemented_op<T>(name: &str, reason: &str) -> OpOutcome<T> {
    log::warn!("{} is not implemented", name);
    OpOutcome::warning(format!("{} is not implemented: {}", name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let outcome: OpOutcome = OpOutcome::warning("careful");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"warning","message":"careful"}"#);
    }

    #[test]
    fn test_guard_passes_through_outcome() {
        let outcome = guard("ok", || Ok(OpOutcome::success("done").with_detail(3u32)));
        assert!(outcome.is_success());
        assert_eq!(outcome.detail, Some(3));
    }

    #[test]
    fn test_guard_converts_error() {
        let outcome: OpOutcome = guard("clean", || Err(QdError::permission_denied("C:\\Windows")));
        assert!(outcome.is_error());
        assert!(outcome.message.contains("Permission denied"));
    }

    #[test]
    fn test_guard_turns_unsupported_into_warning() {
        let outcome: OpOutcome = guard("prefetch", || Err(QdError::unsupported("Windows only")));
        assert_eq!(outcome.status, Status::Warning);
    }

    #[test]
    fn test_guard_catches_panic() {
        let outcome: OpOutcome = guard("boom", || panic!("index out of range"));
        assert!(outcome.is_error());
        assert!(outcome.message.contains("index out of range"));
    }

    #[test]
    fn test_unimplemented_is_warning() {
        let outcome: OpOutcome = unimplemented_op("optimize_boot", "boot tuning is not performed");
        assert_eq!(outcome.status, Status::Warning);
    }
}
