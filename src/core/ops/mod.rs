//! One-shot OS operations. Each returns an [`OpOutcome`] and never panics
//! its caller; multi-step runs are composed from [`BulkStep`]s.

pub mod automation;
pub mod bulk;
pub mod files;
pub mod netguard;
pub mod optimizer;
pub mod outcome;
pub mod privacy;
pub mod processes;
pub mod security;
pub mod walk;

pub use bulk::{BulkHandle, BulkStep, BulkSummary, ProgressEvent};
pub use outcome::{guard, unimplemented_op, OpOutcome, Status};
