//! Multi-step operations with structured progress reporting.
//!
//! Steps run in order on a background thread. Each step is guarded, so one
//! failing step is reported and the run continues with the next one.

use serde::Serialize;
use std::thread;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::outcome::{guard, OpOutcome, Status};
use crate::error::{QdError, Result};

pub type StepAction = Box<dyn FnOnce() -> OpOutcome + Send>;

pub struct BulkStep {
    pub name: String,
    action: StepAction,
}

impl BulkStep {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> OpOutcome + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// Step whose operation returns a detailed outcome
    pub fn detailed<T, F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> OpOutcome<T> + Send + 'static,
    {
        Self::new(name, move || action().erase())
    }
}

impl std::fmt::Debug for BulkStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkStep").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    Started {
        name: String,
        total: usize,
    },
    Step {
        index: usize,
        name: String,
        status: Status,
        message: String,
        completed: usize,
        total: usize,
    },
    Finished(BulkSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkSummary {
    pub name: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub warnings: usize,
    pub failed: usize,
    /// One `step: message` line per attempted step
    pub lines: Vec<String>,
}

impl BulkSummary {
    pub fn status(&self) -> Status {
        if self.failed == 0 && self.warnings == 0 {
            Status::Success
        } else if self.attempted > 0 && self.failed == self.attempted {
            Status::Error
        } else {
            Status::Warning
        }
    }

    pub fn into_outcome(self) -> OpOutcome<BulkSummary> {
        let message = format!(
            "{}: {}/{} steps succeeded",
            self.name, self.succeeded, self.attempted
        );
        let outcome = match self.status() {
            Status::Success => OpOutcome::success(message),
            Status::Warning => OpOutcome::warning(message),
            Status::Error => OpOutcome::error(message),
        };
        outcome.with_items(self.lines.clone()).with_detail(self)
    }
}

/// Run `steps` in order on the current thread, reporting each one on `events`.
///
/// A closed receiver is ignored; every step is still attempted.
pub fn run_steps(
    name: &str,
    steps: Vec<BulkStep>,
    events: &UnboundedSender<ProgressEvent>,
) -> BulkSummary {
    let total = steps.len();
    let _ = events.send(ProgressEvent::Started {
        name: name.to_string(),
        total,
    });

    let mut summary = BulkSummary {
        name: name.to_string(),
        ..Default::default()
    };

    for (index, step) in steps.into_iter().enumerate() {
        let BulkStep { name: step_name, action } = step;
        let outcome = guard(&step_name, move || Ok(action()));

        summary.attempted += 1;
        match outcome.status {
            Status::Success => summary.succeeded += 1,
            Status::Warning => summary.warnings += 1,
            Status::Error => summary.failed += 1,
        }
        summary
            .lines
            .push(format!("{}: {}", step_name, outcome.message));

        let _ = events.send(ProgressEvent::Step {
            index,
            name: step_name,
            status: outcome.status,
            message: outcome.message,
            completed: summary.attempted,
            total,
        });
    }

    log::info!(
        "{} finished: {} ok, {} warnings, {} failed",
        name,
        summary.succeeded,
        summary.warnings,
        summary.failed
    );
    let _ = events.send(ProgressEvent::Finished(summary.clone()));
    summary
}

/// A bulk operation running in the background
pub struct BulkHandle {
    pub events: UnboundedReceiver<ProgressEvent>,
    join: thread::JoinHandle<BulkSummary>,
}

impl BulkHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end; pending events stay in `events`
    pub fn join(self) -> Result<BulkSummary> {
        self.join
            .join()
            .map_err(|_| QdError::task("bulk operation thread panicked"))
    }
}

pub fn spawn(name: impl Into<String>, steps: Vec<BulkStep>) -> Result<BulkHandle> {
    let name = name.into();
    let (tx, rx) = unbounded_channel();

    let join = thread::Builder::new()
        .name(format!("qdesk-bulk-{}", name))
        .spawn(move || run_steps(&name, steps, &tx))?;

    Ok(BulkHandle { events: rx, join })
}
