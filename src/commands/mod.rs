// Command handlers module
pub mod completions;
pub mod config;
pub mod files;
pub mod health;
pub mod monitor;
pub mod optimize;
pub mod power;
pub mod privacy;
pub mod security;
pub mod task;
pub mod version;

use anyhow::Result;

use crate::core::config::Config;
use crate::core::ops::{bulk, BulkStep, OpOutcome, Status};
use crate::ui::{confirm_or_skip, follow_bulk, print_outcome, print_summary};

/// What every handler gets besides its own arguments
pub struct Context {
    pub config: Config,
    /// `--yes`: answer confirmations in advance
    pub assume_yes: bool,
}

impl Context {
    pub fn new(config: Config, assume_yes: bool) -> Self {
        Self { config, assume_yes }
    }

    /// Ask before something destructive
    pub fn confirm(&self, message: &str) -> Result<bool> {
        Ok(confirm_or_skip(message, self.assume_yes)?)
    }
}

/// Print a record and hand its status back for the exit code
pub(crate) fn show<T>(outcome: OpOutcome<T>) -> Status {
    print_outcome(&outcome);
    outcome.status
}

/// Run steps on a bulk thread, printing progress as it arrives
pub(crate) fn run_bulk(name: &str, steps: Vec<BulkStep>) -> Result<Status> {
    let summary = follow_bulk(bulk::spawn(name, steps)?)?;
    print_summary(&summary);
    Ok(summary.status())
}

pub(crate) fn cancelled() -> Result<Status> {
    Ok(Status::Warning)
}
