//! Tokio runtime that drives the sampler in the background.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::sampler::{Sampler, SamplerConfig};
use super::source::{MetricSource, SystemSource};
use super::state::{self, MonitorState, SharedMonitor};
use crate::error::{QdError, Result};

/// Owns the worker threads, the sampler task and its cancellation token.
///
/// Dropping the runtime stops sampling; `stop` does it explicitly and waits
/// for the tick in progress to finish.
pub struct MonitorRuntime {
    state: SharedMonitor,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl MonitorRuntime {
    /// Start sampling the real system
    pub fn start(config: SamplerConfig) -> Result<Self> {
        Self::start_with(SystemSource::new(), config)
    }

    pub fn start_with<S>(source: S, config: SamplerConfig) -> Result<Self>
    where
        S: MetricSource + 'static,
    {
        // Create Tokio runtime with 2 worker threads
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("qdesk-sampler")
            .build()?;

        let state = state::shared(config.capacity);
        let cancel = CancellationToken::new();

        let sampler = Sampler::new(source, state.clone(), config);
        let task = runtime.spawn(sampler.run(cancel.clone()));

        log::debug!("Monitor runtime started");

        Ok(Self {
            state,
            cancel,
            task: Some(task),
            runtime: Some(runtime),
        })
    }

    pub fn state(&self) -> SharedMonitor {
        self.state.clone()
    }

    pub fn snapshot(&self) -> MonitorState {
        state::snapshot(&self.state)
    }

    /// Handle for spawning more work on the sampler's worker threads
    pub fn handle(&self) -> Option<tokio::runtime::Handle> {
        self.runtime.as_ref().map(|rt| rt.handle().clone())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the sampler and wait for it to exit. Idempotent.
    pub fn stop(&mut self) -> Result<()> {
        self.cancel.cancel();

        let (Some(task), Some(runtime)) = (self.task.take(), self.runtime.as_ref()) else {
            return Ok(());
        };

        let joined = runtime.block_on(task);
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        log::debug!("Monitor runtime stopped");

        joined.map_err(|e| QdError::task(format!("sampler task failed: {}", e)))
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }
}

impl Drop for MonitorRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
