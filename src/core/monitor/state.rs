use parking_lot::RwLock;
use std::sync::Arc;

use super::history::HistoryStore;
use super::metrics::Readings;

/// Everything the presentation layer reads from the sampler
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub histories: HistoryStore,
    pub readings: Readings,
}

impl MonitorState {
    pub fn new(capacity: usize) -> Self {
        Self {
            histories: HistoryStore::with_standard_keys(capacity),
            readings: Readings::default(),
        }
    }
}

/// Single writer (sampler), any number of readers (dashboard)
pub type SharedMonitor = Arc<RwLock<MonitorState>>;

pub fn shared(capacity: usize) -> SharedMonitor {
    Arc::new(RwLock::new(MonitorState::new(capacity)))
}

/// Clone the current state so readers never hold the lock while rendering
pub fn snapshot(state: &SharedMonitor) -> MonitorState {
    state.read().clone()
}
