//! Live metrics: rolling histories fed by a periodic sampler.

pub mod gpu;
pub mod history;
pub mod metrics;
pub mod runtime;
pub mod sampler;
pub mod source;
pub mod state;

pub use history::{HistoryStore, RollingHistory, DEFAULT_HISTORY_SIZE};
pub use metrics::{
    BatteryReading, DiskReading, GpuReading, MetricKey, MetricSample, NetworkReading, Readings,
};
pub use runtime::MonitorRuntime;
pub use sampler::{Cadence, Sampler, SamplerConfig, TickReport};
pub use source::{MetricSource, SystemSource};
pub use state::{MonitorState, SharedMonitor};
