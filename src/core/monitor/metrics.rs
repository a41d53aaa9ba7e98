use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a sampled metric; each key owns one rolling history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKey {
    Cpu,
    Ram,
    Gpu,
    GpuTemp,
    Disk(String),
    Battery,
    NetworkSent,
    NetworkRecv,
}

impl MetricKey {
    pub fn disk<S: Into<String>>(device: S) -> Self {
        MetricKey::Disk(device.into())
    }

    pub fn is_disk(&self) -> bool {
        matches!(self, MetricKey::Disk(_))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::Cpu => write!(f, "cpu"),
            MetricKey::Ram => write!(f, "ram"),
            MetricKey::Gpu => write!(f, "gpu"),
            MetricKey::GpuTemp => write!(f, "gpu_temp"),
            MetricKey::Disk(device) => write!(f, "disk:{}", device),
            MetricKey::Battery => write!(f, "battery"),
            MetricKey::NetworkSent => write!(f, "network:sent"),
            MetricKey::NetworkRecv => write!(f, "network:recv"),
        }
    }
}

/// One value produced by the sampler for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub key: MetricKey,
    pub value: f64,
    /// True when the read failed and a neutral value was recorded instead
    pub substituted: bool,
}

impl MetricSample {
    pub fn read(key: MetricKey, value: f64) -> Self {
        Self {
            key,
            value,
            substituted: false,
        }
    }

    pub fn substitute(key: MetricKey) -> Self {
        Self {
            key,
            value: 0.0,
            substituted: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuReading {
    pub name: String,
    pub load_percent: f64,
    pub temperature_celsius: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskReading {
    pub device: String,
    pub mount_point: String,
    /// None when this partition could not be read
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub percent: f64,
    pub plugged: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReading {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl NetworkReading {
    pub fn sent_mb(&self) -> u64 {
        self.bytes_sent / 1024 / 1024
    }

    pub fn recv_mb(&self) -> u64 {
        self.bytes_recv / 1024 / 1024
    }
}

/// Latest displayable value of every metric (labels in the dashboard).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Readings {
    pub tick: u64,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub gpu: Option<GpuReading>,
    pub disks: Vec<DiskReading>,
    pub battery: Option<BatteryReading>,
    pub network: Option<NetworkReading>,
}
