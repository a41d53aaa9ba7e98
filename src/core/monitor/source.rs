//! Metric sources read by the sampler.
//!
//! Every read is fallible on its own; the sampler decides what to record
//! when one of them fails.

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use super::gpu::GpuProvider;
use super::metrics::{BatteryReading, DiskReading, GpuReading, NetworkReading};
use crate::error::{QdError, Result};
use crate::platform::{gpu::get_gpu_provider, power_source};

/// A provider of raw system counters
pub trait MetricSource: Send {
    fn cpu_percent(&mut self) -> Result<f64>;

    fn ram_percent(&mut self) -> Result<f64>;

    fn gpu(&mut self) -> Result<GpuReading>;

    /// Mounted partitions; an unreadable partition has `usage_percent == None`
    fn disks(&mut self) -> Result<Vec<DiskReading>>;

    /// `Ok(None)` when the machine has no battery
    fn battery(&mut self) -> Result<Option<BatteryReading>>;

    fn network(&mut self) -> Result<NetworkReading>;
}

/// Source backed by sysinfo, NVML and the battery crate
pub struct SystemSource {
    system: System,
    disks: Disks,
    networks: Networks,
    gpu_provider: Option<Box<dyn GpuProvider>>,
}

impl SystemSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        // Try to initialize GPU provider (graceful failure)
        let gpu_provider = match get_gpu_provider() {
            Ok(provider) => Some(provider),
            Err(e) => {
                log::info!("GPU metrics disabled: {}", e);
                None
            }
        };

        Self {
            system: System::new_with_specifics(refresh_kind),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            gpu_provider,
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn cpu_percent(&mut self) -> Result<f64> {
        self.system.refresh_cpu_usage();
        Ok(self.system.global_cpu_usage() as f64)
    }

    fn ram_percent(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(QdError::metric_unavailable("total memory reported as 0"));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn gpu(&mut self) -> Result<GpuReading> {
        match self.gpu_provider.as_mut() {
            Some(provider) => provider.read(),
            None => Err(QdError::gpu_not_available("no supported GPU")),
        }
    }

    fn disks(&mut self) -> Result<Vec<DiskReading>> {
        self.disks.refresh(true);

        Ok(self
            .disks
            .iter()
            .filter(|disk| is_monitored_partition(&disk.file_system().to_string_lossy()))
            .map(|disk| {
                let total = disk.total_space();
                let used = total.saturating_sub(disk.available_space());
                DiskReading {
                    device: disk.name().to_string_lossy().to_string(),
                    mount_point: disk.mount_point().to_string_lossy().to_string(),
                    usage_percent: (total > 0).then(|| used as f64 / total as f64 * 100.0),
                }
            })
            .collect())
    }

    fn battery(&mut self) -> Result<Option<BatteryReading>> {
        power_source::read_battery()
    }

    fn network(&mut self) -> Result<NetworkReading> {
        self.networks.refresh(true);

        Ok(self
            .networks
            .values()
            .fold(NetworkReading::default(), |acc, data| NetworkReading {
                bytes_sent: acc.bytes_sent + data.total_transmitted(),
                bytes_recv: acc.bytes_recv + data.total_received(),
            }))
    }
}

/// Skip pseudo filesystems and optical drives
pub fn is_monitored_partition(fs_type: &str) -> bool {
    let fs = fs_type.to_ascii_lowercase();
    !fs.is_empty() && !matches!(fs.as_str(), "cdfs" | "iso9660" | "udf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_filter() {
        assert!(is_monitored_partition("NTFS"));
        assert!(is_monitored_partition("ext4"));
        assert!(!is_monitored_partition(""));
        assert!(!is_monitored_partition("CDFS"));
        assert!(!is_monitored_partition("iso9660"));
    }
}
