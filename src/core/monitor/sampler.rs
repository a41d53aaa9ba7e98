//! Periodic metrics sampler.
//!
//! One tick reads CPU and RAM; GPU, disks, battery and network are read on
//! every Nth tick. A failed read records a zero for that metric and never
//! affects the other reads of the same tick.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::metrics::{DiskReading, MetricKey, MetricSample};
use super::source::MetricSource;
use super::state::SharedMonitor;
use crate::core::config::SamplerSettings;
use crate::error::Result;

/// Sub-cadences, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub gpu_every: u64,
    pub disks_every: u64,
    pub slow_every: u64,
}

impl Cadence {
    fn due(every: u64, tick: u64) -> bool {
        every <= 1 || tick % every == 0
    }

    pub fn gpu_due(&self, tick: u64) -> bool {
        Self::due(self.gpu_every, tick)
    }

    pub fn disks_due(&self, tick: u64) -> bool {
        Self::due(self.disks_every, tick)
    }

    pub fn slow_due(&self, tick: u64) -> bool {
        Self::due(self.slow_every, tick)
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            gpu_every: 2,
            disks_every: 5,
            slow_every: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub tick: Duration,
    pub capacity: usize,
    pub cadence: Cadence,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::from(&SamplerSettings::default())
    }
}

impl From<&SamplerSettings> for SamplerConfig {
    fn from(settings: &SamplerSettings) -> Self {
        Self {
            tick: Duration::from_millis(settings.tick_ms.max(1)),
            capacity: settings.history_capacity,
            cadence: Cadence {
                gpu_every: settings.gpu_every,
                disks_every: settings.disks_every,
                slow_every: settings.slow_every,
            },
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub samples: Vec<MetricSample>,
}

impl TickReport {
    pub fn sampled(&self) -> Vec<&MetricKey> {
        self.samples.iter().map(|s| &s.key).collect()
    }

    pub fn substituted(&self) -> Vec<&MetricKey> {
        self.samples
            .iter()
            .filter(|s| s.substituted)
            .map(|s| &s.key)
            .collect()
    }
}

pub struct Sampler<S: MetricSource> {
    source: S,
    state: SharedMonitor,
    config: SamplerConfig,
    tick: u64,
}

impl<S: MetricSource> Sampler<S> {
    pub fn new(source: S, state: SharedMonitor, config: SamplerConfig) -> Self {
        Self {
            source,
            state,
            config,
            tick: 0,
        }
    }

    pub fn state(&self) -> &SharedMonitor {
        &self.state
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Run one sampling iteration and publish the results.
    ///
    /// Reads happen before the state lock is taken so readers are never
    /// blocked on OS calls.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let tick = self.tick;
        let cadence = self.config.cadence;
        let mut samples = Vec::new();

        let cpu = read_masked("cpu", || self.source.cpu_percent());
        samples.push(sample_or_zero(MetricKey::Cpu, cpu));

        let ram = read_masked("ram", || self.source.ram_percent());
        samples.push(sample_or_zero(MetricKey::Ram, ram));

        let gpu = cadence.gpu_due(tick).then(|| {
            let reading = read_masked("gpu", || self.source.gpu());
            samples.push(sample_or_zero(
                MetricKey::Gpu,
                reading.as_ref().map(|g| g.load_percent),
            ));
            samples.push(sample_or_zero(
                MetricKey::GpuTemp,
                reading.as_ref().map(|g| g.temperature_celsius),
            ));
            reading
        });

        let disks = cadence
            .disks_due(tick)
            .then(|| read_masked("disks", || self.source.disks()).map(dedup_devices));

        let slow = cadence.slow_due(tick).then(|| {
            let battery = read_masked("battery", || self.source.battery()).flatten();
            samples.push(sample_or_zero(
                MetricKey::Battery,
                battery.map(|b| b.percent),
            ));

            let network = read_masked("network", || self.source.network());
            samples.push(sample_or_zero(
                MetricKey::NetworkSent,
                network.map(|n| n.sent_mb() as f64),
            ));
            samples.push(sample_or_zero(
                MetricKey::NetworkRecv,
                network.map(|n| n.recv_mb() as f64),
            ));
            (battery, network)
        });

        let mut state = self.state.write();

        if let Some(disks) = &disks {
            match disks {
                Some(list) => {
                    for disk in list {
                        samples.push(sample_or_zero(
                            MetricKey::disk(disk.device.clone()),
                            disk.usage_percent,
                        ));
                    }
                }
                None => {
                    // Listing failed: every known partition gets a placeholder
                    for key in state.histories.disk_keys() {
                        samples.push(MetricSample::substitute(key));
                    }
                }
            }
        }

        for sample in &samples {
            state.histories.record(sample);
        }

        state.readings.tick = tick;
        state.readings.cpu_percent = cpu.unwrap_or_default();
        state.readings.ram_percent = ram.unwrap_or_default();
        if let Some(gpu) = gpu {
            state.readings.gpu = gpu;
        }
        if let Some(Some(list)) = disks {
            state.readings.disks = list;
        } else if let Some(None) = disks {
            for disk in state.readings.disks.iter_mut() {
                disk.usage_percent = None;
            }
        }
        if let Some((battery, network)) = slow {
            state.readings.battery = battery;
            state.readings.network = network;
        }

        drop(state);

        TickReport { tick, samples }
    }

    /// Tick on a fixed interval until `cancel` fires.
    ///
    /// Cancellation is checked once per iteration; a tick in progress always
    /// completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        log::debug!("Sampler started ({:?} per tick)", self.config.tick);

        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Sampler stopping after {} ticks", self.tick);
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick();
                    log::trace!(
                        "tick {}: {} samples, {} substituted",
                        report.tick,
                        report.samples.len(),
                        report.substituted().len()
                    );
                }
            }
        }
    }
}

/// Read one metric; errors and panics are logged and masked as `None`
fn read_masked<T>(label: &str, read: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(read)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::debug!("{} read failed: {}", label, e);
            None
        }
        Err(_) => {
            log::debug!("{} read panicked", label);
            None
        }
    }
}

fn sample_or_zero(key: MetricKey, value: Option<f64>) -> MetricSample {
    match value {
        Some(v) if v.is_finite() => MetricSample::read(key, v),
        _ => MetricSample::substitute(key),
    }
}

/// Keep the first partition seen for each device name
fn dedup_devices(list: Vec<DiskReading>) -> Vec<DiskReading> {
    let mut seen = HashSet::new();
    list.into_iter()
        .filter(|d| seen.insert(d.device.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::monitor::metrics::{BatteryReading, GpuReading, NetworkReading};
    use crate::core::monitor::state;
    use crate::error::QdError;

    /// Source whose reads can be switched to failures one by one
    #[derive(Default)]
    struct FakeSource {
        cpu: f64,
        fail_cpu: bool,
        fail_gpu: bool,
        panic_gpu: bool,
        fail_disks: bool,
        disks: Vec<DiskReading>,
        fail_network: bool,
    }

    impl MetricSource for FakeSource {
        fn cpu_percent(&mut self) -> Result<f64> {
            if self.fail_cpu {
                Err(QdError::metric_unavailable("cpu"))
            } else {
                Ok(self.cpu)
            }
        }

        fn ram_percent(&mut self) -> Result<f64> {
            Ok(50.0)
        }

        fn gpu(&mut self) -> Result<GpuReading> {
            if self.panic_gpu {
                panic!("driver exploded");
            }
            if self.fail_gpu {
                return Err(QdError::gpu_not_available("none"));
            }
            Ok(GpuReading {
                name: "Fake".into(),
                load_percent: 33.0,
                temperature_celsius: 61.0,
            })
        }

        fn disks(&mut self) -> Result<Vec<DiskReading>> {
            if self.fail_disks {
                Err(QdError::permission_denied("disks"))
            } else {
                Ok(self.disks.clone())
            }
        }

        fn battery(&mut self) -> Result<Option<BatteryReading>> {
            Ok(Some(BatteryReading {
                percent: 80.0,
                plugged: true,
            }))
        }

        fn network(&mut self) -> Result<NetworkReading> {
            if self.fail_network {
                Err(QdError::metric_unavailable("net"))
            } else {
                Ok(NetworkReading {
                    bytes_sent: 3 * 1024 * 1024,
                    bytes_recv: 7 * 1024 * 1024,
                })
            }
        }
    }

    fn sampler(source: FakeSource) -> Sampler<FakeSource> {
        Sampler::new(source, state::shared(60), SamplerConfig::default())
    }

    fn disk(device: &str, usage: Option<f64>) -> DiskReading {
        DiskReading {
            device: device.into(),
            mount_point: format!("/mnt/{}", device),
            usage_percent: usage,
        }
    }

    #[test]
    fn test_cadence_schedule() {
        let mut s = sampler(FakeSource {
            disks: vec![disk("sda1", Some(10.0))],
            ..Default::default()
        });

        let t1 = s.tick();
        assert_eq!(t1.sampled(), vec![&MetricKey::Cpu, &MetricKey::Ram]);

        let t2 = s.tick();
        assert!(t2.sampled().contains(&&MetricKey::Gpu));
        assert!(!t2.sampled().contains(&&MetricKey::disk("sda1")));

        for _ in 3..5 {
            s.tick();
        }
        let t5 = s.tick();
        assert!(t5.sampled().contains(&&MetricKey::disk("sda1")));
        assert!(!t5.sampled().contains(&&MetricKey::Gpu));
        assert!(!t5.sampled().contains(&&MetricKey::Battery));

        for _ in 6..10 {
            s.tick();
        }
        let t10 = s.tick();
        for key in [
            MetricKey::Cpu,
            MetricKey::Gpu,
            MetricKey::disk("sda1"),
            MetricKey::Battery,
            MetricKey::NetworkSent,
        ] {
            assert!(t10.sampled().contains(&&key), "missing {}", key);
        }
    }

    #[test]
    fn test_failed_read_does_not_block_other_metrics() {
        let mut s = sampler(FakeSource {
            fail_cpu: true,
            fail_gpu: true,
            ..Default::default()
        });
        s.tick();
        let report = s.tick();

        assert_eq!(
            report.substituted(),
            vec![&MetricKey::Cpu, &MetricKey::Gpu, &MetricKey::GpuTemp]
        );
        let state = s.state().read();
        assert_eq!(state.histories.get(&MetricKey::Ram).unwrap().latest(), 50.0);
        assert_eq!(state.histories.get(&MetricKey::Cpu).unwrap().latest(), 0.0);
        assert!(state.readings.gpu.is_none());
    }

    #[test]
    fn test_panicking_read_is_masked() {
        let mut s = sampler(FakeSource {
            panic_gpu: true,
            cpu: 12.0,
            ..Default::default()
        });
        s.tick();
        let report = s.tick();

        assert!(report.substituted().contains(&&MetricKey::Gpu));
        assert_eq!(
            s.state().read().histories.get(&MetricKey::Cpu).unwrap().latest(),
            12.0
        );
    }

    #[test]
    fn test_histories_stay_at_capacity() {
        let mut s = sampler(FakeSource {
            disks: vec![disk("sda1", Some(10.0)), disk("sdb1", None)],
            ..Default::default()
        });
        for _ in 0..250 {
            s.tick();
        }
        let state = s.state().read();
        for key in state.histories.keys() {
            assert_eq!(state.histories.get(key).unwrap().len(), 60, "{}", key);
        }
    }

    #[test]
    fn test_unreadable_partition_gets_zero() {
        let mut s = sampler(FakeSource {
            disks: vec![disk("sda1", Some(40.0)), disk("sdb1", None)],
            ..Default::default()
        });
        for _ in 0..5 {
            s.tick();
        }
        let state = s.state().read();
        assert_eq!(
            state.histories.get(&MetricKey::disk("sda1")).unwrap().latest(),
            40.0
        );
        assert_eq!(
            state.histories.get(&MetricKey::disk("sdb1")).unwrap().latest(),
            0.0
        );
    }

    #[test]
    fn test_disk_listing_failure_pushes_zero_for_known_disks() {
        let mut s = sampler(FakeSource {
            disks: vec![disk("sda1", Some(40.0))],
            ..Default::default()
        });
        for _ in 0..5 {
            s.tick();
        }
        s.source.fail_disks = true;
        for _ in 0..5 {
            s.tick();
        }

        let state = s.state().read();
        let values = state
            .histories
            .get(&MetricKey::disk("sda1"))
            .unwrap()
            .to_vec();
        assert_eq!(&values[58..], &[40.0, 0.0]);
    }

    #[test]
    fn test_network_failure_clears_reading() {
        let mut s = sampler(FakeSource::default());
        for _ in 0..10 {
            s.tick();
        }
        assert_eq!(
            s.state().read().readings.network.map(|n| n.recv_mb()),
            Some(7)
        );

        s.source.fail_network = true;
        for _ in 0..10 {
            s.tick();
        }
        let state = s.state().read();
        assert!(state.readings.network.is_none());
        assert!(state.readings.battery.is_some());
        assert_eq!(
            state.histories.get(&MetricKey::NetworkRecv).unwrap().latest(),
            0.0
        );
    }

    #[test]
    fn test_duplicate_devices_recorded_once() {
        let list = dedup_devices(vec![
            disk("sda1", Some(1.0)),
            disk("sda1", Some(2.0)),
            disk("sdb1", Some(3.0)),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].usage_percent, Some(1.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_stops_on_cancel() {
        let config = SamplerConfig {
            tick: Duration::from_millis(5),
            ..SamplerConfig::default()
        };
        let state = state::shared(60);
        let s = Sampler::new(FakeSource::default(), state.clone(), config);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(s.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        handle.await.unwrap();

        let ticks = state.read().readings.tick;
        assert!(ticks > 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(state.read().readings.tick, ticks);
    }
}
