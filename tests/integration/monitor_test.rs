// Sampler runtime driven by a scripted source: no OS counters involved

use qdesk::core::monitor::{
    BatteryReading, Cadence, DiskReading, GpuReading, MetricKey, MetricSource, MonitorRuntime,
    NetworkReading, SamplerConfig,
};
use qdesk::{QdError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// CPU climbs by one per read; GPU is missing; the second disk is unreadable
struct ScriptedSource {
    reads: Arc<AtomicU64>,
}

impl MetricSource for ScriptedSource {
    fn cpu_percent(&mut self) -> Result<f64> {
        Ok(self.reads.fetch_add(1, Ordering::SeqCst) as f64 + 1.0)
    }

    fn ram_percent(&mut self) -> Result<f64> {
        Ok(40.0)
    }

    fn gpu(&mut self) -> Result<GpuReading> {
        Err(QdError::gpu_not_available("no GPU in tests"))
    }

    fn disks(&mut self) -> Result<Vec<DiskReading>> {
        Ok(vec![
            DiskReading {
                device: "disk0".into(),
                mount_point: "/".into(),
                usage_percent: Some(70.0),
            },
            DiskReading {
                device: "disk1".into(),
                mount_point: "/mnt/locked".into(),
                usage_percent: None,
            },
        ])
    }

    fn battery(&mut self) -> Result<Option<BatteryReading>> {
        Ok(None)
    }

    fn network(&mut self) -> Result<NetworkReading> {
        Ok(NetworkReading {
            bytes_sent: 5 * 1024 * 1024,
            bytes_recv: 9 * 1024 * 1024,
        })
    }
}

fn fast_config() -> SamplerConfig {
    SamplerConfig {
        tick: Duration::from_millis(5),
        capacity: 60,
        cadence: Cadence::default(),
    }
}

fn wait_for_ticks(runtime: &MonitorRuntime, ticks: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while runtime.snapshot().readings.tick < ticks {
        assert!(Instant::now() < deadline, "sampler did not reach {} ticks", ticks);
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_runtime_fills_histories_and_stops() {
    let reads = Arc::new(AtomicU64::new(0));
    let source = ScriptedSource {
        reads: reads.clone(),
    };
    let mut runtime = MonitorRuntime::start_with(source, fast_config()).unwrap();
    wait_for_ticks(&runtime, 12);
    runtime.stop().unwrap();
    assert!(!runtime.is_running());

    let state = runtime.snapshot();
    let ticks = state.readings.tick;

    // Every history keeps its fixed length
    for key in state.histories.keys() {
        assert_eq!(state.histories.get(key).unwrap().len(), 60, "{}", key);
    }

    // CPU is sampled on every tick, in order
    let cpu = state.histories.get(&MetricKey::Cpu).unwrap().to_vec();
    assert_eq!(*cpu.last().unwrap(), ticks as f64);
    assert_eq!(cpu[59] - cpu[58], 1.0);

    // Missing GPU records zeros and clears the reading
    assert!(state.readings.gpu.is_none());
    assert!(state
        .histories
        .get(&MetricKey::Gpu)
        .unwrap()
        .iter()
        .all(|v| *v == 0.0));

    // Unreadable partition is still tracked, with zeros
    assert_eq!(state.histories.disk_keys().len(), 2);
    assert_eq!(
        state.histories.get(&MetricKey::disk("disk0")).unwrap().latest(),
        70.0
    );
    assert_eq!(
        state.histories.get(&MetricKey::disk("disk1")).unwrap().latest(),
        0.0
    );

    // Network histories hold cumulative megabytes
    assert_eq!(
        state.histories.get(&MetricKey::NetworkSent).unwrap().latest(),
        5.0
    );

    // No further sampling after stop
    let reads_after_stop = reads.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(reads.load(Ordering::SeqCst), reads_after_stop);
}

#[test]
fn test_stop_is_idempotent() {
    let source = ScriptedSource {
        reads: Arc::new(AtomicU64::new(0)),
    };
    let mut runtime = MonitorRuntime::start_with(source, fast_config()).unwrap();
    runtime.stop().unwrap();
    runtime.stop().unwrap();
    runtime.shutdown().unwrap();
}
