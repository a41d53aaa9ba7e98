//! Health diagnostics: a short CPU sample plus memory, disk, network and
//! stability checks, each graded on its own.

use serde::Serialize;
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, System};

use super::ops::outcome::{guard, OpOutcome};
use crate::error::Result;

/// Host resolved to decide whether name resolution works
const DNS_PROBE_HOST: &str = "google.com:80";

pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Critical => "critical",
        };
        f.write_str(label)
    }
}

pub fn memory_health(used_percent: f64) -> Health {
    if used_percent < 80.0 {
        Health::Healthy
    } else {
        Health::Warning
    }
}

pub fn disk_health(used_percent: f64) -> Health {
    if used_percent > 90.0 {
        Health::Critical
    } else if used_percent > 80.0 {
        Health::Warning
    } else {
        Health::Healthy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuCheck {
    pub window_secs: f64,
    pub usage_before: f64,
    pub max_usage: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryCheck {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
    pub health: Health,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskCheck {
    pub device: String,
    pub mount_point: String,
    pub used_percent: f64,
    pub free_bytes: u64,
    pub health: Health,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkCheck {
    pub dns_working: bool,
    /// Interfaces carrying at least one address
    pub interfaces_up: usize,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
    pub health: Health,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityCheck {
    pub uptime_hours: f64,
    pub load_one: f64,
    pub score: u32,
    pub issues: Vec<String>,
    pub stable: bool,
}

/// Start at 100 and deduct for a recent restart, high load and high memory
pub fn grade_stability(
    uptime_hours: f64,
    load_one: f64,
    cpu_count: usize,
    memory_percent: f64,
) -> StabilityCheck {
    let mut score: i32 = 100;
    let mut issues = Vec::new();

    if uptime_hours < 1.0 {
        score -= 10;
        issues.push("Recent system restart".to_string());
    }
    if load_one > cpu_count as f64 * 0.8 {
        score -= 20;
        issues.push("High CPU load".to_string());
    }
    if memory_percent > 85.0 {
        score -= 15;
        issues.push("High memory usage".to_string());
    }

    let score = score.max(0) as u32;
    StabilityCheck {
        uptime_hours: (uptime_hours * 100.0).round() / 100.0,
        load_one,
        score,
        issues,
        stable: score > 70,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub cpu: CpuCheck,
    pub memory: MemoryCheck,
    pub disks: Vec<DiskCheck>,
    pub network: NetworkCheck,
    pub stability: StabilityCheck,
}

impl DiagnosticsReport {
    /// Worst grade across memory, disks, network and stability
    pub fn overall(&self) -> Health {
        let stability = if self.stability.stable {
            Health::Healthy
        } else {
            Health::Warning
        };
        self.disks
            .iter()
            .map(|d| d.health)
            .chain([self.memory.health, self.network.health, stability])
            .max()
            .unwrap_or(Health::Healthy)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "CPU: {:.1}% before, {:.1}% peak over {:.0}s",
                self.cpu.usage_before, self.cpu.max_usage, self.cpu.window_secs
            ),
            format!(
                "Memory: {:.1}% used ({})",
                self.memory.used_percent, self.memory.health
            ),
        ];
        lines.extend(self.disks.iter().map(|d| {
            format!("Disk {}: {:.1}% used ({})", d.mount_point, d.used_percent, d.health)
        }));
        lines.push(format!(
            "Network: DNS {}, {} interfaces up ({})",
            if self.network.dns_working { "working" } else { "failed" },
            self.network.interfaces_up,
            self.network.health
        ));
        lines.push(format!(
            "Stability: score {} ({})",
            self.stability.score,
            if self.stability.stable { "stable" } else { "unstable" }
        ));
        lines.extend(self.stability.issues.iter().map(|i| format!("  - {}", i)));
        lines
    }
}

/// Sample global CPU usage for `window`, keeping the peak
pub fn sample_cpu(window: Duration) -> CpuCheck {
    let mut system = System::new();
    system.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu_usage();
    let before = system.global_cpu_usage() as f64;

    let step = sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(100));
    let started = Instant::now();
    let mut max_usage = before;
    let mut samples = 0;
    while started.elapsed() < window {
        std::thread::sleep(step);
        system.refresh_cpu_usage();
        max_usage = max_usage.max(system.global_cpu_usage() as f64);
        samples += 1;
    }

    CpuCheck {
        window_secs: window.as_secs_f64(),
        usage_before: before,
        max_usage,
        samples,
    }
}

fn check_memory(system: &System) -> MemoryCheck {
    let total = system.total_memory();
    let available = system.available_memory();
    let used_percent = if total == 0 {
        0.0
    } else {
        (total - available.min(total)) as f64 / total as f64 * 100.0
    };
    MemoryCheck {
        total_bytes: total,
        available_bytes: available,
        used_percent,
        health: memory_health(used_percent),
    }
}

fn check_disks() -> Vec<DiskCheck> {
    Disks::new_with_refreshed_list()
        .iter()
        .filter(|d| d.total_space() > 0)
        .map(|d| {
            let total = d.total_space();
            let free = d.available_space().min(total);
            let used_percent = (total - free) as f64 / total as f64 * 100.0;
            DiskCheck {
                device: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_string_lossy().into_owned(),
                used_percent,
                free_bytes: free,
                health: disk_health(used_percent),
            }
        })
        .collect()
}

fn check_network() -> NetworkCheck {
    let dns_working = DNS_PROBE_HOST
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false);

    let networks = Networks::new_with_refreshed_list();
    let interfaces_up = networks
        .iter()
        .filter(|(_, data)| !data.ip_networks().is_empty())
        .count();
    let (received_bytes, transmitted_bytes) = networks
        .iter()
        .fold((0, 0), |(rx, tx), (_, data)| {
            (rx + data.total_received(), tx + data.total_transmitted())
        });

    NetworkCheck {
        dns_working,
        interfaces_up,
        received_bytes,
        transmitted_bytes,
        health: if dns_working {
            Health::Healthy
        } else {
            Health::Warning
        },
    }
}

pub fn collect(cpu_window: Duration) -> Result<DiagnosticsReport> {
    let cpu = sample_cpu(cpu_window);

    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu_list(sysinfo::CpuRefreshKind::nothing());
    let memory = check_memory(&system);

    let stability = grade_stability(
        System::uptime() as f64 / 3600.0,
        System::load_average().one,
        system.cpus().len().max(1),
        memory.used_percent,
    );

    Ok(DiagnosticsReport {
        cpu,
        memory,
        disks: check_disks(),
        network: check_network(),
        stability,
    })
}

/// Full diagnostics run; anything short of healthy is a warning
pub fn run_diagnostics(cpu_window: Duration) -> OpOutcome<DiagnosticsReport> {
    guard("run_diagnostics", || {
        let report = collect(cpu_window)?;
        let overall = report.overall();
        let message = format!("Diagnostics complete: system is {}", overall);
        let outcome = if overall == Health::Healthy {
            OpOutcome::success(message)
        } else {
            OpOutcome::warning(message)
        };
        Ok(outcome.with_items(report.summary_lines()).with_detail(report))
    })
}
