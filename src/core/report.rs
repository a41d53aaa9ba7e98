//! Point-in-time system summary that can be exported as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::{Disks, Networks, System};

use super::ops::optimizer::{self, HealthReport};
use super::ops::outcome::{guard, OpOutcome};
use super::ops::processes::{ProcessSnapshot, ProcessTable};
use crate::error::{QdError, Result};
use crate::platform::shell;

/// Processes kept in a report, busiest first
const TOP_PROCESSES: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSummary {
    pub brand: String,
    pub logical_cores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySummary {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskSummary {
    pub name: String,
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSummary {
    pub name: String,
    pub mac_address: String,
    /// `address/prefix`
    pub addresses: Vec<String>,
    pub mtu: u64,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

pub fn network_interfaces() -> Vec<InterfaceSummary> {
    let mut interfaces: Vec<InterfaceSummary> = Networks::new_with_refreshed_list()
        .iter()
        .map(|(name, data)| InterfaceSummary {
            name: name.clone(),
            mac_address: data.mac_address().to_string(),
            addresses: data
                .ip_networks()
                .iter()
                .map(|net| format!("{}/{}", net.addr, net.prefix))
                .collect(),
            mtu: data.mtu(),
            received_bytes: data.total_received(),
            transmitted_bytes: data.total_transmitted(),
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}

/// Busiest processes by CPU, then memory
pub fn top_processes(mut processes: Vec<ProcessSnapshot>, limit: usize) -> Vec<ProcessSnapshot> {
    processes.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then(b.memory_percent.total_cmp(&a.memory_percent))
    });
    processes.truncate(limit);
    processes
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub display_name: String,
    /// `RUNNING`, `STOPPED`, `active/running`, ...
    pub state: String,
}

impl ServiceInfo {
    pub fn is_running(&self) -> bool {
        let state = self.state.to_ascii_lowercase();
        state.contains("running")
    }
}

/// Blocks of `sc query` output
pub fn parse_sc_query(text: &str) -> Vec<ServiceInfo> {
    let mut services = Vec::new();
    let mut current: Option<ServiceInfo> = None;

    for line in text.lines().map(str::trim) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "SERVICE_NAME" => {
                services.extend(current.take());
                current = Some(ServiceInfo {
                    name: value.to_string(),
                    display_name: String::new(),
                    state: String::new(),
                });
            }
            "DISPLAY_NAME" => {
                if let Some(service) = current.as_mut() {
                    service.display_name = value.to_string();
                }
            }
            "STATE" => {
                if let Some(service) = current.as_mut() {
                    // "4  RUNNING" -> "RUNNING"
                    service.state = value
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or(value)
                        .to_string();
                }
            }
            _ => {}
        }
    }
    services.extend(current);
    services
}

/// Rows of `systemctl list-units --type=service --all --no-legend --plain`
pub fn parse_systemctl(text: &str) -> Vec<ServiceInfo> {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let unit = cols.next()?;
            let _load = cols.next()?;
            let active = cols.next()?;
            let sub = cols.next()?;
            let description = cols.collect::<Vec<_>>().join(" ");
            Some(ServiceInfo {
                name: unit.trim_end_matches(".service").to_string(),
                display_name: description,
                state: format!("{}/{}", active, sub),
            })
        })
        .collect()
}

pub fn list_services() -> Result<Vec<ServiceInfo>> {
    if cfg!(windows) {
        let out = shell::run_checked("sc", &["query", "type=", "service", "state=", "all"])?;
        Ok(parse_sc_query(&out.stdout))
    } else if cfg!(target_os = "linux") {
        let out = shell::run_checked(
            "systemctl",
            &["list-units", "--type=service", "--all", "--no-legend", "--plain"],
        )?;
        Ok(parse_systemctl(&out.stdout))
    } else {
        Err(QdError::unsupported("service listing needs sc or systemctl"))
    }
}

pub fn services_info() -> OpOutcome<Vec<ServiceInfo>> {
    guard("services_info", || {
        let services = list_services()?;
        let running = services.iter().filter(|s| s.is_running()).count();
        let items: Vec<String> = services
            .iter()
            .map(|s| format!("{} [{}] {}", s.name, s.state, s.display_name))
            .collect();
        Ok(OpOutcome::success(format!(
            "{} services, {} running",
            services.len(),
            running
        ))
        .with_items(items)
        .with_detail(services))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    pub generated: DateTime<Utc>,
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub kernel: Option<String>,
    pub uptime_hours: u64,
    pub cpu: CpuSummary,
    pub memory: MemorySummary,
    pub disks: Vec<DiskSummary>,
    pub process_count: usize,
    pub health: HealthReport,
    pub interfaces: Vec<InterfaceSummary>,
    pub top_processes: Vec<ProcessSnapshot>,
}

impl SystemReport {
    pub fn collect() -> Result<Self> {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_list(sysinfo::CpuRefreshKind::nothing());

        let cpu = CpuSummary {
            brand: system
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            logical_cores: system.cpus().len(),
        };

        let disks = Disks::new_with_refreshed_list()
            .iter()
            .map(|d| DiskSummary {
                name: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_path_buf(),
                file_system: d.file_system().to_string_lossy().into_owned(),
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .collect();

        let health = optimizer::collect_health()?;
        let processes = top_processes(ProcessTable::load().snapshots(), TOP_PROCESSES);

        Ok(Self {
            generated: Utc::now(),
            hostname: System::host_name(),
            os: System::name(),
            os_version: System::os_version(),
            kernel: System::kernel_version(),
            uptime_hours: System::uptime() / 3600,
            cpu,
            memory: MemorySummary {
                total_bytes: system.total_memory(),
                used_bytes: system.used_memory(),
                available_bytes: system.available_memory(),
            },
            disks,
            process_count: health.process_count,
            health,
            interfaces: network_interfaces(),
            top_processes: processes,
        })
    }

    /// Write as pretty JSON, creating parent directories
    pub fn export(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

pub fn export_report(path: &Path) -> OpOutcome<SystemReport> {
    guard("export_report", || {
        let report = SystemReport::collect()?;
        report.export(path)?;
        Ok(OpOutcome::success(format!("Report saved to {}", path.display())).with_detail(report))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SystemReport {
        SystemReport {
            generated: Utc::now(),
            hostname: Some("box".into()),
            os: None,
            os_version: None,
            kernel: None,
            uptime_hours: 5,
            cpu: CpuSummary {
                brand: "Test CPU".into(),
                logical_cores: 8,
            },
            memory: MemorySummary {
                total_bytes: 100,
                used_bytes: 40,
                available_bytes: 60,
            },
            disks: Vec::new(),
            process_count: 3,
            health: HealthReport {
                cpu_usage: 1.0,
                memory_usage: 40.0,
                memory_available_gb: 0,
                disk_usage: 10.0,
                process_count: 3,
                uptime_hours: 5,
                healthy: true,
            },
            interfaces: vec![InterfaceSummary {
                name: "eth0".into(),
                mac_address: "00:11:22:33:44:55".into(),
                addresses: vec!["10.0.0.2/24".into()],
                mtu: 1500,
                received_bytes: 10,
                transmitted_bytes: 20,
            }],
            top_processes: Vec::new(),
        }
    }

    #[test]
    fn test_export_writes_pretty_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");
        sample().export(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"hostname\": \"box\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["cpu"]["logical_cores"], 8);
        assert_eq!(value["health"]["healthy"], true);
        assert_eq!(value["interfaces"][0]["addresses"][0], "10.0.0.2/24");
    }

    fn proc(pid: u32, cpu: f32, mem: f32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: format!("p{}", pid),
            memory_percent: mem,
            cpu_percent: cpu,
        }
    }

    #[test]
    fn test_top_processes_order_and_limit() {
        let top = top_processes(
            vec![proc(1, 1.0, 5.0), proc(2, 30.0, 1.0), proc(3, 1.0, 9.0), proc(4, 0.0, 0.0)],
            3,
        );
        let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 3, 1]);
    }

    #[test]
    fn test_parse_sc_query() {
        let text = "
SERVICE_NAME: AJRouter
DISPLAY_NAME: AllJoyn Router Service
        TYPE               : 20  WIN32_SHARE_PROCESS
        STATE              : 1  STOPPED
        WIN32_EXIT_CODE    : 1077  (0x435)

SERVICE_NAME: Dhcp
DISPLAY_NAME: DHCP Client
        TYPE               : 30  WIN32
        STATE              : 4  RUNNING
                                (STOPPABLE, NOT_PAUSABLE, ACCEPTS_SHUTDOWN)
";
        let services = parse_sc_query(text);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "AJRouter");
        assert_eq!(services[0].state, "STOPPED");
        assert!(!services[0].is_running());
        assert_eq!(services[1].display_name, "DHCP Client");
        assert!(services[1].is_running());
    }

    #[test]
    fn test_parse_systemctl() {
        let text = "cron.service loaded active running Regular background program processing daemon
rescue.service loaded inactive dead Rescue Shell
";
        let services = parse_systemctl(text);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "cron");
        assert_eq!(services[0].state, "active/running");
        assert!(services[0].is_running());
        assert_eq!(services[1].display_name, "Rescue Shell");
        assert!(!services[1].is_running());
    }
}
