//! Process table snapshots and the selection rules used to end processes.

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    /// Share of total physical memory
    pub memory_percent: f32,
    pub cpu_percent: f32,
}

impl ProcessSnapshot {
    pub fn label(&self) -> String {
        format!("{} - {:.1}%", self.name, self.memory_percent)
    }
}

/// Live process table that can also terminate what it listed
pub struct ProcessTable {
    system: System,
}

impl ProcessTable {
    /// Refresh twice around the minimum interval so CPU usage is meaningful
    pub fn load() -> Self {
        let kind = ProcessRefreshKind::nothing().with_memory().with_cpu();

        let mut system = System::new();
        system.refresh_memory();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);

        Self { system }
    }

    pub fn snapshots(&self) -> Vec<ProcessSnapshot> {
        let total = self.system.total_memory().max(1) as f64;
        let own_pid = std::process::id();

        self.system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != own_pid)
            .map(|(pid, process)| ProcessSnapshot {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                memory_percent: (process.memory() as f64 / total * 100.0) as f32,
                cpu_percent: process.cpu_usage(),
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.system.processes().len()
    }

    /// Ask the process to exit, falling back to a hard kill where TERM is unsupported
    pub fn terminate(&self, pid: u32) -> bool {
        match self.system.process(Pid::from_u32(pid)) {
            Some(process) => process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill()),
            None => false,
        }
    }

    /// Terminate every selected process, returning the names that were ended
    pub fn terminate_all(&self, selected: &[&ProcessSnapshot]) -> Vec<String> {
        selected
            .iter()
            .filter(|p| {
                let ok = self.terminate(p.pid);
                if !ok {
                    log::debug!("Could not terminate {} ({})", p.name, p.pid);
                }
                ok
            })
            .map(|p| p.name.clone())
            .collect()
    }
}

pub fn is_protected(name: &str, protected: &[String]) -> bool {
    protected.iter().any(|p| p.eq_ignore_ascii_case(name))
}

/// Only `.exe` images count as user applications
pub fn is_application(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".exe")
}

/// Processes above the memory threshold (protected ones included, for reporting)
pub fn select_heavy(procs: &[ProcessSnapshot], threshold_percent: f32) -> Vec<&ProcessSnapshot> {
    let mut heavy: Vec<&ProcessSnapshot> = procs
        .iter()
        .filter(|p| p.memory_percent > threshold_percent)
        .collect();
    heavy.sort_by(|a, b| b.memory_percent.total_cmp(&a.memory_percent));
    heavy
}

/// Unprotected applications using less CPU than `idle_cpu_percent`
pub fn select_idle<'a>(
    procs: &'a [ProcessSnapshot],
    idle_cpu_percent: f32,
    protected: &[String],
) -> Vec<&'a ProcessSnapshot> {
    procs
        .iter()
        .filter(|p| {
            p.cpu_percent < idle_cpu_percent
                && is_application(&p.name)
                && !is_protected(&p.name, protected)
        })
        .collect()
}

/// Unprotected applications not in `exclude`
pub fn select_applications<'a>(
    procs: &'a [ProcessSnapshot],
    exclude: &[String],
) -> Vec<&'a ProcessSnapshot> {
    procs
        .iter()
        .filter(|p| is_application(&p.name) && !is_protected(&p.name, exclude))
        .collect()
}

pub fn select_by_name<'a>(procs: &'a [ProcessSnapshot], fragment: &str) -> Vec<&'a ProcessSnapshot> {
    let fragment = fragment.to_lowercase();
    procs
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&fragment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(name: &str, mem: f32, cpu: f32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: 1,
            name: name.to_string(),
            memory_percent: mem,
            cpu_percent: cpu,
        }
    }

    fn protected() -> Vec<String> {
        vec!["explorer.exe".to_string(), "svchost.exe".to_string()]
    }

    #[test]
    fn test_heavy_sorted_by_memory() {
        let procs = vec![
            proc("a.exe", 11.0, 1.0),
            proc("b.exe", 5.0, 1.0),
            proc("c.exe", 30.0, 1.0),
        ];
        let heavy = select_heavy(&procs, 10.0);
        let names: Vec<_> = heavy.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c.exe", "a.exe"]);
    }

    #[test]
    fn test_idle_skips_protected_case_insensitively() {
        let procs = vec![
            proc("Explorer.EXE", 1.0, 0.0),
            proc("notepad.exe", 1.0, 0.0),
            proc("game.exe", 1.0, 45.0),
            proc("bash", 1.0, 0.0),
        ];
        let idle = select_idle(&procs, 0.1, &protected());
        let names: Vec<_> = idle.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["notepad.exe"]);
    }

    #[test]
    fn test_select_by_name_fragment() {
        let procs = vec![proc("chrome.exe", 1.0, 1.0), proc("Chromium", 1.0, 1.0), proc("x", 1.0, 1.0)];
        assert_eq!(select_by_name(&procs, "CHROM").len(), 2);
    }

    #[test]
    fn test_applications_respect_exclude_list() {
        let procs = vec![proc("explorer.exe", 1.0, 1.0), proc("word.exe", 1.0, 1.0)];
        let apps = select_applications(&procs, &protected());
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "word.exe");
    }
}
