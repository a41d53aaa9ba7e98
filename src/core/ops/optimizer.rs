//! Memory, process, cleanup and performance operations.

use serde::Serialize;
use std::fs;
use std::path::Path;
use sysinfo::{Disks, System};

use super::bulk::BulkStep;
use super::outcome::{guard, unimplemented_op, OpOutcome};
use super::processes::{self, ProcessSnapshot, ProcessTable};
use crate::core::config::ProcessSettings;
use crate::error::{QdError, Result};
use crate::platform::{paths, registry, shell};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// High performance power plan
const HIGH_PERFORMANCE_GUID: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";

/// Statistics from a directory purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeStats {
    pub files_removed: usize,
    pub bytes_removed: u64,
    pub dirs_removed: usize,
    pub failed: usize,
}

impl PurgeStats {
    pub fn merge(&mut self, other: PurgeStats) {
        self.files_removed += other.files_removed;
        self.bytes_removed += other.bytes_removed;
        self.dirs_removed += other.dirs_removed;
        self.failed += other.failed;
    }

    pub fn mb(&self) -> u64 {
        self.bytes_removed / MIB
    }
}

/// Delete the files in `dir` (and its subdirectories when `recursive`).
///
/// Directories are left in place; files that cannot be removed are counted
/// as failures and skipped.
pub fn purge_dir_files(dir: &Path, recursive: bool) -> PurgeStats {
    let mut stats = PurgeStats::default();
    purge_into(dir, recursive, false, &mut stats);
    stats
}

/// Delete everything inside `dir`, subdirectories included
pub fn empty_dir(dir: &Path) -> PurgeStats {
    let mut stats = PurgeStats::default();
    purge_into(dir, true, true, &mut stats);
    stats
}

fn purge_into(dir: &Path, recursive: bool, remove_dirs: bool, stats: &mut PurgeStats) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = fs::symlink_metadata(&path) else {
            stats.failed += 1;
            continue;
        };

        if metadata.is_dir() {
            if recursive {
                purge_into(&path, recursive, remove_dirs, stats);
                if remove_dirs {
                    match fs::remove_dir(&path) {
                        Ok(()) => stats.dirs_removed += 1,
                        Err(_) => stats.failed += 1,
                    }
                }
            }
        } else {
            match fs::remove_file(&path) {
                Ok(()) => {
                    stats.files_removed += 1;
                    stats.bytes_removed += metadata.len();
                }
                Err(_) => stats.failed += 1,
            }
        }
    }
}

fn available_memory() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.available_memory()
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryDelta {
    pub available_before: u64,
    pub available_after: u64,
}

impl MemoryDelta {
    pub fn freed_mb(&self) -> u64 {
        self.available_after.saturating_sub(self.available_before) / MIB
    }
}

/// Measure available memory before and after trimming our own footprint
pub fn free_ram() -> OpOutcome<MemoryDelta> {
    guard("free_ram", || {
        let available_before = available_memory();
        trim_own_working_set();
        let delta = MemoryDelta {
            available_before,
            available_after: available_memory(),
        };
        Ok(OpOutcome::success(format!(
            "RAM freed successfully! {}MB recovered",
            delta.freed_mb()
        ))
        .with_detail(delta))
    })
}

#[cfg(windows)]
fn trim_own_working_set() {
    use winapi::um::processthreadsapi::GetCurrentProcess;
    use winapi::um::winbase::SetProcessWorkingSetSize;

    // (-1, -1) asks the OS to page out as much of the working set as it can
    unsafe {
        SetProcessWorkingSetSize(GetCurrentProcess(), usize::MAX, usize::MAX);
    }
}

#[cfg(not(windows))]
fn trim_own_working_set() {}

pub fn clear_cache() -> OpOutcome<PurgeStats> {
    guard("clear_cache", || {
        let stats = purge_dir_files(&paths::user_temp_dir(), true);
        Ok(OpOutcome::success(format!(
            "Cache cleared! {} files removed ({}MB)",
            stats.files_removed,
            stats.mb()
        ))
        .with_detail(stats))
    })
}

pub fn optimize_memory() -> OpOutcome {
    guard("optimize_memory", || {
        trim_own_working_set();

        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return Err(QdError::metric_unavailable("total memory reported as 0"));
        }
        let available = system.available_memory();
        let free_percent = available as f64 / total as f64 * 100.0;

        Ok(OpOutcome::success(format!(
            "Memory optimized! Available: {}GB ({:.1}% free)",
            available / GIB,
            free_percent
        )))
    })
}

// ---------------------------------------------------------------------------
// Processes
// ---------------------------------------------------------------------------

/// Terminate unprotected processes above the memory threshold
pub fn kill_heavy_processes(settings: &ProcessSettings) -> OpOutcome<Vec<String>> {
    guard("kill_heavy_processes", || {
        let table = ProcessTable::load();
        let snapshots = table.snapshots();

        let heavy = processes::select_heavy(&snapshots, settings.heavy_memory_percent);
        let targets: Vec<_> = heavy
            .iter()
            .copied()
            .filter(|p| !processes::is_protected(&p.name, &settings.protected))
            .collect();
        let killed = table.terminate_all(&targets);

        let labels: Vec<String> = heavy.iter().map(|p| p.label()).collect();
        Ok(OpOutcome::success(format!(
            "Terminated {} heavy processes",
            killed.len()
        ))
        .with_items(labels.iter().take(10).cloned())
        .with_detail(killed))
    })
}

pub fn end_idle_apps(settings: &ProcessSettings) -> OpOutcome<Vec<String>> {
    guard("end_idle_apps", || {
        let table = ProcessTable::load();
        let snapshots = table.snapshots();
        let idle = processes::select_idle(
            &snapshots,
            settings.idle_cpu_percent,
            &settings.protected,
        );
        let killed = table.terminate_all(&idle);

        Ok(
            OpOutcome::success(format!("Ended {} idle applications", killed.len()))
                .with_items(killed.clone())
                .with_detail(killed),
        )
    })
}

pub fn clean_chrome() -> OpOutcome<Vec<String>> {
    guard("clean_chrome", || {
        let table = ProcessTable::load();
        let snapshots = table.snapshots();
        let chrome = processes::select_by_name(&snapshots, "chrome");
        let killed = table.terminate_all(&chrome);

        Ok(OpOutcome::success(format!(
            "Chrome cleanup: {} processes terminated",
            killed.len()
        ))
        .with_items(killed.clone())
        .with_detail(killed))
    })
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

pub fn scan_startup() -> OpOutcome {
    guard("scan_startup", || {
        let mut items = Vec::new();
        for (hive, label) in [
            (registry::Hive::CurrentUser, "USER"),
            (registry::Hive::LocalMachine, "SYSTEM"),
        ] {
            match registry::read_values(hive, registry::RUN_KEY) {
                Ok(entries) => items.extend(
                    entries
                        .into_iter()
                        .map(|e| format!("[{}] {}: {}", label, e.name, e.data)),
                ),
                Err(QdError::Unsupported(what)) => return Err(QdError::Unsupported(what)),
                Err(e) => log::debug!("Could not read {} Run key: {}", hive.label(), e),
            }
        }

        Ok(OpOutcome::success(format!("Found {} startup items", items.len())).with_items(items))
    })
}

pub fn disable_heavy_startup() -> OpOutcome {
    unimplemented_op(
        "disable_heavy_startup",
        "startup entries are only listed, never changed",
    )
}

pub fn optimize_boot() -> OpOutcome {
    unimplemented_op("optimize_boot", "boot configuration is left untouched")
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

pub fn clean_temp() -> OpOutcome<PurgeStats> {
    guard("clean_temp", || {
        let mut stats = PurgeStats::default();
        for dir in paths::temp_directories() {
            stats.merge(purge_dir_files(&dir, true));
        }
        Ok(OpOutcome::success(format!(
            "Temp cleanup: {} files removed ({}MB)",
            stats.files_removed,
            stats.mb()
        ))
        .with_detail(stats))
    })
}

pub fn empty_recycle() -> OpOutcome<PurgeStats> {
    guard("empty_recycle", || {
        let dirs = paths::recycle_bin_directories();
        if dirs.is_empty() {
            return Ok(OpOutcome::warning("Recycle bin not found"));
        }

        let mut stats = PurgeStats::default();
        for dir in &dirs {
            stats.merge(empty_dir(dir));
        }
        Ok(OpOutcome::success(format!(
            "Recycle bin emptied: {} files ({}MB)",
            stats.files_removed,
            stats.mb()
        ))
        .with_detail(stats))
    })
}

pub fn clear_prefetch() -> OpOutcome<PurgeStats> {
    guard("clear_prefetch", || {
        let dir = match paths::prefetch_dir() {
            Some(dir) if dir.exists() => dir,
            _ => return Ok(OpOutcome::warning("Prefetch directory not found")),
        };

        let stats = purge_dir_files(&dir, false);
        Ok(OpOutcome::success(format!(
            "Prefetch cleared: {} files ({}MB)",
            stats.files_removed,
            stats.mb()
        ))
        .with_detail(stats))
    })
}

pub fn clean_registry() -> OpOutcome {
    unimplemented_op("clean_registry", "no registry entries are removed")
}

/// Launch the Windows disk cleanup utility
pub fn disk_cleanup() -> OpOutcome {
    guard("disk_cleanup", || {
        if !cfg!(windows) {
            return Err(QdError::unsupported("cleanmgr is a Windows tool"));
        }
        shell::spawn("cleanmgr", &["/sagerun:1"])?;
        Ok(OpOutcome::success("Disk cleanup utility launched!"))
    })
}

/// Temp files, cache, recycle bin and prefetch
pub fn full_system_clean() -> Vec<BulkStep> {
    vec![
        BulkStep::detailed("Temp Files", clean_temp),
        BulkStep::detailed("Cache", clear_cache),
        BulkStep::detailed("Recycle Bin", empty_recycle),
        BulkStep::detailed("Prefetch", clear_prefetch),
    ]
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

/// Processes named by `target`: a pid, or a name compared case-insensitively
/// with or without `.exe`
pub fn match_targets<'a>(processes: &'a [ProcessSnapshot], target: &str) -> Vec<&'a ProcessSnapshot> {
    let target = target.trim();
    if let Ok(pid) = target.parse::<u32>() {
        return processes.iter().filter(|p| p.pid == pid).collect();
    }

    let wanted = target.to_ascii_lowercase();
    let wanted = wanted.strip_suffix(".exe").unwrap_or(&wanted);
    processes
        .iter()
        .filter(|p| {
            let name = p.name.to_ascii_lowercase();
            name.strip_suffix(".exe").unwrap_or(&name) == wanted
        })
        .collect()
}

/// Raise the named process (e.g. a running game) to high priority
pub fn game_mode(target: &str) -> OpOutcome<Vec<u32>> {
    guard("game_mode", || {
        if target.trim().is_empty() {
            return Ok(OpOutcome::warning("Name the process to prioritize"));
        }

        let table = ProcessTable::load();
        let snapshots = table.snapshots();
        let matched = match_targets(&snapshots, target);
        if matched.is_empty() {
            return Ok(OpOutcome::warning(format!("No running process matches '{}'", target)));
        }

        let mut raised = Vec::new();
        let mut last_error = None;
        for process in matched {
            match raise_priority(process.pid) {
                Ok(()) => raised.push(process.pid),
                Err(e) => {
                    log::debug!("Could not raise {} ({}): {}", process.name, process.pid, e);
                    last_error = Some(e);
                }
            }
        }

        if let (true, Some(e)) = (raised.is_empty(), last_error) {
            return Err(e);
        }
        let items: Vec<String> = raised.iter().map(|pid| format!("pid {}", pid)).collect();
        Ok(OpOutcome::success(format!(
            "Game Mode: {} process(es) matching '{}' raised to high priority",
            raised.len(),
            target
        ))
        .with_items(items)
        .with_detail(raised))
    })
}

#[cfg(windows)]
fn raise_priority(pid: u32) -> Result<()> {
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{OpenProcess, SetPriorityClass};
    use winapi::um::winbase::HIGH_PRIORITY_CLASS;
    use winapi::um::winnt::PROCESS_SET_INFORMATION;

    let handle = unsafe { OpenProcess(PROCESS_SET_INFORMATION, 0, pid) };
    if handle.is_null() {
        return Err(std::io::Error::last_os_error().into());
    }
    let ok = unsafe { SetPriorityClass(handle, HIGH_PRIORITY_CLASS) };
    let err = std::io::Error::last_os_error();
    unsafe { CloseHandle(handle) };
    if ok == 0 {
        return Err(err.into());
    }
    Ok(())
}

#[cfg(not(windows))]
fn raise_priority(pid: u32) -> Result<()> {
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, -10) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Err(QdError::elevation_required("raising priority needs root"));
        }
        return Err(err.into());
    }
    Ok(())
}

pub fn high_performance() -> OpOutcome {
    guard("high_performance", || {
        if !cfg!(windows) {
            return Err(QdError::unsupported("power plans are managed by powercfg"));
        }
        shell::run_checked("powercfg", &["/setactive", HIGH_PERFORMANCE_GUID])?;
        Ok(OpOutcome::success("High Performance Mode: ACTIVE!"))
    })
}

pub fn priority_boost() -> OpOutcome {
    unimplemented_op("priority_boost", "no system-wide priority changes are made")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub memory_available_gb: u64,
    pub disk_usage: f64,
    pub process_count: usize,
    pub uptime_hours: u64,
    pub healthy: bool,
}

impl HealthReport {
    pub fn assess(cpu_usage: f64, memory_usage: f64) -> bool {
        cpu_usage < 80.0 && memory_usage < 80.0
    }
}

/// Usage of the partition holding the OS (`/` or the system drive)
fn system_disk_usage() -> f64 {
    let disks = Disks::new_with_refreshed_list();
    let system_root = if cfg!(windows) { "C:\\" } else { "/" };

    disks
        .iter()
        .find(|d| d.mount_point() == Path::new(system_root))
        .or_else(|| disks.iter().next())
        .map(|d| {
            let total = d.total_space();
            if total == 0 {
                0.0
            } else {
                total.saturating_sub(d.available_space()) as f64 / total as f64 * 100.0
            }
        })
        .unwrap_or_default()
}

pub fn collect_health() -> Result<HealthReport> {
    let mut system = System::new();
    system.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu_usage();
    system.refresh_memory();

    let total = system.total_memory();
    if total == 0 {
        return Err(QdError::metric_unavailable("total memory reported as 0"));
    }

    let cpu_usage = system.global_cpu_usage() as f64;
    let memory_usage = system.used_memory() as f64 / total as f64 * 100.0;

    Ok(HealthReport {
        cpu_usage,
        memory_usage,
        memory_available_gb: system.available_memory() / GIB,
        disk_usage: system_disk_usage(),
        process_count: ProcessTable::load().count(),
        uptime_hours: System::uptime() / 3600,
        healthy: HealthReport::assess(cpu_usage, memory_usage),
    })
}

pub fn system_health() -> OpOutcome<HealthReport> {
    guard("system_health", || {
        let report = collect_health()?;
        let message = format!(
            "System is {} (CPU {:.1}%, RAM {:.1}%)",
            if report.healthy { "healthy" } else { "under load" },
            report.cpu_usage,
            report.memory_usage
        );
        Ok(OpOutcome::success(message).with_detail(report))
    })
}

/// Steps chosen from the current health: memory above 80%, more than 200
/// processes, and temp cleanup always
pub fn auto_optimize_steps(health: &HealthReport, settings: &ProcessSettings) -> Vec<BulkStep> {
    let mut steps = Vec::new();

    if health.memory_usage > 80.0 {
        steps.push(BulkStep::new("Memory", optimize_memory));
    }
    if health.process_count > 200 {
        let settings = settings.clone();
        steps.push(BulkStep::detailed("Processes", move || {
            end_idle_apps(&settings)
        }));
    }
    steps.push(BulkStep::detailed("Temp", clean_temp));

    steps
}

pub fn auto_optimize(settings: &ProcessSettings) -> Result<Vec<BulkStep>> {
    let health = collect_health()?;
    Ok(auto_optimize_steps(&health, settings))
}

pub fn elite_clean(settings: &ProcessSettings) -> Vec<BulkStep> {
    let settings = settings.clone();
    vec![
        BulkStep::new("Memory Optimization", optimize_memory),
        BulkStep::detailed("Process Cleanup", move || end_idle_apps(&settings)),
        BulkStep::detailed("Temp Files", clean_temp),
        BulkStep::detailed("Cache Clear", clear_cache),
        BulkStep::detailed("Prefetch Clear", clear_prefetch),
        BulkStep::new("Registry Clean", clean_registry),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ops::outcome::Status;
    use tempfile::TempDir;

    fn health(memory: f64, processes: usize) -> HealthReport {
        HealthReport {
            cpu_usage: 10.0,
            memory_usage: memory,
            memory_available_gb: 4,
            disk_usage: 50.0,
            process_count: processes,
            uptime_hours: 1,
            healthy: HealthReport::assess(10.0, memory),
        }
    }

    #[test]
    fn test_purge_non_recursive_keeps_subdirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.tmp"), b"12345").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.tmp"), b"1").unwrap();

        let stats = purge_dir_files(dir.path(), false);
        assert_eq!(stats.files_removed, 1);
        assert_eq!(stats.bytes_removed, 5);
        assert!(dir.path().join("sub").join("b.tmp").exists());
    }

    #[test]
    fn test_purge_recursive_keeps_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x").join("y")).unwrap();
        fs::write(dir.path().join("x").join("y").join("c.log"), b"abc").unwrap();

        let stats = purge_dir_files(dir.path(), true);
        assert_eq!(stats.files_removed, 1);
        assert!(dir.path().join("x").join("y").is_dir());
    }

    #[test]
    fn test_empty_dir_removes_everything() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("S-1-5").join("inner")).unwrap();
        fs::write(dir.path().join("S-1-5").join("$R1.txt"), b"x").unwrap();

        let stats = empty_dir(dir.path());
        assert_eq!(stats.files_removed, 1);
        assert_eq!(stats.dirs_removed, 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_purge_missing_dir_is_empty() {
        let stats = purge_dir_files(Path::new("/definitely/not/here"), true);
        assert_eq!(stats, PurgeStats::default());
    }

    #[test]
    fn test_health_threshold() {
        assert!(HealthReport::assess(79.9, 10.0));
        assert!(!HealthReport::assess(80.0, 10.0));
        assert!(!HealthReport::assess(10.0, 85.0));
    }

    #[test]
    fn test_auto_optimize_step_selection() {
        let settings = ProcessSettings::default();

        let calm = auto_optimize_steps(&health(40.0, 100), &settings);
        let names: Vec<_> = calm.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Temp"]);

        let busy = auto_optimize_steps(&health(90.0, 250), &settings);
        let names: Vec<_> = busy.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Memory", "Processes", "Temp"]);
    }

    #[test]
    fn test_elite_clean_has_six_steps() {
        let steps = elite_clean(&ProcessSettings::default());
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[5].name, "Registry Clean");
    }

    #[test]
    fn test_unimplemented_ops_warn() {
        for outcome in [
            clean_registry(),
            optimize_boot(),
            priority_boost(),
            disable_heavy_startup(),
        ] {
            assert_eq!(outcome.status, Status::Warning);
        }
    }

    #[test]
    fn test_memory_delta_never_negative() {
        let delta = MemoryDelta {
            available_before: 10 * MIB,
            available_after: 5 * MIB,
        };
        assert_eq!(delta.freed_mb(), 0);
    }

    fn snapshot(pid: u32, name: &str) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: name.into(),
            memory_percent: 1.0,
            cpu_percent: 0.0,
        }
    }

    #[test]
    fn test_game_mode_targets() {
        let table = vec![
            snapshot(10, "Game.exe"),
            snapshot(11, "game"),
            snapshot(12, "gamebar.exe"),
        ];
        let by_name: Vec<u32> = match_targets(&table, "GAME.EXE").iter().map(|p| p.pid).collect();
        assert_eq!(by_name, vec![10, 11]);
        let by_pid: Vec<u32> = match_targets(&table, "12").iter().map(|p| p.pid).collect();
        assert_eq!(by_pid, vec![12]);
        assert!(match_targets(&table, "steam").is_empty());
    }

    #[test]
    fn test_game_mode_needs_a_running_target() {
        assert_eq!(game_mode("  ").status, Status::Warning);
        assert_eq!(
            game_mode("qdesk-no-such-process-4f2a").status,
            Status::Warning
        );
    }
}
