//! Browser data and usage-trace removal.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::optimizer::{empty_dir, PurgeStats};
use super::outcome::{guard, OpOutcome};
use crate::error::QdError;
use crate::platform::{paths, shell};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrowserCleanup {
    pub browser: String,
    pub items_removed: usize,
    pub bytes_removed: u64,
}

/// Remove a file, or a directory with everything in it
fn remove_artifact(path: &Path) -> PurgeStats {
    let mut stats = PurgeStats::default();
    let Ok(meta) = fs::symlink_metadata(path) else {
        return stats;
    };

    if meta.is_dir() {
        stats.merge(empty_dir(path));
        match fs::remove_dir(path) {
            Ok(()) => stats.dirs_removed += 1,
            Err(_) => stats.failed += 1,
        }
    } else {
        match fs::remove_file(path) {
            Ok(()) => {
                stats.files_removed += 1;
                stats.bytes_removed += meta.len();
            }
            Err(e) => {
                log::debug!("Could not remove {:?}: {}", path, e);
                stats.failed += 1;
            }
        }
    }
    stats
}

fn clean_paths(browser: &str, targets: &[PathBuf]) -> BrowserCleanup {
    let mut cleanup = BrowserCleanup {
        browser: browser.to_string(),
        ..Default::default()
    };
    for target in targets {
        let stats = remove_artifact(target);
        if stats.files_removed + stats.dirs_removed > 0 {
            cleanup.items_removed += 1;
        }
        cleanup.bytes_removed += stats.bytes_removed;
    }
    cleanup
}

fn firefox_targets(home: &Path) -> Vec<PathBuf> {
    let Ok(profiles) = fs::read_dir(paths::firefox_profiles_dir(home)) else {
        return Vec::new();
    };

    let mut targets = Vec::new();
    for profile in profiles.flatten() {
        if profile.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            let dir = profile.path();
            targets.extend(paths::FIREFOX_ARTIFACTS.iter().map(|a| dir.join(a)));
        }
    }
    targets
}

/// Clear Chrome, Edge and Firefox history, cookies and caches under `home`
pub fn clear_browser_data(home: &Path) -> OpOutcome<Vec<BrowserCleanup>> {
    guard("clear_browser_data", || {
        if home.as_os_str().is_empty() || !home.is_dir() {
            return Err(QdError::invalid_path(format!(
                "home directory {} not found",
                home.display()
            )));
        }

        let mut results: Vec<BrowserCleanup> = paths::chromium_artifacts(home)
            .iter()
            .map(|b| clean_paths(b.browser, &b.paths))
            .collect();
        results.push(clean_paths("Firefox", &firefox_targets(home)));

        let total_bytes: u64 = results.iter().map(|r| r.bytes_removed).sum();
        let items: Vec<String> = results
            .iter()
            .filter(|r| r.items_removed > 0)
            .map(|r| {
                format!(
                    "{}: {} items ({:.1} MB)",
                    r.browser,
                    r.items_removed,
                    r.bytes_removed as f64 / (1024.0 * 1024.0)
                )
            })
            .collect();

        let message = if items.is_empty() {
            "No browser data found to clear".to_string()
        } else {
            format!(
                "Browser data cleared: {:.1} MB freed",
                total_bytes as f64 / (1024.0 * 1024.0)
            )
        };
        Ok(OpOutcome::success(message).with_items(items).with_detail(results))
    })
}

const EVENT_LOGS: &[&str] = &["Application", "System", "Security"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceCleanup {
    pub files_removed: usize,
    pub logs_cleared: Vec<String>,
}

/// Recent documents, jump lists and (on Windows) the main event logs
pub fn clear_system_traces(home: &Path) -> OpOutcome<TraceCleanup> {
    guard("clear_system_traces", || {
        let mut cleanup = TraceCleanup::default();

        let mut dirs = paths::recent_document_dirs(home);
        dirs.extend(paths::jump_list_dir(home));
        for dir in &dirs {
            cleanup.files_removed += empty_dir(dir).files_removed;
        }

        if cfg!(windows) {
            for log_name in EVENT_LOGS {
                match shell::run_checked("wevtutil", &["cl", log_name]) {
                    Ok(_) => cleanup.logs_cleared.push(log_name.to_string()),
                    Err(e) => log::warn!("Could not clear {} log: {}", log_name, e),
                }
            }
        }

        let mut items = vec![format!("Removed {} recent/jump list entries", cleanup.files_removed)];
        items.extend(cleanup.logs_cleared.iter().map(|l| format!("Cleared {} event log", l)));

        Ok(OpOutcome::success("System traces cleared")
            .with_items(items)
            .with_detail(cleanup))
    })
}
