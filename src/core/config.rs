use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::platform::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sampler: SamplerSettings,
    #[serde(default)]
    pub processes: ProcessSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub automation: AutomationSettings,
}

/// Cadence of the metrics sampler, expressed in ticks of `tick_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerSettings {
    pub tick_ms: u64,
    pub history_capacity: usize,
    pub gpu_every: u64,
    pub disks_every: u64,
    pub slow_every: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            history_capacity: 60,
            gpu_every: 2,
            disks_every: 5,
            slow_every: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessSettings {
    /// Processes above this share of total RAM are "heavy"
    pub heavy_memory_percent: f32,
    /// Processes below this CPU usage are "idle"
    pub idle_cpu_percent: f32,
    /// Never terminated, compared case-insensitively
    pub protected: Vec<String>,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            heavy_memory_percent: 10.0,
            idle_cpu_percent: 0.1,
            protected: [
                "system",
                "system.exe",
                "dwm.exe",
                "explorer.exe",
                "winlogon.exe",
                "csrss.exe",
                "smss.exe",
                "wininit.exe",
                "services.exe",
                "lsass.exe",
                "svchost.exe",
                "init",
                "systemd",
                "kthreadd",
                "launchd",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecuritySettings {
    /// Directories scanned for threats; empty means platform defaults
    #[serde(default)]
    pub scan_directories: Vec<String>,
    #[serde(default)]
    pub quarantine_dir: Option<String>,
    pub quick_scan_directories: usize,
    pub quick_scan_files_per_dir: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            scan_directories: Vec::new(),
            quarantine_dir: None,
            quick_scan_directories: 3,
            quick_scan_files_per_dir: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AutomationSettings {
    #[serde(default)]
    pub tasks_file: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // If the file is empty or corrupted, return default config
        if data.is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!(
                "Ignoring unreadable config {:?} ({}), using defaults",
                config_path,
                e
            );
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("qdesk").join("config.json"))
    }

    /// Directories to scan, falling back to platform defaults
    pub fn scan_directories(&self) -> Vec<PathBuf> {
        if self.security.scan_directories.is_empty() {
            paths::default_scan_directories()
        } else {
            self.security
                .scan_directories
                .iter()
                .map(PathBuf::from)
                .collect()
        }
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.security
            .quarantine_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::default_quarantine_dir)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.automation
            .tasks_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::default_tasks_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_sampler_cadence() {
        let config = Config::default();
        assert_eq!(config.sampler.tick_ms, 200);
        assert_eq!(config.sampler.history_capacity, 60);
        assert_eq!(config.sampler.gpu_every, 2);
        assert_eq!(config.sampler.disks_every, 5);
        assert_eq!(config.sampler.slow_every, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.processes.heavy_memory_percent = 25.0;
        config.security.quarantine_dir = Some("/tmp/q".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.processes.heavy_memory_percent, 25.0);
        assert_eq!(loaded.quarantine_dir(), PathBuf::from("/tmp/q"));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{not json").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sampler, SamplerSettings::default());
    }

    #[test]
    fn test_partial_file_fills_missing_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            br#"{"sampler":{"tick_ms":500,"history_capacity":30,"gpu_every":2,"disks_every":5,"slow_every":10}}"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sampler.tick_ms, 500);
        assert_eq!(loaded.processes, ProcessSettings::default());
    }
}
