use qdesk::core::config::Config;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
    assert_eq!(config.sampler.history_capacity, 60);
    assert_eq!(config.sampler.tick_ms, 200);
}

#[test]
fn test_corrupt_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{{{").unwrap();
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.sampler.gpu_every, 2);
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.security.scan_directories = vec!["/srv/incoming".into()];
    config.automation.tasks_file = Some("/var/lib/qdesk/tasks.json".into());
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.security.scan_directories, vec!["/srv/incoming".to_string()]);
    assert_eq!(
        loaded.tasks_file(),
        std::path::PathBuf::from("/var/lib/qdesk/tasks.json")
    );
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"sampler": {"tick_ms": 500}}"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.sampler.tick_ms, 500);
    assert_eq!(config.sampler.disks_every, 5);
    assert!(!config.processes.protected.is_empty());
}
