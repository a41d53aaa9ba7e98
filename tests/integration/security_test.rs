// Scan, quarantine and secure deletion on scratch folders

use qdesk::core::ops::security::{self, Risk, ThreatKind, ThreatScanner};
use qdesk::core::ops::Status;
use qdesk::{Config, Session};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn config_for(scan: &TempDir, quarantine: &TempDir) -> Config {
    let mut config = Config::default();
    config.security.scan_directories = vec![scan.path().to_string_lossy().into_owned()];
    config.security.quarantine_dir = Some(quarantine.path().to_string_lossy().into_owned());
    config
}

#[test]
fn test_quick_scan_flags_patterns_and_sizes() {
    let scan = TempDir::new().unwrap();
    fs::write(scan.path().join("invoice.pdf.exe.exe"), vec![0u8; 4096]).unwrap();
    fs::write(scan.path().join("run.bat"), b"@echo off").unwrap();
    fs::write(scan.path().join("tiny.exe"), b"MZ").unwrap();
    fs::write(scan.path().join("photo.jpg"), b"jpeg").unwrap();

    let scanner = ThreatScanner::with_defaults(vec![scan.path().to_path_buf()]).unwrap();
    let report = scanner.quick_scan(3, 50);

    assert_eq!(report.files_scanned, 4);
    let mut names: Vec<String> = report
        .threats
        .iter()
        .map(|t| t.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names, vec!["invoice.pdf.exe.exe", "run.bat", "tiny.exe"]);
    assert!(report
        .threats
        .iter()
        .any(|t| t.kind == ThreatKind::SuspiciousSize && t.risk == Risk::Medium));
}

#[test]
fn test_deep_scan_matches_known_hash() {
    let scan = TempDir::new().unwrap();
    let payload = scan.path().join("payload.dll");
    fs::write(&payload, b"definitely malware").unwrap();

    let mut scanner = ThreatScanner::with_defaults(vec![scan.path().to_path_buf()]).unwrap();
    scanner.add_known_hash(&security::sha256_file(&payload).unwrap());

    let report = scanner.deep_scan(&CancellationToken::new());
    assert_eq!(report.count(Risk::Critical), 1);
    assert_eq!(report.threats[0].kind, ThreatKind::KnownHash);
}

#[test]
fn test_cancelled_deep_scan_stops() {
    let scan = TempDir::new().unwrap();
    for i in 0..20 {
        fs::write(scan.path().join(format!("f{}.txt", i)), b"x").unwrap();
    }
    let cancel = CancellationToken::new();
    cancel.cancel();

    let scanner = ThreatScanner::with_defaults(vec![scan.path().to_path_buf()]).unwrap();
    let report = scanner.deep_scan(&cancel);
    assert!(report.cancelled);
    assert!(report.files_scanned < 20);
}

#[test]
fn test_session_scan_then_quarantine() {
    let scan = TempDir::new().unwrap();
    let vault = TempDir::new().unwrap();
    fs::write(scan.path().join("macro.vbs"), b"MsgBox 1").unwrap();
    fs::write(scan.path().join("keep.txt"), b"fine").unwrap();

    let session = Session::new(config_for(&scan, &vault));
    let scan_outcome = session.quick_scan();
    assert_eq!(scan_outcome.status, Status::Success);
    assert_eq!(session.threat_count(), 1);

    let outcome = session.quarantine_last();
    let report = outcome.detail.unwrap();
    assert_eq!(report.quarantined, 1);
    assert_eq!(report.failed, 0);

    let moved: Vec<String> = fs::read_dir(vault.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(moved.len(), 1);
    assert!(moved[0].starts_with("macro.vbs_"));
    assert!(scan.path().join("keep.txt").exists());

    // The stash was consumed
    assert_eq!(session.quarantine_last().status, Status::Warning);
    session.shutdown().unwrap();
}

#[test]
fn test_secure_delete_removes_files() {
    let dir = TempDir::new().unwrap();
    let secret = dir.path().join("secret.txt");
    fs::write(&secret, b"password=hunter2").unwrap();
    let missing = dir.path().join("missing.txt");

    let outcome = security::secure_delete_files(&[secret.clone(), missing]);
    let report = outcome.detail.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 1);
    assert!(!secret.exists());

    assert_eq!(security::secure_delete_files(&[]).status, Status::Warning);
}
