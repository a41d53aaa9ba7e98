//! Heuristic threat scans, quarantine, secure deletion and Windows hardening.
//!
//! Detection is limited to file-name patterns, executable size and a short
//! list of known SHA-256 hashes.

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::bulk::BulkStep;
use super::outcome::{guard, OpOutcome};
use super::walk::{self, lower_ext, lower_name};
use super::{netguard, privacy};
use crate::core::config::Config;
use crate::error::{QdError, Result};
use crate::platform::{self, firewall, registry, shell};

pub const DEFAULT_PATTERNS: &[&str] = &[
    r".*\.exe\.exe$",
    r".*\.(scr|pif|bat|cmd|com)$",
    r".*\.(vbs|js|jar|wsf)$",
];

/// SHA-256 digests treated as known malware
pub const KNOWN_MALWARE_HASHES: &[&str] =
    &["275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f"];

const MIN_EXE_SIZE: u64 = 1024;
const MAX_EXE_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThreatKind {
    SuspiciousPattern,
    SuspiciousSize,
    KnownHash,
}

impl fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatKind::SuspiciousPattern => write!(f, "Suspicious Pattern"),
            ThreatKind::SuspiciousSize => write!(f, "Suspicious Size"),
            ThreatKind::KnownHash => write!(f, "Known Malware Hash"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Risk {
    Medium,
    High,
    Critical,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Medium => write!(f, "Medium"),
            Risk::High => write!(f, "High"),
            Risk::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Threat {
    pub path: PathBuf,
    pub kind: ThreatKind,
    pub reason: String,
    pub risk: Risk,
}

impl Threat {
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}: {} ({})",
            self.risk,
            self.kind,
            self.path.display(),
            self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub threats: Vec<Threat>,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn count(&self, risk: Risk) -> usize {
        self.threats.iter().filter(|t| t.risk == risk).count()
    }

    fn into_outcome(self, label: &str) -> OpOutcome<ScanReport> {
        let mut message = format!(
            "{}: {} files scanned, {} threats found",
            label,
            self.files_scanned,
            self.threats.len()
        );
        if self.cancelled {
            message.push_str(" (cancelled)");
        }
        let items: Vec<String> = self.threats.iter().take(15).map(Threat::summary).collect();
        OpOutcome::success(message).with_items(items).with_detail(self)
    }
}

pub struct ThreatScanner {
    directories: Vec<PathBuf>,
    patterns: Vec<Regex>,
    known_hashes: HashSet<String>,
}

impl ThreatScanner {
    pub fn new<S: AsRef<str>>(directories: Vec<PathBuf>, patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            directories,
            patterns,
            known_hashes: KNOWN_MALWARE_HASHES.iter().map(|h| h.to_string()).collect(),
        })
    }

    pub fn with_defaults(directories: Vec<PathBuf>) -> Result<Self> {
        Self::new(directories, DEFAULT_PATTERNS)
    }

    pub fn add_known_hash(&mut self, hex_digest: &str) {
        self.known_hashes.insert(hex_digest.to_lowercase());
    }

    fn matching_patterns(&self, lower_name: &str) -> Vec<&Regex> {
        self.patterns
            .iter()
            .filter(|p| p.is_match(lower_name))
            .collect()
    }

    fn check_quick(&self, path: &Path, report: &mut ScanReport) {
        report.files_scanned += 1;
        let name = lower_name(path);

        for pattern in self.matching_patterns(&name) {
            report.threats.push(Threat {
                path: path.to_path_buf(),
                kind: ThreatKind::SuspiciousPattern,
                reason: pattern.as_str().to_string(),
                risk: Risk::Medium,
            });
        }

        if name.ends_with(".exe") {
            if let Ok(meta) = fs::metadata(path) {
                let size = meta.len();
                if !(MIN_EXE_SIZE..=MAX_EXE_SIZE).contains(&size) {
                    report.threats.push(Threat {
                        path: path.to_path_buf(),
                        kind: ThreatKind::SuspiciousSize,
                        reason: format!("Size: {} bytes", size),
                        risk: Risk::Medium,
                    });
                }
            }
        }
    }

    /// The first `max_dirs` directories, at most `files_per_dir` files from
    /// each directory visited
    pub fn quick_scan(&self, max_dirs: usize, files_per_dir: usize) -> ScanReport {
        let mut report = ScanReport::default();
        for dir in self.directories.iter().take(max_dirs) {
            self.quick_scan_dir(dir, files_per_dir, &mut report);
        }
        report
    }

    fn quick_scan_dir(&self, dir: &Path, files_per_dir: usize, report: &mut ScanReport) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            match entry.file_type() {
                Ok(t) if t.is_file() => files.push(entry.path()),
                Ok(t) if t.is_dir() => subdirs.push(entry.path()),
                _ => {}
            }
        }
        files.sort();
        subdirs.sort();

        for file in files.iter().take(files_per_dir) {
            self.check_quick(file, report);
        }
        for sub in subdirs {
            self.quick_scan_dir(&sub, files_per_dir, report);
        }
    }

    /// Every file in every directory; stops early when `cancel` fires
    pub fn deep_scan(&self, cancel: &CancellationToken) -> ScanReport {
        let mut report = ScanReport::default();

        'dirs: for dir in &self.directories {
            for path in walk::files_under(dir, None) {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'dirs;
                }
                report.files_scanned += 1;

                let name = lower_name(&path);
                for _ in self.matching_patterns(&name) {
                    report.threats.push(Threat {
                        path: path.clone(),
                        kind: ThreatKind::SuspiciousPattern,
                        reason: "Malicious pattern".to_string(),
                        risk: Risk::High,
                    });
                }

                if matches!(lower_ext(&path).as_deref(), Some("exe" | "dll" | "scr")) {
                    match sha256_file(&path) {
                        Ok(digest) if self.known_hashes.contains(&digest) => {
                            report.threats.push(Threat {
                                path: path.clone(),
                                kind: ThreatKind::KnownHash,
                                reason: digest,
                                risk: Risk::Critical,
                            });
                        }
                        Ok(_) => {}
                        Err(e) => log::debug!("Could not hash {:?}: {}", path, e),
                    }
                }
            }
        }

        report
    }
}

/// Lower-case hex SHA-256 of a file, streamed
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn scanner_for(config: &Config) -> Result<ThreatScanner> {
    ThreatScanner::with_defaults(config.scan_directories())
}

pub fn quick_malware_scan(config: &Config) -> OpOutcome<ScanReport> {
    guard("quick_malware_scan", || {
        let report = scanner_for(config)?.quick_scan(
            config.security.quick_scan_directories,
            config.security.quick_scan_files_per_dir,
        );
        Ok(report.into_outcome("Quick malware scan"))
    })
}

pub fn deep_malware_scan(config: &Config, cancel: &CancellationToken) -> OpOutcome<ScanReport> {
    guard("deep_malware_scan", || {
        let report = scanner_for(config)?.deep_scan(cancel);
        let critical = report.count(Risk::Critical);
        let high = report.count(Risk::High);
        let mut outcome = report.into_outcome("Deep malware scan");
        outcome.message = format!(
            "{} ({} critical, {} high risk)",
            outcome.message, critical, high
        );
        Ok(outcome)
    })
}

// ---------------------------------------------------------------------------
// Quarantine and secure deletion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuarantineReport {
    pub quarantined: usize,
    pub failed: usize,
    pub location: PathBuf,
}

fn quarantine_target(dir: &Path, source: &Path, stamp: i64) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let mut target = dir.join(format!("{}_{}", name, stamp));
    let mut n = 1;
    while target.exists() {
        target = dir.join(format!("{}_{}_{}", name, stamp, n));
        n += 1;
    }
    target
}

/// Rename, falling back to copy + delete across filesystems
pub(crate) fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
    }
}

/// Move each threat's file into `dir` as `<name>_<unix-seconds>`
pub fn quarantine(threats: &[Threat], dir: &Path) -> OpOutcome<QuarantineReport> {
    guard("quarantine", || {
        if threats.is_empty() {
            return Ok(OpOutcome::warning("No threats specified for quarantine"));
        }

        fs::create_dir_all(dir)?;
        let stamp = chrono::Utc::now().timestamp();
        let mut report = QuarantineReport {
            location: dir.to_path_buf(),
            ..Default::default()
        };

        // One file can match several rules; move it once
        let mut seen = HashSet::new();
        for threat in threats {
            if !seen.insert(threat.path.clone()) || !threat.path.exists() {
                continue;
            }
            let target = quarantine_target(dir, &threat.path, stamp);
            match move_file(&threat.path, &target) {
                Ok(()) => {
                    log::info!("Quarantined {:?}", threat.path);
                    report.quarantined += 1;
                }
                Err(e) => {
                    log::warn!("Failed to quarantine {:?}: {}", threat.path, e);
                    report.failed += 1;
                }
            }
        }

        Ok(OpOutcome::success(format!(
            "Quarantined {} files, {} failed, location {}",
            report.quarantined,
            report.failed,
            dir.display()
        ))
        .with_detail(report))
    })
}

/// Counter-mode SHA-256 keystream for the random overwrite pass
struct NoiseStream {
    seed: [u8; 32],
    counter: u64,
}

impl NoiseStream {
    fn new(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(std::process::id().to_le_bytes());
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        hasher.update(nanos.to_le_bytes());
        Self {
            seed: hasher.finalize().into(),
            counter: 0,
        }
    }

    fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(32) {
            let mut hasher = Sha256::new();
            hasher.update(self.seed);
            hasher.update(self.counter.to_le_bytes());
            self.counter += 1;
            let block = hasher.finalize();
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Fill(u8),
    Noise,
}

fn overwrite(file: &mut File, len: u64, pass: Pass, noise: &mut NoiseStream) -> io::Result<()> {
    const CHUNK: usize = 64 * 1024;
    let mut buf = vec![0u8; CHUNK];
    if let Pass::Fill(byte) = pass {
        buf.fill(byte);
    }

    file.seek(SeekFrom::Start(0))?;
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        if let Pass::Noise = pass {
            noise.fill(&mut buf[..n]);
        }
        file.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()
}

/// Overwrite with zeros, noise and ones, then remove
pub fn shred_file(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(QdError::invalid_path(format!("{} is not a file", path.display())));
    }

    let len = meta.len();
    let mut noise = NoiseStream::new(path);
    {
        let mut file = OpenOptions::new().write(true).open(path)?;
        overwrite(&mut file, len, Pass::Fill(0x00), &mut noise)?;
        overwrite(&mut file, len, Pass::Noise, &mut noise)?;
        overwrite(&mut file, len, Pass::Fill(0xFF), &mut noise)?;
    }
    fs::remove_file(path)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub deleted: usize,
    pub failed: usize,
}

pub fn secure_delete_files(paths: &[PathBuf]) -> OpOutcome<DeletionReport> {
    guard("secure_delete_files", || {
        if paths.is_empty() {
            return Ok(OpOutcome::warning("No files specified for secure deletion"));
        }

        let mut report = DeletionReport::default();
        for path in paths {
            match shred_file(path) {
                Ok(()) => {
                    log::info!("Securely deleted {:?}", path);
                    report.deleted += 1;
                }
                Err(e) => {
                    log::warn!("Failed to securely delete {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }

        Ok(OpOutcome::success(format!(
            "Securely deleted {} files ({} failed), 3-pass overwrite",
            report.deleted, report.failed
        ))
        .with_detail(report))
    })
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryThreat {
    pub location: String,
    pub name: String,
    pub value: String,
    pub risk: Risk,
    pub reason: String,
}

const SUSPICIOUS_PATH_FRAGMENTS: &[&str] =
    &["temp\\", "appdata\\local\\temp", "\\system32\\", "startup\\"];

const DOUBLE_EXTENSIONS: &[&str] = &[".exe.exe", ".scr.exe"];

/// Rate one autostart entry
pub fn classify_autostart(entry: &registry::RegistryEntry) -> Vec<RegistryThreat> {
    let value = entry.data.to_lowercase();
    let mut found = Vec::new();

    if SUSPICIOUS_PATH_FRAGMENTS.iter().any(|f| value.contains(f)) {
        found.push(RegistryThreat {
            location: entry.location(),
            name: entry.name.clone(),
            value: entry.data.clone(),
            risk: Risk::Medium,
            reason: "Suspicious file path".to_string(),
        });
    }
    if DOUBLE_EXTENSIONS.iter().any(|ext| value.contains(ext)) {
        found.push(RegistryThreat {
            location: entry.location(),
            name: entry.name.clone(),
            value: entry.data.clone(),
            risk: Risk::High,
            reason: "Double file extension".to_string(),
        });
    }
    found
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryScanReport {
    pub values_scanned: usize,
    pub threats: Vec<RegistryThreat>,
}

pub fn scan_registry_threats() -> OpOutcome<RegistryScanReport> {
    guard("scan_registry_threats", || {
        let mut report = RegistryScanReport::default();

        for (hive, key) in registry::AUTOSTART_KEYS {
            let entries = match registry::read_values(*hive, key) {
                Ok(entries) => entries,
                Err(QdError::Unsupported(what)) => return Err(QdError::Unsupported(what)),
                Err(e) => {
                    log::debug!("Skipping {}\\{}: {}", hive.label(), key, e);
                    continue;
                }
            };
            report.values_scanned += entries.len();
            for entry in &entries {
                report.threats.extend(classify_autostart(entry));
            }
        }

        let items: Vec<String> = report
            .threats
            .iter()
            .take(10)
            .map(|t| format!("[{}] {}: {} ({})", t.risk, t.name, t.value, t.reason))
            .collect();
        Ok(OpOutcome::success(format!(
            "Registry scan: {} values scanned, {} suspicious",
            report.values_scanned,
            report.threats.len()
        ))
        .with_items(items)
        .with_detail(report))
    })
}

// ---------------------------------------------------------------------------
// Hardening
// ---------------------------------------------------------------------------

fn require_windows(what: &str) -> Result<()> {
    if cfg!(windows) {
        Ok(())
    } else {
        Err(QdError::unsupported(format!("{} targets Windows", what)))
    }
}

/// Run a list of independent actions, keeping the labels of those that worked
fn apply_all(actions: Vec<(&str, Box<dyn FnOnce() -> Result<()>>)>) -> (Vec<String>, usize) {
    let mut applied = Vec::new();
    let mut failed = 0;
    for (label, action) in actions {
        match action() {
            Ok(()) => applied.push(label.to_string()),
            Err(e) => {
                log::warn!("{}: {}", label, e);
                failed += 1;
            }
        }
    }
    (applied, failed)
}

fn applied_outcome(title: &str, applied: Vec<String>, failed: usize) -> OpOutcome {
    let message = format!("{}: {} applied, {} failed", title, applied.len(), failed);
    let outcome = if applied.is_empty() {
        OpOutcome::warning(message)
    } else {
        OpOutcome::success(message)
    };
    outcome.with_items(applied)
}

fn powershell(command: &str) -> Result<()> {
    shell::run_checked("powershell", &["-NoProfile", "-Command", command]).map(|_| ())
}

pub fn harden_settings() -> OpOutcome {
    guard("harden_settings", || {
        require_windows("hardening")?;

        let mut actions: Vec<(&str, Box<dyn FnOnce() -> Result<()>>)> = Vec::new();
        for (label, service) in [
            ("Disabled Telnet service", "Telnet"),
            ("Disabled RemoteRegistry service", "RemoteRegistry"),
            ("Disabled RemoteAccess service", "RemoteAccess"),
            ("Disabled Fax service", "Fax"),
        ] {
            actions.push((
                label,
                Box::new(move || {
                    shell::run_checked("sc", &["config", service, "start=", "disabled"])?;
                    // Stopping an already stopped service fails harmlessly
                    let _ = shell::run("sc", &["stop", service]);
                    Ok(())
                }),
            ));
        }
        actions.push((
            "Disabled AutoRun for all drives",
            Box::new(|| {
                registry::set_dword(
                    registry::Hive::CurrentUser,
                    "Software\\Microsoft\\Windows\\CurrentVersion\\Policies\\Explorer",
                    "NoDriveTypeAutoRun",
                    255,
                )
            }),
        ));
        actions.push((
            "Disabled TCP/IP task offloading",
            Box::new(|| {
                shell::run_checked(
                    "netsh",
                    &["int", "ip", "set", "global", "taskoffload=disabled"],
                )
                .map(|_| ())
            }),
        ));
        actions.push((
            "Enabled Windows Defender real-time protection",
            Box::new(|| powershell("Set-MpPreference -DisableRealtimeMonitoring $false")),
        ));
        actions.push((
            "Updated Windows Defender signatures",
            Box::new(|| powershell("Update-MpSignature")),
        ));

        let (applied, failed) = apply_all(actions);
        Ok(applied_outcome("Windows hardening", applied, failed))
    })
}

const DEFENDER_PREFERENCES: &[&str] = &[
    "Set-MpPreference -DisableRealtimeMonitoring $false",
    "Set-MpPreference -DisableBehaviorMonitoring $false",
    "Set-MpPreference -DisableBlockAtFirstSeen $false",
    "Set-MpPreference -DisableIOAVProtection $false",
    "Set-MpPreference -DisablePrivacyMode $false",
    "Set-MpPreference -SignatureDisableUpdateOnStartupWithoutEngine $false",
    "Set-MpPreference -DisableArchiveScanning $false",
    "Set-MpPreference -DisableIntrusionPreventionSystem $false",
    "Set-MpPreference -DisableScriptScanning $false",
];

const UAC_POLICY: &[(&str, u32)] = &[
    ("ConsentPromptBehaviorAdmin", 2),
    ("ConsentPromptBehaviorUser", 3),
    ("EnableInstallerDetection", 1),
    ("EnableSecureUIAPaths", 1),
    ("EnableUIADesktopToggle", 0),
    ("EnableVirtualization", 1),
    ("PromptOnSecureDesktop", 1),
];

pub fn enable_advanced_protection() -> OpOutcome {
    guard("enable_advanced_protection", || {
        require_windows("advanced protection")?;

        let actions: Vec<(&str, Box<dyn FnOnce() -> Result<()>>)> = vec![
            (
                "Windows Defender Advanced Protection",
                Box::new(|| {
                    DEFENDER_PREFERENCES
                        .iter()
                        .try_for_each(|cmd| powershell(cmd))
                }),
            ),
            (
                "Enhanced User Account Control (UAC)",
                Box::new(|| {
                    UAC_POLICY.iter().try_for_each(|(name, value)| {
                        registry::set_dword(
                            registry::Hive::LocalMachine,
                            "Software\\Microsoft\\Windows\\CurrentVersion\\Policies\\System",
                            name,
                            *value,
                        )
                    })
                }),
            ),
            (
                "Windows SmartScreen",
                Box::new(|| {
                    registry::set_dword(
                        registry::Hive::LocalMachine,
                        "Software\\Policies\\Microsoft\\Windows\\System",
                        "EnableSmartScreen",
                        2,
                    )
                }),
            ),
            (
                "Data Execution Prevention (DEP)",
                Box::new(|| shell::run_checked("bcdedit", &["/set", "nx", "AlwaysOn"]).map(|_| ())),
            ),
        ];

        let (applied, failed) = apply_all(actions);
        let mut outcome = applied_outcome("Advanced protection", applied, failed);
        outcome.message.push_str("; some changes need a restart");
        Ok(outcome)
    })
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditCheck {
    pub status: String,
    pub score: u32,
}

impl AuditCheck {
    fn new(status: &str, score: u32) -> Self {
        Self {
            status: status.to_string(),
            score,
        }
    }

    fn unknown(score: u32) -> Self {
        Self::new("Unknown", score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditResults {
    pub windows_updates: AuditCheck,
    pub antivirus: AuditCheck,
    pub firewall: AuditCheck,
    pub user_accounts: AuditCheck,
    pub system_integrity: AuditCheck,
}

impl AuditResults {
    pub fn score(&self) -> u32 {
        let total = self.windows_updates.score
            + self.antivirus.score
            + self.firewall.score
            + self.user_accounts.score
            + self.system_integrity.score;
        total.min(100)
    }

    pub fn recommendations(&self) -> Vec<String> {
        let mut recs = Vec::new();
        if self.antivirus.score < 20 {
            recs.push("Enable and update antivirus protection".to_string());
        }
        if self.firewall.score < 15 {
            recs.push("Enable Windows Firewall for all profiles".to_string());
        }
        if self.windows_updates.score < 15 {
            recs.push("Install pending Windows updates".to_string());
        }
        if self.system_integrity.score < 15 {
            recs.push("Run system file checker (sfc /scannow)".to_string());
        }
        recs
    }
}

fn check_antivirus() -> AuditCheck {
    if !cfg!(windows) {
        return AuditCheck::unknown(10);
    }
    match shell::run("powershell", &["-NoProfile", "-Command", "Get-MpComputerStatus"]) {
        Ok(out) if out.success() && out.stdout.contains("True") => AuditCheck::new("Active", 25),
        Ok(_) => AuditCheck::new("Inactive", 0),
        Err(_) => AuditCheck::unknown(10),
    }
}

fn check_firewall() -> AuditCheck {
    match firewall::firewall_enabled() {
        Ok(true) => AuditCheck::new("Active", 20),
        Ok(false) => AuditCheck::new("Inactive", 0),
        Err(_) => AuditCheck::unknown(10),
    }
}

fn check_accounts() -> AuditCheck {
    if platform::is_elevated() {
        AuditCheck::new("Running with administrator rights", 5)
    } else {
        AuditCheck::new("Standard user", 15)
    }
}

fn check_integrity() -> AuditCheck {
    if !cfg!(windows) {
        return AuditCheck::unknown(10);
    }
    match shell::run("sfc", &["/verifyonly"]) {
        Ok(out) if out.success() => AuditCheck::new("Intact", 20),
        Ok(_) => AuditCheck::new("Issues found", 5),
        Err(_) => AuditCheck::unknown(10),
    }
}

pub fn run_audit() -> AuditResults {
    AuditResults {
        // Pending updates are not queried
        windows_updates: AuditCheck::unknown(10),
        antivirus: check_antivirus(),
        firewall: check_firewall(),
        user_accounts: check_accounts(),
        system_integrity: check_integrity(),
    }
}

pub fn security_audit() -> OpOutcome<AuditResults> {
    guard("security_audit", || {
        let results = run_audit();
        let mut items = vec![
            format!("Windows Updates: {}", results.windows_updates.status),
            format!("Antivirus: {}", results.antivirus.status),
            format!("Firewall: {}", results.firewall.status),
            format!("User Accounts: {}", results.user_accounts.status),
            format!("System Integrity: {}", results.system_integrity.status),
        ];
        items.extend(results.recommendations().into_iter().map(|r| format!("Recommendation: {}", r)));

        Ok(OpOutcome::success(format!("Security score: {}/100", results.score()))
            .with_items(items)
            .with_detail(results))
    })
}

// ---------------------------------------------------------------------------
// Compositions
// ---------------------------------------------------------------------------

/// Hardening, advanced protection, trace clearing and a network scan
pub fn full_protection() -> Vec<BulkStep> {
    vec![
        BulkStep::new("System Hardening", harden_settings),
        BulkStep::new("Advanced Protection", enable_advanced_protection),
        BulkStep::detailed("Privacy Enhancement", || {
            privacy::clear_system_traces(&platform::paths::home_dir())
        }),
        BulkStep::detailed("Network Security", netguard::scan_network_connections),
    ]
}

/// Malware, registry, network and audit checks in one run
pub fn comprehensive(config: &Config) -> Vec<BulkStep> {
    let config = config.clone();
    vec![
        BulkStep::detailed("Malware Analysis", move || quick_malware_scan(&config)),
        BulkStep::detailed("Registry Threats", scan_registry_threats),
        BulkStep::detailed("Network Analysis", netguard::scan_network_connections),
        BulkStep::detailed("Security Audit", security_audit),
    ]
}
