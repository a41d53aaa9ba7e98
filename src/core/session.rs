//! Per-process application state: configuration, the running sampler, and
//! results that later operations act on (threats to quarantine, connections
//! to block).

use parking_lot::Mutex;
use std::sync::Arc;

use super::config::Config;
use super::monitor::{MonitorRuntime, MonitorState, SamplerConfig, SharedMonitor};
use super::ops::bulk::{self, BulkHandle, BulkStep};
use super::ops::netguard::{self, BlockReport, SuspiciousConnection};
use super::ops::outcome::OpOutcome;
use super::ops::security::{self, QuarantineReport, ScanReport, Threat};
use crate::error::Result;

pub struct Session {
    config: Config,
    monitor: Option<MonitorRuntime>,
    last_threats: Arc<Mutex<Vec<Threat>>>,
    last_connections: Arc<Mutex<Vec<SuspiciousConnection>>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            monitor: None,
            last_threats: Arc::new(Mutex::new(Vec::new())),
            last_connections: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start sampling; a second call returns the running sampler's state
    pub fn start_monitor(&mut self) -> Result<SharedMonitor> {
        if let Some(monitor) = &self.monitor {
            return Ok(monitor.state());
        }

        let runtime = MonitorRuntime::start(SamplerConfig::from(&self.config.sampler))?;
        let state = runtime.state();
        self.monitor = Some(runtime);
        Ok(state)
    }

    pub fn monitor_state(&self) -> Option<SharedMonitor> {
        self.monitor.as_ref().map(MonitorRuntime::state)
    }

    pub fn monitor_snapshot(&self) -> Option<MonitorState> {
        self.monitor.as_ref().map(MonitorRuntime::snapshot)
    }

    pub fn remember_threats(&self, threats: Vec<Threat>) {
        *self.last_threats.lock() = threats;
    }

    pub fn take_threats(&self) -> Vec<Threat> {
        std::mem::take(&mut *self.last_threats.lock())
    }

    pub fn threat_count(&self) -> usize {
        self.last_threats.lock().len()
    }

    pub fn remember_connections(&self, connections: Vec<SuspiciousConnection>) {
        *self.last_connections.lock() = connections;
    }

    pub fn take_connections(&self) -> Vec<SuspiciousConnection> {
        std::mem::take(&mut *self.last_connections.lock())
    }

    pub fn connection_count(&self) -> usize {
        self.last_connections.lock().len()
    }

    /// Quick scan whose threats are kept for a later quarantine
    pub fn quick_scan(&self) -> OpOutcome<ScanReport> {
        scan_into(&self.config, &self.last_threats)
    }

    pub fn scan_network(&self) -> OpOutcome<Vec<SuspiciousConnection>> {
        scan_connections_into(&self.last_connections)
    }

    /// Quarantine whatever the previous scan found
    pub fn quarantine_last(&self) -> OpOutcome<QuarantineReport> {
        quarantine_from(&self.last_threats, &self.config)
    }

    /// Block whatever the previous network scan flagged
    pub fn block_last(&self) -> OpOutcome<BlockReport> {
        block_from(&self.last_connections)
    }

    // Step builders for the dashboard: same operations, run off the UI thread

    pub fn quick_scan_step(&self) -> BulkStep {
        let config = self.config.clone();
        let stash = self.last_threats.clone();
        BulkStep::detailed("Quick Scan", move || scan_into(&config, &stash))
    }

    pub fn quarantine_step(&self) -> BulkStep {
        let config = self.config.clone();
        let stash = self.last_threats.clone();
        BulkStep::detailed("Quarantine", move || quarantine_from(&stash, &config))
    }

    pub fn network_scan_step(&self) -> BulkStep {
        let stash = self.last_connections.clone();
        BulkStep::detailed("Network Scan", move || scan_connections_into(&stash))
    }

    pub fn block_step(&self) -> BulkStep {
        let stash = self.last_connections.clone();
        BulkStep::detailed("Block Connections", move || block_from(&stash))
    }

    pub fn spawn_bulk(&self, name: impl Into<String>, steps: Vec<BulkStep>) -> Result<BulkHandle> {
        bulk::spawn(name, steps)
    }

    /// Stop the sampler and drop everything the session held
    pub fn shutdown(mut self) -> Result<()> {
        match self.monitor.take() {
            Some(monitor) => monitor.shutdown(),
            None => Ok(()),
        }
    }
}

fn scan_into(config: &Config, stash: &Mutex<Vec<Threat>>) -> OpOutcome<ScanReport> {
    let outcome = security::quick_malware_scan(config);
    if let Some(report) = &outcome.detail {
        *stash.lock() = report.threats.clone();
    }
    outcome
}

fn quarantine_from(stash: &Mutex<Vec<Threat>>, config: &Config) -> OpOutcome<QuarantineReport> {
    let threats = std::mem::take(&mut *stash.lock());
    if threats.is_empty() {
        return OpOutcome::warning("No threats from a previous scan to quarantine");
    }
    security::quarantine(&threats, &config.quarantine_dir())
}

fn scan_connections_into(
    stash: &Mutex<Vec<SuspiciousConnection>>,
) -> OpOutcome<Vec<SuspiciousConnection>> {
    let outcome = netguard::scan_network_connections();
    if let Some(found) = &outcome.detail {
        *stash.lock() = found.clone();
    }
    outcome
}

fn block_from(stash: &Mutex<Vec<SuspiciousConnection>>) -> OpOutcome<BlockReport> {
    let connections = std::mem::take(&mut *stash.lock());
    if connections.is_empty() {
        return OpOutcome::warning("No suspicious connections from a previous scan to block");
    }
    netguard::block_connections(&connections)
}
