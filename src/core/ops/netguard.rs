//! Active-connection review and outbound firewall blocks.

use serde::Serialize;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::bulk::BulkStep;
use super::outcome::{guard, OpOutcome};
use crate::error::QdError;
use crate::platform::{self, firewall};

/// Ports associated with remote access, chat botnets or old trojans
pub const SUSPICIOUS_PORTS: &[(u16, &str)] = &[
    (1433, "SQL Server"),
    (3389, "RDP"),
    (5900, "VNC"),
    (6667, "IRC"),
    (1337, "Common trojan port"),
    (31337, "Back Orifice"),
    (12345, "NetBus"),
    (54321, "Back Orifice 2000"),
];

/// `(network, prefix length)` pairs
const SUSPICIOUS_RANGES: &[(Ipv4Addr, u32)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub proto: String,
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub state: String,
    pub pid: Option<u32>,
}

impl Connection {
    pub fn is_established(&self) -> bool {
        self.state.eq_ignore_ascii_case("ESTABLISHED")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousConnection {
    pub connection: Connection,
    pub reasons: Vec<String>,
}

impl SuspiciousConnection {
    pub fn summary(&self) -> String {
        format!(
            "{} -> {} ({})",
            self.connection.local,
            self.connection.remote,
            self.reasons.join(", ")
        )
    }
}

/// `1.2.3.4:80`, `[::1]:80`, `::1:80` or the BSD form `1.2.3.4.80`
fn parse_endpoint(text: &str) -> Option<SocketAddr> {
    if let Some(rest) = text.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        let host = host.split('%').next()?;
        return Some(SocketAddr::new(host.parse().ok()?, port.parse().ok()?));
    }

    let split = text.rsplit_once(':').or_else(|| text.rsplit_once('.'))?;
    let (host, port) = split;
    let host = host.split('%').next()?;
    Some(SocketAddr::new(host.parse().ok()?, port.parse().ok()?))
}

fn parse_line(line: &str) -> Option<Connection> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let proto = tokens.first()?.to_ascii_lowercase();
    if !proto.starts_with("tcp") {
        return None;
    }

    // Unix tables carry Recv-Q and Send-Q before the addresses
    let queues = tokens.len() >= 5
        && tokens[1].chars().all(|c| c.is_ascii_digit())
        && tokens[2].chars().all(|c| c.is_ascii_digit());
    let offset = if queues { 3 } else { 1 };

    let local = parse_endpoint(tokens.get(offset)?)?;
    let remote = parse_endpoint(tokens.get(offset + 1)?)?;
    let state = tokens.get(offset + 2).map(|s| s.to_string()).unwrap_or_default();
    let pid = if queues {
        None
    } else {
        tokens.get(offset + 3).and_then(|p| p.parse().ok())
    };

    Some(Connection {
        proto,
        local,
        remote,
        state,
        pid,
    })
}

/// TCP rows of `netstat -ano` (Windows) or `netstat -tn` (Unix) output
pub fn parse_netstat(text: &str) -> Vec<Connection> {
    text.lines().filter_map(parse_line).collect()
}

fn port_label(port: u16) -> Option<&'static str> {
    SUSPICIOUS_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, label)| *label)
}

fn in_suspicious_range(ip: &IpAddr) -> bool {
    let IpAddr::V4(v4) = ip else {
        return false;
    };
    let addr = u32::from(*v4);
    SUSPICIOUS_RANGES.iter().any(|(net, prefix)| {
        let mask = u32::MAX << (32 - prefix);
        addr & mask == u32::from(*net) & mask
    })
}

/// Established connections on a suspicious port or to a suspicious range
pub fn classify(connections: &[Connection]) -> Vec<SuspiciousConnection> {
    connections
        .iter()
        .filter(|c| c.is_established())
        .filter_map(|c| {
            let mut reasons = Vec::new();
            if let Some(label) = port_label(c.local.port()) {
                reasons.push(format!("local port {} ({})", c.local.port(), label));
            }
            if let Some(label) = port_label(c.remote.port()) {
                reasons.push(format!("remote port {} ({})", c.remote.port(), label));
            }
            if in_suspicious_range(&c.remote.ip()) {
                reasons.push(format!("remote address {} in reserved range", c.remote.ip()));
            }
            (!reasons.is_empty()).then(|| SuspiciousConnection {
                connection: c.clone(),
                reasons,
            })
        })
        .collect()
}

pub fn scan_network_connections() -> OpOutcome<Vec<SuspiciousConnection>> {
    guard("scan_network_connections", || {
        let connections = parse_netstat(&firewall::netstat_text()?);
        let established = connections.iter().filter(|c| c.is_established()).count();
        let suspicious = classify(&connections);

        let items: Vec<String> = suspicious.iter().take(10).map(|s| s.summary()).collect();
        Ok(OpOutcome::success(format!(
            "Network scan: {} established connections, {} suspicious",
            established,
            suspicious.len()
        ))
        .with_items(items)
        .with_detail(suspicious))
    })
}

/// Distinct remote addresses worth a block rule
pub fn block_targets(connections: &[SuspiciousConnection]) -> Vec<IpAddr> {
    connections
        .iter()
        .map(|c| c.connection.remote.ip())
        .filter(|ip| !ip.is_unspecified())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    pub rules: Vec<String>,
    pub failed: Vec<IpAddr>,
}

/// One outbound block rule per distinct remote IP
pub fn block_connections(connections: &[SuspiciousConnection]) -> OpOutcome<BlockReport> {
    guard("block_connections", || {
        let targets = block_targets(connections);
        if targets.is_empty() {
            return Ok(OpOutcome::warning("No connections to block"));
        }
        if !cfg!(windows) {
            return Err(QdError::unsupported("outbound block rules use netsh"));
        }
        platform::require_elevated("block_connections")?;

        let stamp = chrono::Utc::now().timestamp();
        let mut report = BlockReport::default();
        for ip in targets {
            let rule = firewall::block_rule_name(&ip, stamp);
            match firewall::add_outbound_block(&ip, &rule) {
                Ok(()) => report.rules.push(rule),
                Err(e) => {
                    log::warn!("Failed to block {}: {}", ip, e);
                    report.failed.push(ip);
                }
            }
        }

        let message = format!(
            "Blocked {} addresses ({} failed)",
            report.rules.len(),
            report.failed.len()
        );
        let outcome = if report.rules.is_empty() {
            OpOutcome::error(message)
        } else {
            OpOutcome::success(message)
        };
        Ok(outcome.with_items(report.rules.clone()).with_detail(report))
    })
}

pub fn firewall_status() -> OpOutcome<bool> {
    guard("firewall_status", || {
        let enabled = firewall::firewall_enabled()?;
        let outcome = if enabled {
            OpOutcome::success("Firewall is enabled for all profiles")
        } else {
            OpOutcome::warning("Firewall is disabled for at least one profile")
        };
        Ok(outcome.with_detail(enabled))
    })
}

pub fn network_analysis() -> Vec<BulkStep> {
    vec![
        BulkStep::detailed("Connection Scan", scan_network_connections),
        BulkStep::detailed("Firewall Status", firewall_status),
    ]
}
