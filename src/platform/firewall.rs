use std::net::IpAddr;

use super::shell;
use crate::error::Result;

/// Raw active-connection table from `netstat`
pub fn netstat_text() -> Result<String> {
    #[cfg(windows)]
    let output = shell::run_checked("netstat", &["-ano"])?;

    #[cfg(not(windows))]
    let output = shell::run_checked("netstat", &["-tn"])?;

    Ok(output.stdout)
}

pub fn block_rule_name(ip: &IpAddr, stamp: i64) -> String {
    format!("QDesk_Block_{}_{}", ip, stamp)
}

/// Add an outbound block rule for `ip`
///
/// Only a parsed `IpAddr` is accepted, so nothing user-controlled reaches the
/// netsh argument list unvalidated.
pub fn add_outbound_block(ip: &IpAddr, rule_name: &str) -> Result<()> {
    #[cfg(windows)]
    {
        let name = format!("name={}", rule_name);
        let remote = format!("remoteip={}", ip);
        shell::run_checked(
            "netsh",
            &[
                "advfirewall",
                "firewall",
                "add",
                "rule",
                &name,
                "dir=out",
                "action=block",
                &remote,
            ],
        )?;
        Ok(())
    }

    #[cfg(not(windows))]
    {
        let _ = (ip, rule_name);
        Err(crate::error::QdError::unsupported(
            "firewall rules are managed with netsh on Windows only",
        ))
    }
}

/// Whether every firewall profile reports ON
pub fn firewall_enabled() -> Result<bool> {
    #[cfg(windows)]
    {
        let output = shell::run("netsh", &["advfirewall", "show", "allprofiles", "state"])?;
        Ok(output.stdout.contains("ON"))
    }

    #[cfg(not(windows))]
    {
        Err(crate::error::QdError::unsupported("firewall state is read with netsh"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_name_embeds_ip() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(block_rule_name(&ip, 42), "QDesk_Block_10.1.2.3_42");
    }
}
