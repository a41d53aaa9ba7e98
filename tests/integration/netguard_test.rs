// Connection review from captured netstat tables

use qdesk::core::ops::netguard::{block_targets, classify, parse_netstat};
use std::net::IpAddr;

const NETSTAT_ANO: &str = "
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:3389           0.0.0.0:0              LISTENING       1100
  TCP    10.0.0.5:3389          203.0.113.7:52000      ESTABLISHED     1100
  TCP    10.0.0.5:50110         198.51.100.2:31337     ESTABLISHED     4242
  TCP    10.0.0.5:50111         198.51.100.2:31337     ESTABLISHED     4243
  TCP    10.0.0.5:50112         93.184.216.34:443      ESTABLISHED     5000
  TCP    10.0.0.5:50113         169.254.169.254:80     ESTABLISHED     5001
  TCP    10.0.0.5:50114         198.51.100.9:6667      CLOSE_WAIT      5002
  UDP    0.0.0.0:5353           *:*                                    600
";

#[test]
fn test_only_established_suspicious_rows_are_flagged() {
    let connections = parse_netstat(NETSTAT_ANO);
    assert_eq!(connections.len(), 7);

    let flagged = classify(&connections);
    let pids: Vec<Option<u32>> = flagged.iter().map(|s| s.connection.pid).collect();
    assert_eq!(pids, vec![Some(1100), Some(4242), Some(4243), Some(5001)]);

    assert!(flagged[0].reasons[0].contains("RDP"));
    assert!(flagged[1].reasons[0].contains("Back Orifice"));
    assert!(flagged[3].reasons[0].contains("reserved range"));
}

#[test]
fn test_block_targets_are_distinct_ips() {
    let flagged = classify(&parse_netstat(NETSTAT_ANO));
    let targets = block_targets(&flagged);

    let expected: Vec<IpAddr> = ["169.254.169.254", "198.51.100.2", "203.0.113.7"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(targets, expected);
}
