use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use super::{status_line, stdout_of};
use crate::models::alert::Severity;
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    ConnectionStats, ListeningPort, NetworkService, PortFinding, PortsMetrics, PortsSummary,
    ProcessInfo, RemoteIpCount,
};

/// Ports commonly probed or abused. A match becomes a finding; binding to
/// every interface escalates it to critical.
const SUSPICIOUS_PORTS: &[(u16, &str)] = &[
    (22, "SSH - common brute-force target"),
    (23, "Telnet - unencrypted protocol"),
    (445, "SMB - frequent attack vector"),
    (1433, "MS SQL Server - should not be publicly exposed"),
    (3306, "MySQL - should not be publicly exposed"),
    (3389, "RDP - frequent attack target"),
    (5432, "PostgreSQL - should not be publicly exposed"),
    (5900, "VNC - should not be publicly exposed"),
    (6379, "Redis - should not be publicly exposed"),
    (27017, "MongoDB - should not be publicly exposed"),
];

/// Services that open network sockets, probed via systemctl.
const NETWORK_SERVICES: &[&str] = &[
    "sshd",
    "httpd",
    "nginx",
    "apache2",
    "mysqld",
    "postgresql",
    "redis",
    "mongod",
    "docker",
    "firewalld",
    "NetworkManager",
    "smb",
    "nmb",
    "vsftpd",
];

pub async fn collect(config: &MonitoringConfig) -> Result<PortsMetrics> {
    let mut metrics = PortsMetrics::default();

    let needs_sockets = config.check_listening_ports || config.check_suspicious_ports;
    let sockets = if needs_sockets {
        listening_ports().await?
    } else {
        Vec::new()
    };

    if config.check_listening_ports {
        metrics.listening_ports = sockets.clone();
    }

    if config.check_connections {
        match established_connections().await {
            Ok(stats) => metrics.established_connections = Some(stats),
            Err(e) => warn!("connection stats unavailable: {e:#}"),
        }
    }

    if config.check_suspicious_ports {
        metrics.suspicious_ports = suspicious_ports(&sockets);
    }

    if config.check_network_services {
        metrics.network_services = network_services().await;
    }

    metrics.summary = PortsSummary {
        total_listening_ports: metrics.listening_ports.len() as u32,
        total_connections: metrics
            .established_connections
            .as_ref()
            .map(|c| c.total)
            .unwrap_or(0),
        suspicious_ports_found: metrics.suspicious_ports.len() as u32,
        active_network_services: metrics.network_services.len() as u32,
    };

    Ok(metrics)
}

/// All listening TCP/UDP sockets via `ss`, sorted by port.
async fn listening_ports() -> Result<Vec<ListeningPort>> {
    let output = stdout_of("ss", &["-H", "-tulnp"]).await?;
    let mut ports = parse_ss_listening(&output);
    ports.sort_by_key(|p| p.port);
    Ok(ports)
}

fn parse_ss_listening(output: &str) -> Vec<ListeningPort> {
    let process_re = Regex::new(r#"users:\(\("([^"]+)",pid=(\d+)"#).expect("static pattern");
    let mut ports = Vec::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // Netid State Recv-Q Send-Q Local:Port Peer:Port [Process]
        if fields.len() < 6 {
            continue;
        }
        if fields[1] != "LISTEN" && fields[1] != "UNCONN" {
            continue;
        }

        let Some((address, port)) = split_address_port(fields[4]) else {
            continue;
        };

        let process = process_re.captures(line).map(|caps| ProcessInfo {
            pid: caps[2].parse().ok(),
            name: caps[1].to_string(),
        });

        ports.push(ListeningPort {
            protocol: fields[0].to_string(),
            local_address: address,
            port,
            process,
        });
    }

    ports
}

/// Split `0.0.0.0:22`, `[::]:80` or `*:8080` into address and port.
fn split_address_port(field: &str) -> Option<(String, u16)> {
    let (address, port) = field.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let address = address.trim_matches(|c| c == '[' || c == ']');
    Some((address.to_string(), port))
}

async fn established_connections() -> Result<ConnectionStats> {
    let output = stdout_of("ss", &["-H", "-tnp", "state", "established"]).await?;
    Ok(parse_ss_established(&output))
}

fn parse_ss_established(output: &str) -> ConnectionStats {
    let process_re = Regex::new(r#"users:\(\("([^"]+)",pid=\d+"#).expect("static pattern");
    let mut total = 0u32;
    let mut by_remote_ip: HashMap<String, u32> = HashMap::new();
    let mut by_process: HashMap<String, u32> = HashMap::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // Recv-Q Send-Q Local:Port Peer:Port [Process] (state filter drops
        // the State column)
        if fields.len() < 4 {
            continue;
        }
        let Some((remote_ip, _)) = split_address_port(fields[3]) else {
            continue;
        };

        total += 1;
        *by_remote_ip.entry(remote_ip).or_default() += 1;
        if let Some(caps) = process_re.captures(line) {
            *by_process.entry(caps[1].to_string()).or_default() += 1;
        }
    }

    let mut sorted: Vec<(String, u32)> = by_remote_ip.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_remote_ips = sorted
        .into_iter()
        .take(10)
        .map(|(ip, connections)| RemoteIpCount { ip, connections })
        .collect();

    ConnectionStats {
        total,
        top_remote_ips,
        by_process,
    }
}

fn suspicious_ports(listening: &[ListeningPort]) -> Vec<PortFinding> {
    let mut findings = Vec::new();

    for &(port, description) in SUSPICIOUS_PORTS {
        let Some(socket) = listening.iter().find(|p| p.port == port) else {
            continue;
        };

        let is_public = matches!(socket.local_address.as_str(), "0.0.0.0" | "::" | "*");
        findings.push(PortFinding {
            port,
            description: description.to_string(),
            listening_on: socket.local_address.clone(),
            is_public,
            severity: Some(if is_public {
                Severity::Critical
            } else {
                Severity::Warning
            }),
        });
    }

    findings
}

async fn network_services() -> Vec<NetworkService> {
    let mut services = Vec::new();

    for &service in NETWORK_SERVICES {
        let Ok(state) = status_line("systemctl", &["is-active", service]).await else {
            break; // systemctl missing entirely
        };
        if state != "active" {
            continue;
        }

        let enabled = status_line("systemctl", &["is-enabled", service])
            .await
            .map(|s| s == "enabled")
            .unwrap_or(false);

        services.push(NetworkService {
            name: service.to_string(),
            status: state,
            enabled,
        });
    }

    services
}

#[cfg(test)]
mod tests {
    use super::*;

    const SS_LISTEN: &str = "\
tcp   LISTEN 0      128          0.0.0.0:22        0.0.0.0:*    users:((\"sshd\",pid=1042,fd=3))
tcp   LISTEN 0      511        127.0.0.1:6379      0.0.0.0:*    users:((\"redis-server\",pid=988,fd=6))
tcp   LISTEN 0      4096            [::]:80           [::]:*    users:((\"nginx\",pid=1311,fd=8))
udp   UNCONN 0      0            0.0.0.0:5353      0.0.0.0:*
garbage line";

    #[test]
    fn parses_ss_listening_output() {
        let ports = parse_ss_listening(SS_LISTEN);
        assert_eq!(ports.len(), 4);
        assert_eq!(ports[0].port, 22);
        assert_eq!(ports[0].local_address, "0.0.0.0");
        assert_eq!(ports[0].process.as_ref().unwrap().name, "sshd");
        assert_eq!(ports[0].process.as_ref().unwrap().pid, Some(1042));
        assert_eq!(ports[2].local_address, "::");
        assert!(ports[3].process.is_none());
    }

    #[test]
    fn suspicious_table_escalates_public_bindings() {
        let listening = parse_ss_listening(SS_LISTEN);
        let findings = suspicious_ports(&listening);
        assert_eq!(findings.len(), 2);

        let ssh = findings.iter().find(|f| f.port == 22).unwrap();
        assert!(ssh.is_public);
        assert_eq!(ssh.severity, Some(Severity::Critical));

        let redis = findings.iter().find(|f| f.port == 6379).unwrap();
        assert!(!redis.is_public);
        assert_eq!(redis.severity, Some(Severity::Warning));
    }

    #[test]
    fn counts_established_connections_per_peer() {
        let output = "\
0 0 192.168.1.5:41234 203.0.113.7:443 users:((\"firefox\",pid=2001,fd=88))
0 0 192.168.1.5:41235 203.0.113.7:443 users:((\"firefox\",pid=2001,fd=89))
0 0 192.168.1.5:55100 198.51.100.8:22 users:((\"ssh\",pid=2100,fd=3))";
        let stats = parse_ss_established(output);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.top_remote_ips[0].ip, "203.0.113.7");
        assert_eq!(stats.top_remote_ips[0].connections, 2);
        assert_eq!(stats.by_process.get("firefox"), Some(&2));
    }
}
