use anyhow::{Context, Result};
use futures::future::join_all;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use super::stdout_of;
use crate::models::alert::Severity;
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    BandwidthStats, ConnectivityProbe, DnsResolutionTest, DnsStatus, GatewayStatus,
    InterfaceAddress, InterfaceMetrics, InterfaceStats, InternetStatus, NetworkMetrics,
    NetworkSecurityCheck, NetworkSummary,
};

const RESOLV_CONF: &str = "/etc/resolv.conf";
const INTERNET_PROBE_URL: &str = "http://www.google.com/generate_204";

pub async fn collect(config: &MonitoringConfig) -> Result<NetworkMetrics> {
    let mut metrics = NetworkMetrics::default();

    if config.check_network_interfaces {
        metrics.interfaces = interfaces().await?;
    }

    if config.check_connectivity {
        let probes = config
            .connectivity_test_hosts
            .iter()
            .map(|host| ping_host(host.clone()));
        metrics.connectivity = join_all(probes).await;
    }

    if config.check_dns {
        metrics.dns = Some(dns_status(&config.dns_test_domains).await);
    }

    if config.check_gateway {
        metrics.gateway = Some(gateway_status().await);
    }

    if config.check_internet {
        metrics.internet = Some(internet_status().await);
    }

    if config.check_bandwidth {
        metrics.bandwidth = Some(bandwidth_totals(&metrics.interfaces));
    }

    if config.check_network_security {
        metrics.security_checks = security_checks().await;
    }

    metrics.summary = NetworkSummary {
        total_interfaces: metrics.interfaces.len() as u32,
        interfaces_up: metrics.interfaces.iter().filter(|i| i.is_up).count() as u32,
        connectivity_ok: metrics.connectivity.iter().all(|p| p.reachable),
        dns_working: metrics.dns.as_ref().map(|d| d.working).unwrap_or(true),
        gateway_reachable: metrics
            .gateway
            .as_ref()
            .map(|g| g.reachable)
            .unwrap_or(true),
        internet_access: metrics
            .internet
            .as_ref()
            .map(|i| i.has_access)
            .unwrap_or(true),
        network_security_issues: metrics.security_checks.len() as u32,
    };

    Ok(metrics)
}

// `ip -j -s addr` objects, reduced to the fields the audit uses.
#[derive(Deserialize)]
struct IpLink {
    ifname: String,
    #[serde(default)]
    flags: Vec<String>,
    mtu: Option<u32>,
    #[serde(default)]
    addr_info: Vec<IpAddrInfo>,
    stats64: Option<IpLinkStats>,
}

#[derive(Deserialize)]
struct IpAddrInfo {
    family: String,
    local: Option<String>,
    prefixlen: Option<u8>,
}

#[derive(Deserialize)]
struct IpLinkStats {
    rx: IpDirectionStats,
    tx: IpDirectionStats,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IpDirectionStats {
    bytes: u64,
    packets: u64,
    errors: u64,
    dropped: u64,
}

async fn interfaces() -> Result<Vec<InterfaceMetrics>> {
    let output = stdout_of("ip", &["-j", "-s", "addr"]).await?;
    parse_interfaces(&output)
}

fn parse_interfaces(json: &str) -> Result<Vec<InterfaceMetrics>> {
    let links: Vec<IpLink> = serde_json::from_str(json).context("unexpected `ip -j` output")?;

    Ok(links
        .into_iter()
        .map(|link| InterfaceMetrics {
            is_up: link.flags.iter().any(|f| f == "UP"),
            mtu: link.mtu,
            addresses: link
                .addr_info
                .into_iter()
                .filter_map(|addr| {
                    let address = addr.local?;
                    let family = match addr.family.as_str() {
                        "inet" => "IPv4",
                        "inet6" => "IPv6",
                        other => other,
                    };
                    Some(InterfaceAddress {
                        family: family.to_string(),
                        address,
                        prefix_len: addr.prefixlen,
                    })
                })
                .collect(),
            statistics: link.stats64.map(|stats| InterfaceStats {
                bytes_sent: stats.tx.bytes,
                bytes_recv: stats.rx.bytes,
                packets_sent: stats.tx.packets,
                packets_recv: stats.rx.packets,
                errors_in: stats.rx.errors,
                errors_out: stats.tx.errors,
                drops_in: stats.rx.dropped,
                drops_out: stats.tx.dropped,
            }),
            name: link.ifname,
        })
        .collect())
}

/// Three-packet ping probe against one host.
async fn ping_host(host: String) -> ConnectivityProbe {
    let mut probe = ConnectivityProbe {
        host: host.clone(),
        reachable: false,
        latency_ms: None,
        packet_loss: 100,
    };

    match super::run("ping", &["-c", "3", "-W", "2", &host]).await {
        Ok(output) if output.status.success() => {
            probe.reachable = true;
            let stdout = String::from_utf8_lossy(&output.stdout);
            let (latency, loss) = parse_ping_output(&stdout);
            probe.latency_ms = latency;
            probe.packet_loss = loss.unwrap_or(0);
        }
        Ok(_) => {}
        Err(e) => warn!("ping {host} failed to run: {e:#}"),
    }

    probe
}

/// Average latency and packet-loss percentage from ping's summary lines.
fn parse_ping_output(output: &str) -> (Option<f64>, Option<u8>) {
    let avg_re = Regex::new(r"= [\d.]+/([\d.]+)/").expect("static pattern");
    let loss_re = Regex::new(r"(\d+)% packet loss").expect("static pattern");

    let latency = avg_re
        .captures(output)
        .and_then(|caps| caps[1].parse().ok());
    let loss = loss_re
        .captures(output)
        .and_then(|caps| caps[1].parse().ok());

    (latency, loss)
}

async fn dns_status(test_domains: &[String]) -> DnsStatus {
    let mut status = DnsStatus::default();

    match tokio::fs::read_to_string(RESOLV_CONF).await {
        Ok(content) => status.servers = parse_nameservers(&content),
        Err(e) => warn!("cannot read {RESOLV_CONF}: {e}"),
    }

    for domain in test_domains {
        let test = match dns_lookup::lookup_host(domain) {
            Ok(addresses) => DnsResolutionTest {
                domain: domain.clone(),
                resolved: true,
                ip_addresses: addresses.iter().take(3).map(|a| a.to_string()).collect(),
            },
            Err(_) => DnsResolutionTest {
                domain: domain.clone(),
                resolved: false,
                ip_addresses: Vec::new(),
            },
        };
        status.resolution_tests.push(test);
    }

    status.working = status.resolution_tests.iter().any(|t| t.resolved);
    status
}

fn parse_nameservers(resolv_conf: &str) -> Vec<String> {
    resolv_conf
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let server = line.strip_prefix("nameserver")?.trim();
            if server.is_empty() {
                None
            } else {
                Some(server.to_string())
            }
        })
        .collect()
}

async fn gateway_status() -> GatewayStatus {
    let mut status = GatewayStatus::default();

    let route = match stdout_of("ip", &["route", "show", "default"]).await {
        Ok(route) => route,
        Err(e) => {
            warn!("cannot read routing table: {e:#}");
            return status;
        }
    };

    let gateway_re = Regex::new(r"via\s+([\d.]+)").expect("static pattern");
    let Some(gateway) = gateway_re.captures(&route).map(|c| c[1].to_string()) else {
        return status;
    };

    let probe = ping_host(gateway.clone()).await;
    status.gateway = Some(gateway);
    status.reachable = probe.reachable;
    status.latency_ms = probe.latency_ms;
    status
}

/// HTTP reachability probe; any successful response counts as access.
async fn internet_status() -> InternetStatus {
    let has_access = match reqwest::Client::builder()
        .user_agent("secaudit/1.0")
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => match client.get(INTERNET_PROBE_URL).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        },
        Err(e) => {
            warn!("http client unavailable: {e}");
            false
        }
    };

    InternetStatus {
        has_access,
        test_method: "http".to_string(),
    }
}

fn bandwidth_totals(interfaces: &[InterfaceMetrics]) -> BandwidthStats {
    let mut totals = BandwidthStats::default();
    for interface in interfaces {
        if let Some(stats) = &interface.statistics {
            totals.total_bytes_sent += stats.bytes_sent;
            totals.total_bytes_recv += stats.bytes_recv;
        }
    }
    totals
}

async fn security_checks() -> Vec<NetworkSecurityCheck> {
    let ip_forward = read_sysctl("/proc/sys/net/ipv4/ip_forward").await;
    let accept_redirects = read_sysctl("/proc/sys/net/ipv4/conf/all/accept_redirects").await;
    let syncookies = read_sysctl("/proc/sys/net/ipv4/tcp_syncookies").await;
    evaluate_sysctls(ip_forward, accept_redirects, syncookies)
}

async fn read_sysctl(path: &str) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content.trim().to_string()),
        Err(_) => None,
    }
}

/// Kernel network-hardening posture. Only deviations are reported.
fn evaluate_sysctls(
    ip_forward: Option<String>,
    accept_redirects: Option<String>,
    syncookies: Option<String>,
) -> Vec<NetworkSecurityCheck> {
    let mut checks = Vec::new();

    if ip_forward.as_deref() == Some("1") {
        checks.push(NetworkSecurityCheck {
            check: "IP Forwarding".to_string(),
            status: "enabled".to_string(),
            severity: Some(Severity::Warning),
            description: "IP forwarding is enabled. Verify this host is meant to route traffic."
                .to_string(),
            file: "/proc/sys/net/ipv4/ip_forward".to_string(),
        });
    }

    if accept_redirects.as_deref() == Some("1") {
        checks.push(NetworkSecurityCheck {
            check: "ICMP Redirects".to_string(),
            status: "enabled".to_string(),
            severity: Some(Severity::Info),
            description: "The system accepts ICMP redirects. Consider disabling them.".to_string(),
            file: "/proc/sys/net/ipv4/conf/all/accept_redirects".to_string(),
        });
    }

    if syncookies.as_deref() == Some("0") {
        checks.push(NetworkSecurityCheck {
            check: "TCP SYN Cookies".to_string(),
            status: "disabled".to_string(),
            severity: Some(Severity::Warning),
            description: "SYN cookies are disabled; enable them to resist SYN floods.".to_string(),
            file: "/proc/sys/net/ipv4/tcp_syncookies".to_string(),
        });
    }

    checks
}
