use anyhow::Result;
use tracing::warn;

use super::{status_line, stdout_of};
use crate::models::alert::Severity;
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    FirewallMetrics, FirewallStatus, FirewallSummary, RichRule, SelinuxMode, SelinuxStatus,
    ZoneInfo, ZoneWarning,
};

const FIREWALL_SERVICE: &str = "firewalld";
/// Open ports in a single zone beyond which an advisory is raised.
const ZONE_PORT_LIMIT: usize = 10;

pub async fn collect(config: &MonitoringConfig) -> Result<FirewallMetrics> {
    let mut metrics = FirewallMetrics::default();

    if config.check_firewall {
        let status = firewalld_status().await?;
        let running = status.running;
        metrics.status = Some(status);

        if running {
            metrics.default_zone = default_zone().await;
            metrics.zones = zones().await;
            metrics.security_warnings = zone_warnings(&metrics.zones);
            metrics.rich_rules = rich_rules(&metrics.zones).await;
        }
    }

    if config.check_selinux {
        metrics.selinux = selinux_status().await;
    }

    metrics.summary = FirewallSummary {
        firewall_active: metrics.status.as_ref().map(|s| s.running).unwrap_or(false),
        firewall_enabled: metrics.status.as_ref().map(|s| s.enabled).unwrap_or(false),
        selinux_enforcing: metrics
            .selinux
            .as_ref()
            .map(|s| s.mode == SelinuxMode::Enforcing)
            .unwrap_or(false),
        total_zones: metrics.zones.len() as u32,
        security_warnings: metrics.security_warnings.len() as u32,
    };

    Ok(metrics)
}

async fn firewalld_status() -> Result<FirewallStatus> {
    let running = status_line("systemctl", &["is-active", FIREWALL_SERVICE]).await? == "active";
    let enabled = status_line("systemctl", &["is-enabled", FIREWALL_SERVICE])
        .await
        .map(|s| s == "enabled")
        .unwrap_or(false);

    Ok(FirewallStatus {
        service: FIREWALL_SERVICE.to_string(),
        running,
        enabled,
    })
}

async fn default_zone() -> Option<String> {
    match status_line("firewall-cmd", &["--get-default-zone"]).await {
        Ok(zone) if !zone.is_empty() => Some(zone),
        Ok(_) => None,
        Err(e) => {
            warn!("firewall-cmd unavailable: {e:#}");
            None
        }
    }
}

/// Active zones with their target, services, and opened ports.
async fn zones() -> Vec<ZoneInfo> {
    let output = match stdout_of("firewall-cmd", &["--get-active-zones"]).await {
        Ok(output) => output,
        Err(e) => {
            warn!("cannot list firewall zones: {e:#}");
            return Vec::new();
        }
    };

    let mut zones = Vec::new();
    for name in parse_active_zone_names(&output) {
        let zone_arg = format!("--zone={name}");
        let target = status_line("firewall-cmd", &[&zone_arg, "--get-target"])
            .await
            .unwrap_or_default();
        let services = status_line("firewall-cmd", &[&zone_arg, "--list-services"])
            .await
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let ports = status_line("firewall-cmd", &[&zone_arg, "--list-ports"])
            .await
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        zones.push(ZoneInfo {
            name,
            target,
            services,
            ports,
        });
    }

    zones
}

/// Zone names are the unindented lines; `interfaces:`/`sources:` lines
/// belong to the zone above them.
fn parse_active_zone_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with(|c: char| c.is_whitespace()))
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("interfaces:") && !line.starts_with("sources:")
        })
        .map(str::to_string)
        .collect()
}

fn zone_warnings(zones: &[ZoneInfo]) -> Vec<ZoneWarning> {
    let mut warnings = Vec::new();

    for zone in zones {
        if zone.target.contains("ACCEPT") {
            warnings.push(ZoneWarning {
                zone: zone.name.clone(),
                issue: "Target set to ACCEPT (overly permissive)".to_string(),
                severity: Some(Severity::Warning),
                recommendation: Some(
                    "Configure explicit rules instead of a blanket ACCEPT target".to_string(),
                ),
            });
        }

        if zone.ports.len() > ZONE_PORT_LIMIT {
            warnings.push(ZoneWarning {
                zone: zone.name.clone(),
                issue: format!("Many open ports ({})", zone.ports.len()),
                severity: Some(Severity::Info),
                recommendation: None,
            });
        }
    }

    warnings
}

async fn rich_rules(zones: &[ZoneInfo]) -> Vec<RichRule> {
    let mut rules = Vec::new();

    for zone in zones {
        let zone_arg = format!("--zone={}", zone.name);
        if let Ok(output) = stdout_of("firewall-cmd", &[&zone_arg, "--list-rich-rules"]).await {
            for rule in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
                rules.push(RichRule {
                    zone: zone.name.clone(),
                    rule: rule.to_string(),
                });
            }
        }
    }

    rules
}

async fn selinux_status() -> Option<SelinuxStatus> {
    match status_line("getenforce", &[]).await {
        Ok(mode) => {
            let mode = parse_selinux_mode(&mode);
            Some(SelinuxStatus {
                mode,
                enabled: mode != SelinuxMode::Disabled && mode != SelinuxMode::Unknown,
            })
        }
        Err(e) => {
            warn!("getenforce unavailable: {e:#}");
            None
        }
    }
}

fn parse_selinux_mode(value: &str) -> SelinuxMode {
    match value {
        "Enforcing" => SelinuxMode::Enforcing,
        "Permissive" => SelinuxMode::Permissive,
        "Disabled" => SelinuxMode::Disabled,
        _ => SelinuxMode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_active_zone_names() {
        let output = "\
public
  interfaces: enp3s0 wlp2s0
home
  sources: 192.168.1.0/24
";
        assert_eq!(parse_active_zone_names(output), vec!["public", "home"]);
    }

    #[test]
    fn accept_target_and_port_count_raise_warnings() {
        let zones = vec![
            ZoneInfo {
                name: "public".to_string(),
                target: "ACCEPT".to_string(),
                services: vec!["ssh".to_string()],
                ports: (0..12).map(|i| format!("{}/tcp", 8000 + i)).collect(),
            },
            ZoneInfo {
                name: "home".to_string(),
                target: "default".to_string(),
                services: vec![],
                ports: vec!["22/tcp".to_string()],
            },
        ];

        let warnings = zone_warnings(&zones);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].severity, Some(Severity::Warning));
        assert!(warnings[0].issue.contains("ACCEPT"));
        assert_eq!(warnings[1].severity, Some(Severity::Info));
        assert!(warnings[1].issue.contains("12"));
    }

    #[test]
    fn selinux_mode_parsing() {
        assert_eq!(parse_selinux_mode("Enforcing"), SelinuxMode::Enforcing);
        assert_eq!(parse_selinux_mode("Permissive"), SelinuxMode::Permissive);
        assert_eq!(parse_selinux_mode("Disabled"), SelinuxMode::Disabled);
        assert_eq!(parse_selinux_mode("whatever"), SelinuxMode::Unknown);
    }
}
