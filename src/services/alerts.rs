use serde_json::json;

use crate::models::alert::{Alert, Category, Severity};
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    AuthMetrics, FirewallMetrics, MetricsSnapshot, NetworkMetrics, PermissionsMetrics,
    PortsMetrics, SelinuxMode, VulnerabilityMetrics,
};

/// Maximum suspicious sources that turn into individual alerts.
const BRUTE_FORCE_ALERT_LIMIT: usize = 5;
/// Listening-port count above which the volume advisory fires.
const LISTENING_PORTS_ADVISORY: u32 = 20;
/// Failed-login count above which the volume advisory fires.
const FAILED_LOGIN_ADVISORY: u32 = 50;
/// Security-update count above which the alert escalates to critical.
const SECURITY_UPDATES_CRITICAL: u32 = 10;
/// Pending-update count above which the staleness advisory fires.
const TOTAL_UPDATES_ADVISORY: u32 = 50;
/// Combined in/out interface error count above which a warning fires.
const INTERFACE_ERROR_LIMIT: u64 = 100;
/// Combined in/out interface drop count above which an advisory fires.
const INTERFACE_DROP_LIMIT: u64 = 100;
/// SUID file count above which the inventory advisory fires.
const SUID_FILES_ADVISORY: u32 = 100;

/// Evaluates the fixed per-category rule battery against a snapshot.
///
/// Categories run in a fixed order (ports, authentication, firewall,
/// vulnerabilities, network, permissions) and rules within a category fire
/// in a fixed order, so the same snapshot always yields the same alert
/// sequence. A missing or failed category contributes nothing; the engine
/// never fails on partial snapshots.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    config: MonitoringConfig,
}

impl AlertEngine {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(ports) = snapshot.ports.data() {
            alerts.extend(self.ports_alerts(ports));
        }
        if let Some(auth) = snapshot.authentication.data() {
            alerts.extend(self.auth_alerts(auth));
        }
        if let Some(firewall) = snapshot.firewall.data() {
            alerts.extend(self.firewall_alerts(firewall));
        }
        if let Some(vulnerabilities) = snapshot.vulnerabilities.data() {
            alerts.extend(self.vulnerability_alerts(vulnerabilities));
        }
        if let Some(network) = snapshot.network.data() {
            alerts.extend(self.network_alerts(network));
        }
        if let Some(permissions) = snapshot.permissions.data() {
            alerts.extend(self.permissions_alerts(permissions));
        }

        alerts
    }

    fn ports_alerts(&self, ports: &PortsMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if self.config.check_suspicious_ports {
            for finding in &ports.suspicious_ports {
                match finding.severity {
                    Some(Severity::Critical) => alerts.push(
                        Alert::new(
                            Category::Ports,
                            Severity::Critical,
                            format!(
                                "Port {} publicly exposed: {}",
                                finding.port, finding.description
                            ),
                        )
                        .with_details(json!(finding)),
                    ),
                    Some(Severity::Warning) => alerts.push(
                        Alert::new(
                            Category::Ports,
                            Severity::Warning,
                            format!(
                                "Suspicious port open: {} - {}",
                                finding.port, finding.description
                            ),
                        )
                        .with_details(json!(finding)),
                    ),
                    _ => {}
                }
            }
        }

        if self.config.check_listening_ports {
            let count = ports.summary.total_listening_ports;
            if count > LISTENING_PORTS_ADVISORY {
                alerts.push(
                    Alert::new(
                        Category::Ports,
                        Severity::Info,
                        format!("Many listening ports ({count}). Review whether each one is needed."),
                    )
                    .with_details(json!({ "count": count })),
                );
            }
        }

        alerts
    }

    fn auth_alerts(&self, auth: &AuthMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if self.config.check_failed_logins {
            if let Some(analysis) = &auth.brute_force_analysis {
                if analysis.brute_force_detected {
                    for source in analysis.suspicious_ips.iter().take(BRUTE_FORCE_ALERT_LIMIT) {
                        if source.severity == Some(Severity::Critical) {
                            alerts.push(
                                Alert::new(
                                    Category::Authentication,
                                    Severity::Critical,
                                    format!(
                                        "Brute-force attack detected from {} ({} attempts)",
                                        source.ip, source.attempts
                                    ),
                                )
                                .with_details(json!(source))
                                .with_recommendation("Consider blocking this IP in the firewall"),
                            );
                        }
                    }
                }
            }
        }

        if self.config.check_ssh_config {
            if let Some(ssh) = &auth.ssh_config {
                for check in &ssh.checks {
                    if check.severity == Some(Severity::Warning) && !check.is_secure {
                        alerts.push(
                            Alert::new(
                                Category::Authentication,
                                Severity::Warning,
                                format!("Insecure SSH configuration: {}", check.setting),
                            )
                            .with_details(json!({
                                "current": check.current,
                                "recommended": check.recommended,
                            }))
                            .with_recommendation(format!("Change to: {}", check.recommended)),
                        );
                    }
                }
            }
        }

        if self.config.check_failed_logins {
            let failed = auth.summary.failed_login_attempts;
            if failed > FAILED_LOGIN_ADVISORY {
                alerts.push(
                    Alert::new(
                        Category::Authentication,
                        Severity::Warning,
                        format!(
                            "High number of failed login attempts ({failed} in the last {}h)",
                            self.config.auth_lookback_hours
                        ),
                    )
                    .with_details(json!({ "count": failed })),
                );
            }
        }

        alerts
    }

    fn firewall_alerts(&self, firewall: &FirewallMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if self.config.check_firewall {
            if !firewall.summary.firewall_active {
                alerts.push(
                    Alert::new(Category::Firewall, Severity::Critical, "Firewall is not active!")
                        .with_recommendation("Start firewalld: sudo systemctl start firewalld"),
                );
            } else if !firewall.summary.firewall_enabled {
                alerts.push(
                    Alert::new(
                        Category::Firewall,
                        Severity::Warning,
                        "Firewall is running but not enabled at boot",
                    )
                    .with_recommendation("Enable it: sudo systemctl enable firewalld"),
                );
            }
        }

        if self.config.check_selinux && !firewall.summary.selinux_enforcing {
            let mode = firewall
                .selinux
                .as_ref()
                .map(|s| s.mode)
                .unwrap_or(SelinuxMode::Unknown);
            match mode {
                SelinuxMode::Permissive => alerts.push(
                    Alert::new(
                        Category::Firewall,
                        Severity::Warning,
                        "SELinux is in permissive mode (policies are not being enforced)",
                    )
                    .with_recommendation("Consider switching to enforcing mode"),
                ),
                SelinuxMode::Disabled => alerts.push(
                    Alert::new(Category::Firewall, Severity::Critical, "SELinux is disabled!")
                        .with_recommendation("Enable SELinux to harden the system"),
                ),
                SelinuxMode::Enforcing | SelinuxMode::Unknown => {}
            }
        }

        if self.config.check_firewall {
            for warning in &firewall.security_warnings {
                alerts.push(
                    Alert::new(
                        Category::Firewall,
                        warning.severity.unwrap_or(Severity::Info),
                        format!("Firewall - {}: {}", warning.zone, warning.issue),
                    )
                    .with_details(json!(warning)),
                );
            }
        }

        alerts
    }

    fn vulnerability_alerts(&self, vulnerabilities: &VulnerabilityMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let summary = &vulnerabilities.summary;

        if self.config.check_security_updates {
            let count = summary.security_updates_available;
            if count > 0 {
                let severity = if count > SECURITY_UPDATES_CRITICAL {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                alerts.push(
                    Alert::new(
                        Category::Vulnerabilities,
                        severity,
                        format!("{count} security update(s) available"),
                    )
                    .with_details(json!({ "count": count }))
                    .with_recommendation("Run: sudo dnf update --security"),
                );
            }
        }

        if self.config.check_kernel && summary.reboot_required {
            alerts.push(
                Alert::new(
                    Category::Vulnerabilities,
                    Severity::Warning,
                    "Reboot required (kernel updated)",
                )
                .with_recommendation("Reboot the system to apply the kernel update"),
            );
        }

        if self.config.check_automatic_updates && !summary.automatic_updates_enabled {
            alerts.push(
                Alert::new(
                    Category::Vulnerabilities,
                    Severity::Info,
                    "Automatic updates are not configured",
                )
                .with_recommendation(
                    "Consider enabling dnf-automatic for unattended security updates",
                ),
            );
        }

        if self.config.check_all_updates && summary.total_updates_available > TOTAL_UPDATES_ADVISORY
        {
            alerts.push(
                Alert::new(
                    Category::Vulnerabilities,
                    Severity::Info,
                    format!(
                        "System out of date: {} packages have updates available",
                        summary.total_updates_available
                    ),
                )
                .with_recommendation("Run: sudo dnf update"),
            );
        }

        alerts
    }

    fn network_alerts(&self, network: &NetworkMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let summary = &network.summary;

        if self.config.check_connectivity && !summary.connectivity_ok {
            alerts.push(
                Alert::new(
                    Category::Network,
                    Severity::Critical,
                    "Network connectivity problems detected",
                )
                .with_details(json!(network.connectivity)),
            );
        }

        if self.config.check_dns && !summary.dns_working {
            alerts.push(
                Alert::new(
                    Category::Network,
                    Severity::Critical,
                    "DNS resolution is not working",
                )
                .with_recommendation("Check /etc/resolv.conf and connectivity to the DNS servers"),
            );
        }

        if self.config.check_gateway && !summary.gateway_reachable {
            alerts.push(
                Alert::new(
                    Category::Network,
                    Severity::Critical,
                    "Default gateway is not reachable",
                )
                .with_details(json!(network.gateway)),
            );
        }

        if self.config.check_internet && !summary.internet_access {
            alerts.push(
                Alert::new(Category::Network, Severity::Warning, "No internet access")
                    .with_recommendation("Check network connectivity and gateway settings"),
            );
        }

        if self.config.check_network_security {
            for issue in &network.security_checks {
                if issue.severity == Some(Severity::Warning) {
                    alerts.push(
                        Alert::new(
                            Category::Network,
                            Severity::Warning,
                            format!("Insecure network configuration: {}", issue.check),
                        )
                        .with_details(json!(issue)),
                    );
                }
            }
        }

        if self.config.check_network_interfaces {
            for interface in &network.interfaces {
                let Some(stats) = &interface.statistics else {
                    continue;
                };

                let errors = stats.total_errors();
                if errors > INTERFACE_ERROR_LIMIT {
                    alerts.push(
                        Alert::new(
                            Category::Network,
                            Severity::Warning,
                            format!(
                                "Interface {} has a high error count ({errors})",
                                interface.name
                            ),
                        )
                        .with_details(json!(stats)),
                    );
                }

                let drops = stats.total_drops();
                if drops > INTERFACE_DROP_LIMIT {
                    alerts.push(
                        Alert::new(
                            Category::Network,
                            Severity::Info,
                            format!("Interface {} is dropping packets ({drops})", interface.name),
                        )
                        .with_details(json!(stats)),
                    );
                }
            }
        }

        alerts
    }

    fn permissions_alerts(&self, permissions: &PermissionsMetrics) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let summary = &permissions.summary;

        if self.config.check_critical_files && summary.has_critical_issues {
            alerts.push(
                Alert::new(
                    Category::Permissions,
                    Severity::Critical,
                    format!(
                        "{} critical file permission issue(s) found",
                        summary.critical_permission_issues
                    ),
                )
                .with_details(json!(permissions.critical_file_permissions))
                .with_recommendation("Review the permissions of critical system files"),
            );
        }

        if self.config.check_world_writable && summary.world_writable_found > 0 {
            let sample: Vec<_> = permissions.world_writable_files.iter().take(5).collect();
            alerts.push(
                Alert::new(
                    Category::Permissions,
                    Severity::Warning,
                    format!(
                        "{} world-writable file(s) found in critical directories",
                        summary.world_writable_found
                    ),
                )
                .with_details(json!(sample))
                .with_recommendation("Review and fix the permissions of these files"),
            );
        }

        if self.config.check_ssh_keys && summary.ssh_key_issues > 0 {
            for issue in &permissions.ssh_key_permissions {
                if issue.severity == Some(Severity::Critical) {
                    alerts.push(
                        Alert::new(
                            Category::Permissions,
                            Severity::Critical,
                            format!("SSH key with unsafe permissions: {}", issue.path),
                        )
                        .with_details(json!(issue))
                        .with_recommendation(format!(
                            "Run: chmod {} {}",
                            issue.expected_permissions, issue.path
                        )),
                    );
                }
            }
        }

        if self.config.check_suid_files && summary.suid_files_found > SUID_FILES_ADVISORY {
            alerts.push(
                Alert::new(
                    Category::Permissions,
                    Severity::Info,
                    format!("Large number of SUID files ({})", summary.suid_files_found),
                )
                .with_recommendation("Review SUID binaries and strip unneeded bits"),
            );
        }

        alerts
    }
}
