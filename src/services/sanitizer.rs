use regex::{NoExpand, Regex};
use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::models::config::SanitizeLevel;
use crate::models::metrics::{CategoryData, UNKNOWN_SOURCE};
use crate::models::report::Report;

const PLACEHOLDER_HOSTNAME: &str = "workstation-001";

/// Anonymizes a report before it leaves the machine. Private addresses are
/// masked octet-by-octet according to the level, usernames become `userN`
/// placeholders, and `/home/<user>/` path segments are rewritten. Public
/// source addresses survive the moderate level on purpose: they are the
/// attacker-facing half of the data and stay useful for follow-up.
pub struct DataSanitizer {
    level: SanitizeLevel,
    ip_map: HashMap<String, String>,
    username_map: HashMap<String, String>,
    hostname_original: Option<String>,
    home_path: Regex,
}

impl DataSanitizer {
    pub fn new(level: SanitizeLevel) -> Self {
        Self {
            level,
            ip_map: HashMap::new(),
            username_map: HashMap::new(),
            hostname_original: None,
            home_path: Regex::new(r"/home/[^/\s]+/").expect("static pattern"),
        }
    }

    pub fn sanitize(mut self, mut report: Report) -> Report {
        if self.level == SanitizeLevel::None {
            return report;
        }

        if matches!(self.level, SanitizeLevel::Moderate | SanitizeLevel::Strict) {
            self.hostname_original = Some(report.hostname.clone());
            report.hostname = PLACEHOLDER_HOSTNAME.to_string();
        }

        self.sanitize_ports(&mut report);
        self.sanitize_authentication(&mut report);
        self.sanitize_network(&mut report);
        self.sanitize_permissions(&mut report);

        // Alert text last, once the address and username maps are complete.
        for alert in &mut report.alerts {
            alert.message = self.scrub_text(&alert.message);
            if let Some(recommendation) = &alert.recommendation {
                alert.recommendation = Some(self.scrub_text(recommendation));
            }
        }

        report
    }

    fn sanitize_ports(&mut self, report: &mut Report) {
        let CategoryData::Collected(ports) = &mut report.metrics.ports else {
            return;
        };

        for port in &mut ports.listening_ports {
            port.local_address = self.anonymize_ip(&port.local_address, true);
        }
        if let Some(connections) = &mut ports.established_connections {
            for item in &mut connections.top_remote_ips {
                item.ip = self.anonymize_ip(&item.ip, false);
            }
        }
    }

    fn sanitize_authentication(&mut self, report: &mut Report) {
        let CategoryData::Collected(auth) = &mut report.metrics.authentication else {
            return;
        };

        for login in &mut auth.failed_logins {
            if let Some(user) = login.user.take() {
                login.user = Some(self.anonymize_username(&user));
            }
            if let Some(ip) = login.source_ip.take() {
                login.source_ip = Some(self.anonymize_ip(&ip, false));
            }
            login.message.clear();
        }
        for login in &mut auth.successful_logins {
            if let Some(user) = login.user.take() {
                login.user = Some(self.anonymize_username(&user));
            }
            if let Some(ip) = login.source_ip.take() {
                login.source_ip = Some(self.anonymize_ip(&ip, false));
            }
        }
        for sudo in &mut auth.sudo_usage {
            sudo.user = self.anonymize_username(&sudo.user);
        }
        for session in &mut auth.active_sessions {
            session.user = self.anonymize_username(&session.user);
            if session.from != "local" && session.from != "-" {
                session.from = self.anonymize_ip(&session.from, false);
            }
        }
        if let Some(analysis) = &mut auth.brute_force_analysis {
            for source in &mut analysis.suspicious_ips {
                let masked = self.anonymize_ip(&source.ip, false);
                source.ip = masked;
                let users: Vec<String> = source
                    .users_attempted
                    .iter()
                    .map(|u| self.anonymize_username(u))
                    .collect();
                source.users_attempted = users;
            }
        }
    }

    fn sanitize_network(&mut self, report: &mut Report) {
        let CategoryData::Collected(network) = &mut report.metrics.network else {
            return;
        };

        for interface in &mut network.interfaces {
            for address in &mut interface.addresses {
                let masked = self.anonymize_ip(&address.address, true);
                address.address = masked;
            }
        }
        if let Some(gateway) = &mut network.gateway {
            if let Some(address) = gateway.gateway.take() {
                gateway.gateway = Some(self.anonymize_ip(&address, true));
            }
        }
        if let Some(dns) = &mut network.dns {
            let servers: Vec<String> = dns
                .servers
                .iter()
                .map(|s| self.anonymize_ip(s, false))
                .collect();
            dns.servers = servers;
        }
    }

    fn sanitize_permissions(&mut self, report: &mut Report) {
        let CategoryData::Collected(permissions) = &mut report.metrics.permissions else {
            return;
        };

        for file in &mut permissions.suid_files {
            file.path = self.sanitize_path(&file.path);
        }
        for file in &mut permissions.sgid_files {
            file.path = self.sanitize_path(&file.path);
        }
        for file in &mut permissions.world_writable_files {
            file.path = self.sanitize_path(&file.path);
        }
        for key in &mut permissions.ssh_key_permissions {
            key.path = self.sanitize_path(&key.path);
        }
    }

    fn anonymize_ip(&mut self, ip: &str, is_local: bool) -> String {
        if ip.is_empty()
            || matches!(ip, UNKNOWN_SOURCE | "-" | "0.0.0.0" | "::" | "localhost" | "127.0.0.1")
        {
            return ip.to_string();
        }

        if let Some(masked) = self.ip_map.get(ip) {
            return masked.clone();
        }

        let is_private = is_private_ipv4(ip);
        let octets: Vec<&str> = ip.split('.').collect();

        let masked = if octets.len() != 4 {
            ip.to_string()
        } else {
            match self.level {
                SanitizeLevel::Light if is_private => {
                    format!("{}.{}.{}.X", octets[0], octets[1], octets[2])
                }
                SanitizeLevel::Moderate if is_private || is_local => {
                    format!("{}.{}.X.X", octets[0], octets[1])
                }
                SanitizeLevel::Strict => {
                    if is_private || is_local {
                        format!("{}.X.X.X", octets[0])
                    } else {
                        // Keep the /16 so the rough region stays readable.
                        format!("{}.{}.XXX.XXX", octets[0], octets[1])
                    }
                }
                _ => ip.to_string(),
            }
        };

        self.ip_map.insert(ip.to_string(), masked.clone());
        masked
    }

    fn anonymize_username(&mut self, username: &str) -> String {
        if username.is_empty() || username == UNKNOWN_SOURCE || username == "root" {
            return username.to_string();
        }

        if !matches!(self.level, SanitizeLevel::Moderate | SanitizeLevel::Strict) {
            return username.to_string();
        }

        if let Some(placeholder) = self.username_map.get(username) {
            return placeholder.clone();
        }

        let placeholder = format!("user{}", self.username_map.len() + 1);
        self.username_map
            .insert(username.to_string(), placeholder.clone());
        placeholder
    }

    fn sanitize_path(&self, path: &str) -> String {
        let mut sanitized = self
            .home_path
            .replace_all(path, NoExpand("/home/$USER/"))
            .into_owned();
        for (real, placeholder) in &self.username_map {
            sanitized = sanitized.replace(real, placeholder);
        }
        sanitized
    }

    fn scrub_text(&self, text: &str) -> String {
        let mut sanitized = text.to_string();

        for (real, masked) in &self.ip_map {
            sanitized = sanitized.replace(real, masked);
        }
        for (real, placeholder) in &self.username_map {
            if let Ok(word) = Regex::new(&format!(r"\b{}\b", regex::escape(real))) {
                sanitized = word
                    .replace_all(&sanitized, NoExpand(placeholder))
                    .into_owned();
            }
        }
        if let Some(hostname) = &self.hostname_original {
            sanitized = sanitized.replace(hostname, PLACEHOLDER_HOSTNAME);
        }

        self.home_path
            .replace_all(&sanitized, NoExpand("/home/$USER/"))
            .into_owned()
    }
}

fn is_private_ipv4(ip: &str) -> bool {
    match ip.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let [a, b, _, _] = addr.octets();
            a == 10 || (a == 192 && b == 168) || (a == 172 && (16..=31).contains(&b))
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::{Alert, Category, Severity};
    use crate::models::metrics::*;
    use crate::models::report::{Grade, ReportSummary, SecurityScore, SecurityStatus};
    use chrono::Utc;

    fn report_with(metrics: MetricsSnapshot, alerts: Vec<Alert>) -> Report {
        let score = SecurityScore {
            score: 100,
            grade: Grade::A,
            deductions: Vec::new(),
            bonus: Vec::new(),
        };
        Report {
            timestamp: Utc::now(),
            timestamp_unix: 0,
            hostname: "devbox".to_string(),
            metrics,
            summary: ReportSummary {
                total_alerts: alerts.len() as u32,
                critical_alerts: 0,
                warning_alerts: 0,
                info_alerts: 0,
                security_status: SecurityStatus::Good,
            },
            alerts,
            security_score: score,
        }
    }

    #[test]
    fn none_level_is_a_passthrough() {
        let report = report_with(MetricsSnapshot::default(), Vec::new());
        let sanitized = DataSanitizer::new(SanitizeLevel::None).sanitize(report.clone());
        assert_eq!(sanitized.hostname, report.hostname);
    }

    #[test]
    fn private_address_masking_by_level() {
        let mut light = DataSanitizer::new(SanitizeLevel::Light);
        assert_eq!(light.anonymize_ip("192.168.1.42", false), "192.168.1.X");
        assert_eq!(light.anonymize_ip("203.0.113.9", false), "203.0.113.9");

        let mut moderate = DataSanitizer::new(SanitizeLevel::Moderate);
        assert_eq!(moderate.anonymize_ip("192.168.1.42", false), "192.168.X.X");
        assert_eq!(moderate.anonymize_ip("10.0.12.7", false), "10.0.X.X");
        assert_eq!(moderate.anonymize_ip("172.20.0.3", false), "172.20.X.X");
        // Public attacker addresses are kept at this level.
        assert_eq!(moderate.anonymize_ip("203.0.113.9", false), "203.0.113.9");

        let mut strict = DataSanitizer::new(SanitizeLevel::Strict);
        assert_eq!(strict.anonymize_ip("192.168.1.42", false), "192.X.X.X");
        assert_eq!(strict.anonymize_ip("203.0.113.9", false), "203.0.XXX.XXX");
    }

    #[test]
    fn loopback_and_sentinels_are_untouched() {
        let mut sanitizer = DataSanitizer::new(SanitizeLevel::Strict);
        for ip in ["127.0.0.1", "0.0.0.0", "::", "unknown", "-", "localhost"] {
            assert_eq!(sanitizer.anonymize_ip(ip, true), ip);
        }
    }

    #[test]
    fn usernames_map_stably_and_root_is_kept() {
        let mut sanitizer = DataSanitizer::new(SanitizeLevel::Moderate);
        assert_eq!(sanitizer.anonymize_username("alice"), "user1");
        assert_eq!(sanitizer.anonymize_username("bob"), "user2");
        assert_eq!(sanitizer.anonymize_username("alice"), "user1");
        assert_eq!(sanitizer.anonymize_username("root"), "root");
        assert_eq!(sanitizer.anonymize_username("unknown"), "unknown");
    }

    #[test]
    fn home_paths_are_rewritten() {
        let sanitizer = DataSanitizer::new(SanitizeLevel::Moderate);
        assert_eq!(
            sanitizer.sanitize_path("/home/alice/.ssh/id_rsa"),
            "/home/$USER/.ssh/id_rsa"
        );
        assert_eq!(sanitizer.sanitize_path("/usr/bin/sudo"), "/usr/bin/sudo");
    }

    #[test]
    fn sanitized_report_scrubs_auth_and_alert_text() {
        let metrics = MetricsSnapshot {
            authentication: CategoryData::Collected(AuthMetrics {
                failed_logins: vec![FailedLogin {
                    timestamp: None,
                    user: Some("alice".to_string()),
                    source_ip: Some("192.168.1.50".to_string()),
                    message: "Failed password for alice from 192.168.1.50".to_string(),
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let alerts = vec![Alert::new(
            Category::Authentication,
            Severity::Warning,
            "Repeated failures from 192.168.1.50 for user alice",
        )];

        let sanitized = DataSanitizer::new(SanitizeLevel::Moderate)
            .sanitize(report_with(metrics, alerts));

        assert_eq!(sanitized.hostname, "workstation-001");
        let auth = sanitized.metrics.authentication.data().unwrap();
        assert_eq!(auth.failed_logins[0].user.as_deref(), Some("user1"));
        assert_eq!(auth.failed_logins[0].source_ip.as_deref(), Some("192.168.X.X"));
        assert!(sanitized.alerts[0].message.contains("192.168.X.X"));
        assert!(sanitized.alerts[0].message.contains("user1"));
        assert!(!sanitized.alerts[0].message.contains("alice"));
    }
}
