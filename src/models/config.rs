use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the configured report directory.
pub const OUTPUT_DIR_ENV: &str = "SECAUDIT_OUTPUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
    pub output: OutputConfig,
    pub sanitize: SanitizeLevel,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from an explicit path, or from `config.toml` / `config.json` in
    /// the working directory. A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for candidate in ["config.toml", "config.json"] {
            let candidate = Path::new(candidate);
            if candidate.exists() {
                return Self::from_file(candidate);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }
}

/// Per-check toggles plus the collector tunables. Disabling a check skips it
/// in both the collector and the alert engine without reordering the
/// remaining rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Lookback window in hours for journal-based authentication checks.
    pub auth_lookback_hours: u64,
    pub connectivity_test_hosts: Vec<String>,
    pub dns_test_domains: Vec<String>,

    // ports
    pub check_listening_ports: bool,
    pub check_connections: bool,
    pub check_suspicious_ports: bool,
    pub check_network_services: bool,

    // authentication
    pub check_failed_logins: bool,
    pub check_successful_logins: bool,
    pub check_sudo_usage: bool,
    pub check_active_sessions: bool,
    pub check_ssh_config: bool,

    // firewall
    pub check_firewall: bool,
    pub check_selinux: bool,

    // vulnerabilities
    pub check_security_updates: bool,
    pub check_all_updates: bool,
    pub check_kernel: bool,
    pub check_automatic_updates: bool,

    // network
    pub check_network_interfaces: bool,
    pub check_connectivity: bool,
    pub check_dns: bool,
    pub check_gateway: bool,
    pub check_internet: bool,
    pub check_bandwidth: bool,
    pub check_network_security: bool,

    // permissions
    pub check_suid_files: bool,
    pub check_sgid_files: bool,
    pub check_world_writable: bool,
    pub check_critical_files: bool,
    pub check_home_permissions: bool,
    pub check_ssh_keys: bool,
    /// Full-filesystem scan; slow, so off unless explicitly enabled.
    pub check_unowned_files: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            auth_lookback_hours: 24,
            connectivity_test_hosts: vec![
                "8.8.8.8".to_string(),
                "1.1.1.1".to_string(),
                "google.com".to_string(),
            ],
            dns_test_domains: vec![
                "google.com".to_string(),
                "github.com".to_string(),
                "fedoraproject.org".to_string(),
            ],
            check_listening_ports: true,
            check_connections: true,
            check_suspicious_ports: true,
            check_network_services: true,
            check_failed_logins: true,
            check_successful_logins: true,
            check_sudo_usage: true,
            check_active_sessions: true,
            check_ssh_config: true,
            check_firewall: true,
            check_selinux: true,
            check_security_updates: true,
            check_all_updates: true,
            check_kernel: true,
            check_automatic_updates: true,
            check_network_interfaces: true,
            check_connectivity: true,
            check_dns: true,
            check_gateway: true,
            check_internet: true,
            check_bandwidth: true,
            check_network_security: true,
            check_suid_files: true,
            check_sgid_files: true,
            check_world_writable: true,
            check_critical_files: true,
            check_home_permissions: true,
            check_ssh_keys: true,
            check_unowned_files: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: Option<PathBuf>,
}

impl OutputConfig {
    /// Report directory precedence: environment > config file > XDG default.
    pub fn resolve_output_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }

        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("secaudit")
            .join("reports")
    }
}

/// How aggressively report data is anonymized before it leaves the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeLevel {
    #[default]
    None,
    Light,
    Moderate,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
