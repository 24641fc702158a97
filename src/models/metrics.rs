use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::alert::Severity;

/// Sentinel used by collectors when a log line carries no usable source
/// address. Records with this source are excluded from brute-force
/// clustering.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Per-category slot of the snapshot. A category that was never collected
/// (`Missing`) and one whose collector failed (`Error`) are treated
/// identically by the alert engine: no information, no alerts, no failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryData<T> {
    Error(CollectError),
    Collected(T),
    Missing,
}

impl<T> Default for CategoryData<T> {
    fn default() -> Self {
        CategoryData::Missing
    }
}

impl<T> CategoryData<T> {
    pub fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(data) => CategoryData::Collected(data),
            Err(e) => CategoryData::Error(CollectError { error: e.to_string() }),
        }
    }

    /// Collected data, or `None` for both the missing and the error case.
    pub fn data(&self) -> Option<&T> {
        match self {
            CategoryData::Collected(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CategoryData::Collected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectError {
    pub error: String,
}

/// The complete point-in-time record of collected security facts. Every
/// evaluation run consumes one immutable snapshot; nothing persists across
/// runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub ports: CategoryData<PortsMetrics>,
    #[serde(default)]
    pub authentication: CategoryData<AuthMetrics>,
    #[serde(default)]
    pub firewall: CategoryData<FirewallMetrics>,
    #[serde(default)]
    pub vulnerabilities: CategoryData<VulnerabilityMetrics>,
    #[serde(default)]
    pub network: CategoryData<NetworkMetrics>,
    #[serde(default)]
    pub permissions: CategoryData<PermissionsMetrics>,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsMetrics {
    pub listening_ports: Vec<ListeningPort>,
    pub established_connections: Option<ConnectionStats>,
    pub suspicious_ports: Vec<PortFinding>,
    pub network_services: Vec<NetworkService>,
    pub summary: PortsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListeningPort {
    pub protocol: String,
    pub local_address: String,
    pub port: u16,
    pub process: Option<ProcessInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessInfo {
    pub pid: Option<u32>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionStats {
    pub total: u32,
    pub top_remote_ips: Vec<RemoteIpCount>,
    pub by_process: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteIpCount {
    pub ip: String,
    pub connections: u32,
}

/// A listening port from the fixed risky-port table. Severity was already
/// decided by the collector (critical when bound to all interfaces) and the
/// alert engine passes it through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortFinding {
    pub port: u16,
    pub description: String,
    pub listening_on: String,
    pub is_public: bool,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkService {
    pub name: String,
    pub status: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsSummary {
    pub total_listening_ports: u32,
    pub total_connections: u32,
    pub suspicious_ports_found: u32,
    pub active_network_services: u32,
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthMetrics {
    pub failed_logins: Vec<FailedLogin>,
    pub successful_logins: Vec<SuccessfulLogin>,
    pub sudo_usage: Vec<SudoInvocation>,
    pub active_sessions: Vec<ActiveSession>,
    pub brute_force_analysis: Option<BruteForceAnalysis>,
    pub ssh_config: Option<SshConfigAudit>,
    pub summary: AuthSummary,
}

/// One failed authentication attempt parsed out of the journal. The
/// timestamp is kept as the raw journal prefix; the engine never interprets
/// it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailedLogin {
    pub timestamp: Option<String>,
    pub user: Option<String>,
    pub source_ip: Option<String>,
    pub message: String,
}

impl FailedLogin {
    /// Source address usable for clustering, if any. Absent addresses and
    /// the "unknown" sentinel both disqualify the record.
    pub fn clusterable_source(&self) -> Option<&str> {
        match self.source_ip.as_deref() {
            Some(ip) if !ip.is_empty() && ip != UNKNOWN_SOURCE => Some(ip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessfulLogin {
    pub timestamp: Option<String>,
    pub auth_method: String,
    pub user: Option<String>,
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SudoInvocation {
    pub timestamp: Option<String>,
    pub user: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSession {
    pub user: String,
    pub tty: String,
    pub from: String,
    pub login_time: String,
}

/// Result of clustering failed logins by source address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteForceAnalysis {
    pub total_unique_ips: u32,
    pub suspicious_ips: Vec<SuspiciousSource>,
    pub brute_force_detected: bool,
}

/// A source address whose failed-attempt count crossed the clustering
/// threshold. Exists only for counts >= 5; critical above 20 attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspiciousSource {
    pub ip: String,
    pub attempts: u64,
    pub users_attempted: Vec<String>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfigAudit {
    pub config_file: String,
    pub checks: Vec<SshConfigCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfigCheck {
    pub setting: String,
    pub current: String,
    pub recommended: String,
    pub is_secure: bool,
    /// `None` when the setting is already hardened.
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSummary {
    pub failed_login_attempts: u32,
    pub successful_logins: u32,
    pub brute_force_detected: bool,
    pub suspicious_ips_count: u32,
    pub active_sessions: u32,
}

// ---------------------------------------------------------------------------
// Firewall / SELinux
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallMetrics {
    pub status: Option<FirewallStatus>,
    pub default_zone: Option<String>,
    pub zones: Vec<ZoneInfo>,
    pub security_warnings: Vec<ZoneWarning>,
    pub rich_rules: Vec<RichRule>,
    pub selinux: Option<SelinuxStatus>,
    pub summary: FirewallSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallStatus {
    pub service: String,
    pub running: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneInfo {
    pub name: String,
    pub target: String,
    pub services: Vec<String>,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneWarning {
    pub zone: String,
    pub issue: String,
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichRule {
    pub zone: String,
    pub rule: String,
}

/// SELinux operating mode as reported by `getenforce`. Closed enumeration;
/// the permissive and disabled rules are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelinuxMode {
    Enforcing,
    Permissive,
    Disabled,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelinuxStatus {
    pub mode: SelinuxMode,
    pub enabled: bool,
}

/// Booleans default to "not active": with no information the firewall rules
/// would fire, which is why the engine only consults this summary when the
/// category was actually collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallSummary {
    pub firewall_active: bool,
    pub firewall_enabled: bool,
    pub selinux_enforcing: bool,
    pub total_zones: u32,
    pub security_warnings: u32,
}

// ---------------------------------------------------------------------------
// Vulnerabilities / updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityMetrics {
    pub security_updates: Option<SecurityUpdates>,
    pub all_updates: Option<UpdatesOverview>,
    pub kernel: Option<KernelStatus>,
    pub automatic_updates: Option<AutoUpdateStatus>,
    pub summary: VulnerabilitySummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityUpdates {
    pub available: Vec<SecurityAdvisory>,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityAdvisory {
    pub advisory: String,
    pub severity: String,
    pub package: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesOverview {
    pub total_packages: u32,
    pub packages: Vec<PackageUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageUpdate {
    pub name: String,
    pub version: String,
    pub repo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelStatus {
    pub running: String,
    pub latest_installed: String,
    pub reboot_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoUpdateStatus {
    pub service: String,
    pub active: bool,
    pub enabled: bool,
    pub configured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilitySummary {
    pub security_updates_available: u32,
    pub total_updates_available: u32,
    pub reboot_required: bool,
    pub automatic_updates_enabled: bool,
    pub has_critical_vulnerabilities: bool,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkMetrics {
    pub interfaces: Vec<InterfaceMetrics>,
    pub connectivity: Vec<ConnectivityProbe>,
    pub dns: Option<DnsStatus>,
    pub gateway: Option<GatewayStatus>,
    pub internet: Option<InternetStatus>,
    pub bandwidth: Option<BandwidthStats>,
    pub security_checks: Vec<NetworkSecurityCheck>,
    pub summary: NetworkSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceMetrics {
    pub name: String,
    pub is_up: bool,
    pub mtu: Option<u32>,
    pub addresses: Vec<InterfaceAddress>,
    pub statistics: Option<InterfaceStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceAddress {
    pub family: String,
    pub address: String,
    pub prefix_len: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceStats {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub drops_in: u64,
    pub drops_out: u64,
}

impl InterfaceStats {
    pub fn total_errors(&self) -> u64 {
        self.errors_in + self.errors_out
    }

    pub fn total_drops(&self) -> u64 {
        self.drops_in + self.drops_out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityProbe {
    pub host: String,
    pub reachable: bool,
    pub latency_ms: Option<f64>,
    pub packet_loss: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsStatus {
    pub working: bool,
    pub servers: Vec<String>,
    pub resolution_tests: Vec<DnsResolutionTest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsResolutionTest {
    pub domain: String,
    pub resolved: bool,
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayStatus {
    pub gateway: Option<String>,
    pub reachable: bool,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternetStatus {
    pub has_access: bool,
    pub test_method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandwidthStats {
    pub total_bytes_sent: u64,
    pub total_bytes_recv: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSecurityCheck {
    pub check: String,
    pub status: String,
    pub severity: Option<Severity>,
    pub description: String,
    pub file: String,
}

/// Reachability booleans default to true: with no information, the
/// connectivity rules stay quiet instead of reporting a dead network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSummary {
    pub total_interfaces: u32,
    pub interfaces_up: u32,
    pub connectivity_ok: bool,
    pub dns_working: bool,
    pub gateway_reachable: bool,
    pub internet_access: bool,
    pub network_security_issues: u32,
}

impl Default for NetworkSummary {
    fn default() -> Self {
        Self {
            total_interfaces: 0,
            interfaces_up: 0,
            connectivity_ok: true,
            dns_working: true,
            gateway_reachable: true,
            internet_access: true,
            network_security_issues: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsMetrics {
    pub suid_files: Vec<SpecialFile>,
    pub sgid_files: Vec<SpecialFile>,
    pub world_writable_files: Vec<WorldWritableFile>,
    pub critical_file_permissions: Vec<FilePermissionCheck>,
    pub home_directory_issues: Vec<HomeDirIssue>,
    pub ssh_key_permissions: Vec<SshKeyPermission>,
    pub unowned_files: Vec<String>,
    pub summary: PermissionsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialFile {
    pub path: String,
    pub permissions: String,
    pub owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldWritableFile {
    pub path: String,
    pub permissions: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePermissionCheck {
    pub file: String,
    pub description: String,
    pub current_permissions: String,
    pub expected_permissions: String,
    pub is_secure: bool,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeDirIssue {
    pub user: String,
    pub home_dir: String,
    pub permissions: String,
    pub recommended: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKeyPermission {
    pub path: String,
    pub kind: String,
    pub current_permissions: String,
    pub expected_permissions: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsSummary {
    pub suid_files_found: u32,
    pub world_writable_found: u32,
    pub critical_permission_issues: u32,
    pub ssh_key_issues: u32,
    pub has_critical_issues: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_error_deserializes_as_error_variant() {
        let slot: CategoryData<PortsMetrics> =
            serde_json::from_str(r#"{"error": "permission denied"}"#).unwrap();
        assert!(matches!(slot, CategoryData::Error(_)));
        assert!(slot.data().is_none());
    }

    #[test]
    fn absent_category_defaults_to_missing() {
        let snapshot: MetricsSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot.ports, CategoryData::Missing);
        assert!(!snapshot.ports.is_available());
    }

    #[test]
    fn collected_category_roundtrips() {
        let snapshot = MetricsSnapshot {
            firewall: CategoryData::Collected(FirewallMetrics {
                summary: FirewallSummary {
                    firewall_active: true,
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert!(back.firewall.data().unwrap().summary.firewall_active);
    }

    #[test]
    fn unknown_source_is_not_clusterable() {
        let record = FailedLogin {
            source_ip: Some(UNKNOWN_SOURCE.to_string()),
            ..Default::default()
        };
        assert!(record.clusterable_source().is_none());

        let record = FailedLogin::default();
        assert!(record.clusterable_source().is_none());

        let record = FailedLogin {
            source_ip: Some("203.0.113.9".to_string()),
            ..Default::default()
        };
        assert_eq!(record.clusterable_source(), Some("203.0.113.9"));
    }

    #[test]
    fn network_summary_defaults_assume_reachable() {
        let summary = NetworkSummary::default();
        assert!(summary.connectivity_ok);
        assert!(summary.dns_working);
        assert!(summary.gateway_reachable);
        assert!(summary.internet_access);
    }
}
