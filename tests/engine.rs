//! End-to-end tests for the analysis pipeline: snapshot -> brute-force
//! detection -> alert rules -> score -> report assembly.
//!
//! Each scenario builds a fully-typed snapshot by hand (no collection
//! involved) and checks the resulting alert list, score, grade, and overall
//! status against the documented policy.

use secaudit::models::alert::{Category, Severity};
use secaudit::models::config::MonitoringConfig;
use secaudit::models::metrics::*;
use secaudit::models::report::{Grade, SecurityStatus};
use secaudit::services::alerts::AlertEngine;
use secaudit::services::brute_force::BruteForceDetector;
use secaudit::services::report;
use secaudit::services::score::ScoreCalculator;

// ---------------------------------------------------------------------------
// Snapshot builders
// ---------------------------------------------------------------------------

fn healthy_ports() -> PortsMetrics {
    PortsMetrics {
        listening_ports: vec![ListeningPort {
            protocol: "tcp".to_string(),
            local_address: "127.0.0.1".to_string(),
            port: 631,
            process: None,
        }],
        suspicious_ports: Vec::new(),
        summary: PortsSummary {
            total_listening_ports: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn healthy_auth() -> AuthMetrics {
    AuthMetrics {
        brute_force_analysis: Some(BruteForceAnalysis::default()),
        summary: AuthSummary::default(),
        ..Default::default()
    }
}

fn healthy_firewall() -> FirewallMetrics {
    FirewallMetrics {
        status: Some(FirewallStatus {
            service: "firewalld".to_string(),
            running: true,
            enabled: true,
        }),
        selinux: Some(SelinuxStatus {
            mode: SelinuxMode::Enforcing,
            enabled: true,
        }),
        summary: FirewallSummary {
            firewall_active: true,
            firewall_enabled: true,
            selinux_enforcing: true,
            total_zones: 1,
            security_warnings: 0,
        },
        ..Default::default()
    }
}

fn healthy_vulnerabilities() -> VulnerabilityMetrics {
    VulnerabilityMetrics {
        automatic_updates: Some(AutoUpdateStatus {
            service: "dnf-automatic.timer".to_string(),
            active: true,
            enabled: true,
            configured: true,
        }),
        summary: VulnerabilitySummary {
            security_updates_available: 0,
            total_updates_available: 4,
            reboot_required: false,
            automatic_updates_enabled: true,
            has_critical_vulnerabilities: false,
        },
        ..Default::default()
    }
}

fn healthy_network() -> NetworkMetrics {
    NetworkMetrics {
        connectivity: vec![ConnectivityProbe {
            host: "8.8.8.8".to_string(),
            reachable: true,
            latency_ms: Some(12.0),
            packet_loss: 0,
        }],
        summary: NetworkSummary {
            total_interfaces: 2,
            interfaces_up: 2,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn healthy_permissions() -> PermissionsMetrics {
    PermissionsMetrics::default()
}

/// Every category collected, nothing wrong anywhere.
fn clean_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        ports: CategoryData::Collected(healthy_ports()),
        authentication: CategoryData::Collected(healthy_auth()),
        firewall: CategoryData::Collected(healthy_firewall()),
        vulnerabilities: CategoryData::Collected(healthy_vulnerabilities()),
        network: CategoryData::Collected(healthy_network()),
        permissions: CategoryData::Collected(healthy_permissions()),
    }
}

fn engine() -> AlertEngine {
    AlertEngine::new(&MonitoringConfig::default())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn clean_system_scores_a_perfect_hundred() {
    let snapshot = clean_snapshot();
    let alerts = engine().evaluate(&snapshot);
    assert!(alerts.is_empty(), "unexpected alerts: {alerts:?}");

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert_eq!(score.score, 100);
    assert_eq!(score.grade, Grade::A);
    assert!(score.deductions.is_empty());
    assert_eq!(score.bonus.len(), 3);

    let report = report::assemble(snapshot, alerts, score);
    assert_eq!(report.summary.security_status, SecurityStatus::Good);
    assert_eq!(report.summary.total_alerts, 0);
}

#[test]
fn brute_force_from_one_address_costs_ten_points() {
    // 25 failures from one address, each against a different account.
    let failed_logins: Vec<FailedLogin> = (0..25)
        .map(|i| FailedLogin {
            timestamp: None,
            user: Some(format!("user{i}")),
            source_ip: Some("203.0.113.9".to_string()),
            message: String::new(),
        })
        .collect();

    let analysis = BruteForceDetector::new().detect(&failed_logins);
    assert_eq!(analysis.total_unique_ips, 1);
    assert_eq!(analysis.suspicious_ips.len(), 1);
    assert_eq!(analysis.suspicious_ips[0].attempts, 25);
    assert_eq!(analysis.suspicious_ips[0].severity, Some(Severity::Critical));
    assert!(analysis.brute_force_detected);

    let mut auth = healthy_auth();
    auth.summary.failed_login_attempts = failed_logins.len() as u32;
    auth.summary.brute_force_detected = true;
    auth.summary.suspicious_ips_count = 1;
    auth.failed_logins = failed_logins;
    auth.brute_force_analysis = Some(analysis);

    let mut snapshot = clean_snapshot();
    snapshot.authentication = CategoryData::Collected(auth);

    let alerts = engine().evaluate(&snapshot);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, Category::Authentication);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert!(alerts[0].message.contains("203.0.113.9"));
    assert!(alerts[0].message.contains("25"));

    // One critical deduction: 100 - 10 = 90, which is still an A.
    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert_eq!(score.score, 90);
    assert_eq!(score.grade, Grade::A);

    let report = report::assemble(snapshot, alerts, score);
    assert_eq!(report.summary.security_status, SecurityStatus::Critical);
}

#[test]
fn dead_firewall_and_disabled_selinux_grade_b() {
    let mut firewall = healthy_firewall();
    firewall.status = Some(FirewallStatus {
        service: "firewalld".to_string(),
        running: false,
        enabled: false,
    });
    firewall.selinux = Some(SelinuxStatus {
        mode: SelinuxMode::Disabled,
        enabled: false,
    });
    firewall.summary = FirewallSummary {
        firewall_active: false,
        firewall_enabled: false,
        selinux_enforcing: false,
        total_zones: 0,
        security_warnings: 0,
    };

    let mut snapshot = clean_snapshot();
    snapshot.firewall = CategoryData::Collected(firewall);

    let alerts = engine().evaluate(&snapshot);
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
    assert!(alerts.iter().all(|a| a.category == Category::Firewall));

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert_eq!(score.score, 80);
    assert_eq!(score.grade, Grade::B);
}

#[test]
fn twelve_security_updates_are_critical_but_still_grade_a() {
    let mut vulnerabilities = healthy_vulnerabilities();
    vulnerabilities.summary.security_updates_available = 12;
    vulnerabilities.summary.has_critical_vulnerabilities = true;

    let mut snapshot = clean_snapshot();
    snapshot.vulnerabilities = CategoryData::Collected(vulnerabilities);

    let alerts = engine().evaluate(&snapshot);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, Category::Vulnerabilities);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert!(alerts[0].message.contains("12"));

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert_eq!(score.score, 90);
    assert_eq!(score.grade, Grade::A);
    // The pending updates also cost the update bonus.
    assert!(!score.bonus.iter().any(|b| b.contains("security updates")));
}

#[test]
fn missing_category_degrades_to_the_clean_result() {
    let mut snapshot = clean_snapshot();
    snapshot.ports = CategoryData::Missing;

    let alerts = engine().evaluate(&snapshot);
    assert!(alerts.is_empty());

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert_eq!(score.score, 100);
    assert_eq!(score.grade, Grade::A);
}

#[test]
fn errored_category_behaves_like_a_missing_one() {
    let mut snapshot = clean_snapshot();
    snapshot.ports = CategoryData::Error(CollectError {
        error: "ss: command not found".to_string(),
    });

    assert!(engine().evaluate(&snapshot).is_empty());
}

// ---------------------------------------------------------------------------
// Cross-cutting properties
// ---------------------------------------------------------------------------

#[test]
fn alert_order_is_category_major() {
    let mut snapshot = clean_snapshot();

    // Force one alert in each category.
    snapshot.ports = CategoryData::Collected(PortsMetrics {
        summary: PortsSummary {
            total_listening_ports: 30,
            ..Default::default()
        },
        ..Default::default()
    });
    let mut auth = healthy_auth();
    auth.summary.failed_login_attempts = 60;
    snapshot.authentication = CategoryData::Collected(auth);
    let mut firewall = healthy_firewall();
    firewall.summary.firewall_active = false;
    snapshot.firewall = CategoryData::Collected(firewall);
    let mut vulnerabilities = healthy_vulnerabilities();
    vulnerabilities.summary.reboot_required = true;
    snapshot.vulnerabilities = CategoryData::Collected(vulnerabilities);
    let mut network = healthy_network();
    network.summary.internet_access = false;
    snapshot.network = CategoryData::Collected(network);
    let mut permissions = healthy_permissions();
    permissions.summary.world_writable_found = 2;
    snapshot.permissions = CategoryData::Collected(permissions);

    let alerts = engine().evaluate(&snapshot);
    let categories: Vec<Category> = alerts.iter().map(|a| a.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::Ports,
            Category::Authentication,
            Category::Firewall,
            Category::Vulnerabilities,
            Category::Network,
            Category::Permissions,
        ]
    );
}

#[test]
fn evaluation_is_deterministic_and_order_stable() {
    let mut snapshot = clean_snapshot();
    let mut network = healthy_network();
    network.summary.dns_working = false;
    network.summary.internet_access = false;
    snapshot.network = CategoryData::Collected(network);

    let engine = engine();
    let first = serde_json::to_string(&engine.evaluate(&snapshot)).unwrap();
    let second = serde_json::to_string(&engine.evaluate(&snapshot)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn score_always_stays_in_range() {
    // Degenerate snapshot: everything that can go wrong does.
    let mut snapshot = clean_snapshot();

    let mut firewall = healthy_firewall();
    firewall.summary = FirewallSummary::default();
    firewall.selinux = Some(SelinuxStatus {
        mode: SelinuxMode::Disabled,
        enabled: false,
    });
    snapshot.firewall = CategoryData::Collected(firewall);

    let mut vulnerabilities = healthy_vulnerabilities();
    vulnerabilities.summary = VulnerabilitySummary {
        security_updates_available: 40,
        total_updates_available: 300,
        reboot_required: true,
        automatic_updates_enabled: false,
        has_critical_vulnerabilities: true,
    };
    snapshot.vulnerabilities = CategoryData::Collected(vulnerabilities);

    let mut network = healthy_network();
    network.summary = NetworkSummary {
        connectivity_ok: false,
        dns_working: false,
        gateway_reachable: false,
        internet_access: false,
        ..NetworkSummary::default()
    };
    snapshot.network = CategoryData::Collected(network);

    let mut permissions = healthy_permissions();
    permissions.summary = PermissionsSummary {
        suid_files_found: 500,
        world_writable_found: 40,
        critical_permission_issues: 6,
        ssh_key_issues: 0,
        has_critical_issues: true,
    };
    snapshot.permissions = CategoryData::Collected(permissions);

    let alerts = engine().evaluate(&snapshot);
    assert!(!alerts.is_empty());

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    assert!(score.score <= 100);
    assert_eq!(score.grade, Grade::from_score(score.score));

    // The documented formula holds regardless of the mix.
    let critical = alerts.iter().filter(|a| a.severity == Severity::Critical).count() as i64;
    let warning = alerts.iter().filter(|a| a.severity == Severity::Warning).count() as i64;
    let expected = (100 - (critical * 10).min(50) - (warning * 3).min(30)).clamp(0, 100);
    assert_eq!(i64::from(score.score), expected);

    let report = report::assemble(snapshot, alerts, score);
    assert_eq!(report.summary.security_status, SecurityStatus::Critical);
    assert_eq!(report.summary.security_status.exit_code(), 2);
}

#[test]
fn empty_snapshot_is_not_an_error() {
    let snapshot = MetricsSnapshot::default();
    let alerts = engine().evaluate(&snapshot);
    assert!(alerts.is_empty());

    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    // No firewall information means no firewall bonus; zero known pending
    // updates still counts as the update bonus.
    assert_eq!(score.score, 100);
    assert_eq!(score.bonus, vec!["+10 points: No pending security updates"]);
}
