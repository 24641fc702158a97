use anyhow::Result;
use tracing::warn;

use super::{run, status_line, stdout_of};
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    AutoUpdateStatus, KernelStatus, PackageUpdate, SecurityAdvisory, SecurityUpdates,
    UpdatesOverview, VulnerabilityMetrics, VulnerabilitySummary,
};

const AUTO_UPDATE_TIMER: &str = "dnf-automatic.timer";

pub async fn collect(config: &MonitoringConfig) -> Result<VulnerabilityMetrics> {
    let mut metrics = VulnerabilityMetrics::default();

    if config.check_security_updates {
        match security_updates().await {
            Ok(updates) => metrics.security_updates = Some(updates),
            Err(e) => warn!("security update listing unavailable: {e:#}"),
        }
    }

    if config.check_all_updates {
        match all_updates().await {
            Ok(updates) => metrics.all_updates = Some(updates),
            Err(e) => warn!("update listing unavailable: {e:#}"),
        }
    }

    if config.check_kernel {
        match kernel_status().await {
            Ok(kernel) => metrics.kernel = Some(kernel),
            Err(e) => warn!("kernel check unavailable: {e:#}"),
        }
    }

    if config.check_automatic_updates {
        match automatic_updates().await {
            Ok(status) => metrics.automatic_updates = Some(status),
            Err(e) => warn!("automatic update check unavailable: {e:#}"),
        }
    }

    metrics.summary = VulnerabilitySummary {
        security_updates_available: metrics
            .security_updates
            .as_ref()
            .map(|u| u.count)
            .unwrap_or(0),
        total_updates_available: metrics
            .all_updates
            .as_ref()
            .map(|u| u.total_packages)
            .unwrap_or(0),
        reboot_required: metrics
            .kernel
            .as_ref()
            .map(|k| k.reboot_required)
            .unwrap_or(false),
        automatic_updates_enabled: metrics
            .automatic_updates
            .as_ref()
            .map(|a| a.configured)
            .unwrap_or(false),
        has_critical_vulnerabilities: metrics
            .security_updates
            .as_ref()
            .map(|u| u.count > 0)
            .unwrap_or(false),
    };

    Ok(metrics)
}

async fn security_updates() -> Result<SecurityUpdates> {
    let output = stdout_of("dnf", &["updateinfo", "list", "security", "--available", "-q"]).await?;
    Ok(parse_security_updates(&output))
}

/// Typical line: `FEDORA-2026-1a2b3c Important/Sec. openssl-1:3.1.4-2.fc40`
fn parse_security_updates(output: &str) -> SecurityUpdates {
    let mut available = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Last metadata") || line.contains("UpdateInfo") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        available.push(SecurityAdvisory {
            advisory: parts[0].to_string(),
            severity: parts[1].to_string(),
            package: parts[2..].join(" "),
        });
    }

    let count = available.len() as u32;
    SecurityUpdates { available, count }
}

async fn all_updates() -> Result<UpdatesOverview> {
    // dnf check-update exits 100 when updates are pending.
    let output = run("dnf", &["check-update", "--quiet"]).await?;
    let pending = output.status.code() == Some(100) || !output.stdout.is_empty();
    if !pending {
        return Ok(UpdatesOverview::default());
    }
    Ok(parse_all_updates(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_all_updates(output: &str) -> UpdatesOverview {
    let mut packages = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Last metadata") || line.starts_with("Obsoleting") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        packages.push(PackageUpdate {
            name: parts[0].to_string(),
            version: parts[1].to_string(),
            repo: parts.get(2).unwrap_or(&"unknown").to_string(),
        });
    }

    let total_packages = packages.len() as u32;
    UpdatesOverview {
        total_packages,
        packages,
    }
}

async fn kernel_status() -> Result<KernelStatus> {
    let running = status_line("uname", &["-r"]).await?;
    let installed = stdout_of("rpm", &["-q", "--last", "kernel"]).await?;
    Ok(kernel_from_rpm(&running, &installed))
}

fn kernel_from_rpm(running: &str, installed: &str) -> KernelStatus {
    let latest_installed = installed
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(|pkg| pkg.trim_start_matches("kernel-").to_string())
        .unwrap_or_default();

    let reboot_required =
        !running.is_empty() && !latest_installed.is_empty() && !latest_installed.contains(running);

    KernelStatus {
        running: running.to_string(),
        latest_installed,
        reboot_required,
    }
}

async fn automatic_updates() -> Result<AutoUpdateStatus> {
    let active = status_line("systemctl", &["is-active", AUTO_UPDATE_TIMER]).await? == "active";
    let enabled = status_line("systemctl", &["is-enabled", AUTO_UPDATE_TIMER])
        .await
        .map(|s| s == "enabled")
        .unwrap_or(false);

    Ok(AutoUpdateStatus {
        service: AUTO_UPDATE_TIMER.to_string(),
        active,
        enabled,
        configured: active || enabled,
    })
}
