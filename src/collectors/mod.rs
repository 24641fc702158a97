//! Metric collection. One async module per audit category; each one shells
//! out to the usual OS tooling (`ss`, `journalctl`, `firewall-cmd`, `dnf`,
//! `ip`, `find`) and parses the output into the typed snapshot. A failing
//! sub-check degrades with a log line; a failing category lands in the
//! snapshot as an error slot and the audit carries on.

pub mod auth;
pub mod firewall;
pub mod network;
pub mod permissions;
pub mod ports;
pub mod vulnerabilities;

use anyhow::{Context, Result};
use std::process::Output;
use tokio::process::Command;
use tracing::{info, warn};

use crate::models::config::MonitoringConfig;
use crate::models::metrics::{CategoryData, MetricsSnapshot};

/// Collect all six categories concurrently into one snapshot.
pub async fn collect_snapshot(config: &MonitoringConfig) -> MetricsSnapshot {
    info!("collecting security metrics");

    let (ports, authentication, firewall, vulnerabilities, network, permissions) = tokio::join!(
        ports::collect(config),
        auth::collect(config),
        firewall::collect(config),
        vulnerabilities::collect(config),
        network::collect(config),
        permissions::collect(config),
    );

    MetricsSnapshot {
        ports: slot("ports", ports),
        authentication: slot("authentication", authentication),
        firewall: slot("firewall", firewall),
        vulnerabilities: slot("vulnerabilities", vulnerabilities),
        network: slot("network", network),
        permissions: slot("permissions", permissions),
    }
}

fn slot<T>(category: &str, result: Result<T>) -> CategoryData<T> {
    if let Err(e) = &result {
        warn!("{category} collection failed: {e:#}");
    }
    CategoryData::from_result(result)
}

/// Run a command and return its output. Spawn failures (missing binary)
/// are errors; a non-zero exit is not, since several of the tools used here
/// report state through their exit code.
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run {program}"))
}

/// Stdout of a command as a string, regardless of exit status.
pub(crate) async fn stdout_of(program: &str, args: &[&str]) -> Result<String> {
    let output = run(program, args).await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Trimmed stdout, for single-line status tools like `systemctl is-active`.
pub(crate) async fn status_line(program: &str, args: &[&str]) -> Result<String> {
    Ok(stdout_of(program, args).await?.trim().to_string())
}
