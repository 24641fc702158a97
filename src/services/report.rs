use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::models::alert::Alert;
use crate::models::metrics::MetricsSnapshot;
use crate::models::report::{Report, ReportSummary, SecurityScore};

/// Combine the snapshot, the alert list, and the score into the final
/// report object. Pure assembly; no evaluation happens here.
pub fn assemble(snapshot: MetricsSnapshot, alerts: Vec<Alert>, score: SecurityScore) -> Report {
    let timestamp = Utc::now();
    let summary = ReportSummary::from_alerts(&alerts, &score);

    Report {
        timestamp,
        timestamp_unix: timestamp.timestamp(),
        hostname: hostname(),
        metrics: snapshot,
        alerts,
        security_score: score,
        summary,
    }
}

fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}

/// Write the report as pretty JSON into `output_dir`, named by timestamp.
pub async fn save_report(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create report directory {}", output_dir.display()))?;

    let filename = format!(
        "security_{}.json",
        report.timestamp.format("%Y%m%d_%H%M%S")
    );
    let path = output_dir.join(filename);

    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    info!("report written to {}", path.display());
    Ok(path)
}
