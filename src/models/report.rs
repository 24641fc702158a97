use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::alert::{Alert, Severity};
use crate::models::metrics::MetricsSnapshot;

/// Letter grade derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Threshold table: >=90 A, >=80 B, >=70 C, >=60 D, else F.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=100 => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
            Grade::F => write!(f, "F"),
        }
    }
}

/// The 0-100 security score with its human-readable breakdown. Bonus
/// entries describe satisfied positive signals but never move the number;
/// only deductions do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScore {
    pub score: u8,
    pub grade: Grade,
    pub deductions: Vec<String>,
    pub bonus: Vec<String>,
}

/// Coarse overall classification, also selects the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityStatus {
    Good,
    Warning,
    Critical,
}

impl SecurityStatus {
    /// `critical` on any critical alert or a score below 60, `warning`
    /// below 80, `good` otherwise.
    pub fn derive(critical_alerts: u32, score: u8) -> Self {
        if critical_alerts > 0 || score < 60 {
            SecurityStatus::Critical
        } else if score < 80 {
            SecurityStatus::Warning
        } else {
            SecurityStatus::Good
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            SecurityStatus::Good => 0,
            SecurityStatus::Warning => 1,
            SecurityStatus::Critical => 2,
        }
    }
}

impl std::fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityStatus::Good => write!(f, "good"),
            SecurityStatus::Warning => write!(f, "warning"),
            SecurityStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_alerts: u32,
    pub critical_alerts: u32,
    pub warning_alerts: u32,
    pub info_alerts: u32,
    pub security_status: SecurityStatus,
}

impl ReportSummary {
    pub fn from_alerts(alerts: &[Alert], score: &SecurityScore) -> Self {
        let count = |severity: Severity| -> u32 {
            alerts.iter().filter(|a| a.severity == severity).count() as u32
        };
        let critical_alerts = count(Severity::Critical);
        Self {
            total_alerts: alerts.len() as u32,
            critical_alerts,
            warning_alerts: count(Severity::Warning),
            info_alerts: count(Severity::Info),
            security_status: SecurityStatus::derive(critical_alerts, score.score),
        }
    }
}

/// The final audit artifact: snapshot, alert list, score, and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub timestamp_unix: i64,
    pub hostname: String,
    pub metrics: MetricsSnapshot,
    pub alerts: Vec<Alert>,
    pub security_score: SecurityScore,
    pub summary: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(100), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(80), Grade::B);
        assert_eq!(Grade::from_score(79), Grade::C);
        assert_eq!(Grade::from_score(70), Grade::C);
        assert_eq!(Grade::from_score(69), Grade::D);
        assert_eq!(Grade::from_score(60), Grade::D);
        assert_eq!(Grade::from_score(59), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn status_prefers_critical_alerts_over_score() {
        assert_eq!(SecurityStatus::derive(1, 95), SecurityStatus::Critical);
        assert_eq!(SecurityStatus::derive(0, 59), SecurityStatus::Critical);
        assert_eq!(SecurityStatus::derive(0, 60), SecurityStatus::Warning);
        assert_eq!(SecurityStatus::derive(0, 79), SecurityStatus::Warning);
        assert_eq!(SecurityStatus::derive(0, 80), SecurityStatus::Good);
    }

    #[test]
    fn exit_codes_map_to_status() {
        assert_eq!(SecurityStatus::Good.exit_code(), 0);
        assert_eq!(SecurityStatus::Warning.exit_code(), 1);
        assert_eq!(SecurityStatus::Critical.exit_code(), 2);
    }
}
