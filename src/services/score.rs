use crate::models::alert::{Alert, Severity};
use crate::models::metrics::MetricsSnapshot;
use crate::models::report::{Grade, SecurityScore};

/// Points lost per critical alert, and the cap on that deduction.
const CRITICAL_PENALTY: u32 = 10;
const CRITICAL_PENALTY_CAP: u32 = 50;
/// Points lost per warning alert, and the cap on that deduction.
const WARNING_PENALTY: u32 = 3;
const WARNING_PENALTY_CAP: u32 = 30;

/// Reduces the alert population to a 0-100 score and letter grade.
///
/// Only deductions move the number. Bonus lines record satisfied positive
/// signals (firewall active, SELinux enforcing, no pending security
/// updates) for the reader, but are intentionally not added back to the
/// score; the deduction arithmetic alone determines the value.
#[derive(Debug, Default)]
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, alerts: &[Alert], snapshot: &MetricsSnapshot) -> SecurityScore {
        let mut score: i64 = 100;
        let mut deductions = Vec::new();

        let critical_count = alerts
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count() as u32;
        if critical_count > 0 {
            let deduction = (critical_count * CRITICAL_PENALTY).min(CRITICAL_PENALTY_CAP);
            score -= i64::from(deduction);
            deductions.push(format!(
                "-{deduction} points: {critical_count} critical alert(s)"
            ));
        }

        let warning_count = alerts
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .count() as u32;
        if warning_count > 0 {
            let deduction = (warning_count * WARNING_PENALTY).min(WARNING_PENALTY_CAP);
            score -= i64::from(deduction);
            deductions.push(format!(
                "-{deduction} points: {warning_count} warning alert(s)"
            ));
        }

        let mut bonus = Vec::new();

        let firewall_summary = snapshot.firewall.data().map(|f| &f.summary);
        if firewall_summary.map(|s| s.firewall_active).unwrap_or(false) {
            bonus.push("+5 points: Firewall active".to_string());
        }
        if firewall_summary.map(|s| s.selinux_enforcing).unwrap_or(false) {
            bonus.push("+5 points: SELinux in enforcing mode".to_string());
        }

        let pending_security_updates = snapshot
            .vulnerabilities
            .data()
            .map(|v| v.summary.security_updates_available)
            .unwrap_or(0);
        if pending_security_updates == 0 {
            bonus.push("+10 points: No pending security updates".to_string());
        }

        let score = score.clamp(0, 100) as u8;

        SecurityScore {
            score,
            grade: Grade::from_score(score),
            deductions,
            bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::Category;
    use crate::models::metrics::{
        CategoryData, FirewallMetrics, FirewallSummary, VulnerabilityMetrics,
        VulnerabilitySummary,
    };

    fn alerts(critical: usize, warning: usize, info: usize) -> Vec<Alert> {
        let mut list = Vec::new();
        for _ in 0..critical {
            list.push(Alert::new(Category::Firewall, Severity::Critical, "c"));
        }
        for _ in 0..warning {
            list.push(Alert::new(Category::Network, Severity::Warning, "w"));
        }
        for _ in 0..info {
            list.push(Alert::new(Category::Ports, Severity::Info, "i"));
        }
        list
    }

    fn score_of(critical: usize, warning: usize, info: usize) -> SecurityScore {
        ScoreCalculator::new().calculate(&alerts(critical, warning, info), &MetricsSnapshot::default())
    }

    #[test]
    fn clean_run_scores_one_hundred() {
        let score = score_of(0, 0, 0);
        assert_eq!(score.score, 100);
        assert_eq!(score.grade, Grade::A);
        assert!(score.deductions.is_empty());
    }

    #[test]
    fn info_alerts_never_deduct() {
        let score = score_of(0, 0, 12);
        assert_eq!(score.score, 100);
        assert!(score.deductions.is_empty());
    }

    #[test]
    fn deduction_formula_matches_counts() {
        assert_eq!(score_of(1, 0, 0).score, 90);
        assert_eq!(score_of(2, 0, 0).score, 80);
        assert_eq!(score_of(0, 1, 0).score, 97);
        assert_eq!(score_of(0, 3, 0).score, 91);
        assert_eq!(score_of(2, 3, 1).score, 71);
    }

    #[test]
    fn deductions_are_capped() {
        // 10 criticals cap at -50, 20 warnings cap at -30.
        let score = score_of(10, 20, 0);
        assert_eq!(score.score, 20);
        assert_eq!(score.deductions[0], "-50 points: 10 critical alert(s)");
        assert_eq!(score.deductions[1], "-30 points: 20 warning alert(s)");
    }

    #[test]
    fn score_is_clamped_to_zero() {
        // Caps make the worst case -80; even absurd counts stay in range.
        let score = score_of(100, 100, 100);
        assert_eq!(score.score, 20);
        assert!(score.score <= 100);
    }

    #[test]
    fn formula_holds_for_arbitrary_mixes() {
        for critical in 0..12u32 {
            for warning in 0..12u32 {
                let expected = (100i64
                    - i64::from((critical * 10).min(50))
                    - i64::from((warning * 3).min(30)))
                .clamp(0, 100) as u8;
                let got = score_of(critical as usize, warning as usize, 2).score;
                assert_eq!(got, expected, "critical={critical} warning={warning}");
            }
        }
    }

    #[test]
    fn bonus_lines_do_not_change_the_number() {
        let snapshot = MetricsSnapshot {
            firewall: CategoryData::Collected(FirewallMetrics {
                summary: FirewallSummary {
                    firewall_active: true,
                    selinux_enforcing: true,
                    ..Default::default()
                },
                ..Default::default()
            }),
            vulnerabilities: CategoryData::Collected(VulnerabilityMetrics {
                summary: VulnerabilitySummary::default(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let score = ScoreCalculator::new().calculate(&alerts(1, 0, 0), &snapshot);
        assert_eq!(score.score, 90);
        assert_eq!(score.bonus.len(), 3);
    }

    #[test]
    fn pending_updates_suppress_the_update_bonus() {
        let snapshot = MetricsSnapshot {
            vulnerabilities: CategoryData::Collected(VulnerabilityMetrics {
                summary: VulnerabilitySummary {
                    security_updates_available: 3,
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        let score = ScoreCalculator::new().calculate(&[], &snapshot);
        assert!(!score.bonus.iter().any(|b| b.contains("security updates")));
    }

    #[test]
    fn missing_firewall_category_grants_no_firewall_bonus() {
        let score = ScoreCalculator::new().calculate(&[], &MetricsSnapshot::default());
        assert!(!score.bonus.iter().any(|b| b.contains("Firewall")));
        assert!(!score.bonus.iter().any(|b| b.contains("SELinux")));
    }

    #[test]
    fn scoring_is_idempotent() {
        let list = alerts(2, 5, 1);
        let snapshot = MetricsSnapshot::default();
        let calc = ScoreCalculator::new();
        assert_eq!(calc.calculate(&list, &snapshot), calc.calculate(&list, &snapshot));
    }
}
