use std::collections::{BTreeSet, HashMap};

use crate::models::alert::Severity;
use crate::models::metrics::{BruteForceAnalysis, FailedLogin, SuspiciousSource};

/// Attempts from one address before it is considered suspicious.
const SUSPICIOUS_THRESHOLD: u64 = 5;
/// Attempts above which a suspicious address is critical.
const CRITICAL_THRESHOLD: u64 = 20;
/// Reported suspicious sources are capped to the worst offenders.
const MAX_REPORTED_SOURCES: usize = 20;

/// Clusters failed logins by source address and classifies addresses that
/// cross the attempt threshold. Pure function of its input: same records in,
/// same analysis out.
#[derive(Debug, Default)]
pub struct BruteForceDetector;

struct SourceStats {
    ip: String,
    attempts: u64,
    users: BTreeSet<String>,
}

impl BruteForceDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, failed_logins: &[FailedLogin]) -> BruteForceAnalysis {
        // First-encounter order is preserved so that equal attempt counts
        // keep a stable order after sorting.
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut stats: Vec<SourceStats> = Vec::new();

        for record in failed_logins {
            let Some(ip) = record.clusterable_source() else {
                continue;
            };

            let slot = match index.get(ip) {
                Some(&slot) => slot,
                None => {
                    index.insert(ip.to_string(), stats.len());
                    stats.push(SourceStats {
                        ip: ip.to_string(),
                        attempts: 0,
                        users: BTreeSet::new(),
                    });
                    stats.len() - 1
                }
            };

            stats[slot].attempts += 1;
            if let Some(user) = record.user.as_deref() {
                if !user.is_empty() {
                    stats[slot].users.insert(user.to_string());
                }
            }
        }

        let total_unique_ips = stats.len() as u32;

        let mut suspicious_ips: Vec<SuspiciousSource> = stats
            .into_iter()
            .filter(|s| s.attempts >= SUSPICIOUS_THRESHOLD)
            .map(|s| SuspiciousSource {
                ip: s.ip,
                attempts: s.attempts,
                users_attempted: s.users.into_iter().collect(),
                severity: Some(if s.attempts > CRITICAL_THRESHOLD {
                    Severity::Critical
                } else {
                    Severity::Warning
                }),
            })
            .collect();

        suspicious_ips.sort_by(|a, b| b.attempts.cmp(&a.attempts));
        suspicious_ips.truncate(MAX_REPORTED_SOURCES);

        let brute_force_detected = !suspicious_ips.is_empty();

        BruteForceAnalysis {
            total_unique_ips,
            suspicious_ips,
            brute_force_detected,
        }
    }
}
