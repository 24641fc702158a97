use anyhow::Result;
use chrono::{Duration, Local};
use regex::Regex;
use tracing::warn;

use super::stdout_of;
use crate::models::alert::Severity;
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    ActiveSession, AuthMetrics, AuthSummary, FailedLogin, SshConfigAudit, SshConfigCheck,
    SuccessfulLogin, SudoInvocation,
};
use crate::services::brute_force::BruteForceDetector;

const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
const MAX_FAILED_RECORDS: usize = 100;
const MAX_SUCCESS_RECORDS: usize = 50;
const MAX_SUDO_RECORDS: usize = 50;

pub async fn collect(config: &MonitoringConfig) -> Result<AuthMetrics> {
    let mut metrics = AuthMetrics::default();
    let hours = config.auth_lookback_hours;

    if config.check_failed_logins {
        metrics.failed_logins = failed_logins(hours).await?;
        metrics.brute_force_analysis =
            Some(BruteForceDetector::new().detect(&metrics.failed_logins));
    }

    if config.check_successful_logins {
        match successful_logins(hours).await {
            Ok(logins) => metrics.successful_logins = logins,
            Err(e) => warn!("successful-login history unavailable: {e:#}"),
        }
    }

    if config.check_sudo_usage {
        match sudo_usage(hours).await {
            Ok(invocations) => metrics.sudo_usage = invocations,
            Err(e) => warn!("sudo history unavailable: {e:#}"),
        }
    }

    if config.check_active_sessions {
        match active_sessions().await {
            Ok(sessions) => metrics.active_sessions = sessions,
            Err(e) => warn!("session listing unavailable: {e:#}"),
        }
    }

    if config.check_ssh_config {
        metrics.ssh_config = ssh_config_audit().await;
    }

    metrics.summary = AuthSummary {
        failed_login_attempts: metrics.failed_logins.len() as u32,
        successful_logins: metrics.successful_logins.len() as u32,
        brute_force_detected: metrics
            .brute_force_analysis
            .as_ref()
            .map(|a| a.brute_force_detected)
            .unwrap_or(false),
        suspicious_ips_count: metrics
            .brute_force_analysis
            .as_ref()
            .map(|a| a.suspicious_ips.len() as u32)
            .unwrap_or(0),
        active_sessions: metrics.active_sessions.len() as u32,
    };

    Ok(metrics)
}

async fn sshd_journal(hours: u64) -> Result<String> {
    let since = Local::now() - Duration::hours(hours as i64);
    let since = since.format("%Y-%m-%d %H:%M:%S").to_string();
    stdout_of(
        "journalctl",
        &["-u", "sshd", "--since", &since, "--no-pager", "-q"],
    )
    .await
}

/// Failed SSH authentication attempts over the lookback window, newest-last,
/// capped to the most recent entries.
async fn failed_logins(hours: u64) -> Result<Vec<FailedLogin>> {
    let journal = sshd_journal(hours).await?;
    Ok(parse_failed_logins(&journal))
}

fn parse_failed_logins(journal: &str) -> Vec<FailedLogin> {
    let ip_re = Regex::new(r"from\s+(\d+\.\d+\.\d+\.\d+)").expect("static pattern");
    let user_re =
        Regex::new(r"(?:for|[Ii]nvalid user)\s+(?:invalid user\s+)?(\w+)").expect("static pattern");
    let mut records = Vec::new();

    for line in journal.lines() {
        if !line.contains("Failed password") && !line.contains("Invalid user") {
            continue;
        }

        records.push(FailedLogin {
            timestamp: journal_timestamp(line),
            user: user_re.captures(line).map(|c| c[1].to_string()),
            source_ip: ip_re.captures(line).map(|c| c[1].to_string()),
            message: truncate(line.trim(), 200),
        });
    }

    tail(records, MAX_FAILED_RECORDS)
}

async fn successful_logins(hours: u64) -> Result<Vec<SuccessfulLogin>> {
    let journal = sshd_journal(hours).await?;
    Ok(parse_successful_logins(&journal))
}

fn parse_successful_logins(journal: &str) -> Vec<SuccessfulLogin> {
    let ip_re = Regex::new(r"from\s+(\d+\.\d+\.\d+\.\d+)").expect("static pattern");
    let user_re = Regex::new(r"for\s+(\w+)").expect("static pattern");
    let mut records = Vec::new();

    for line in journal.lines() {
        let auth_method = if line.contains("Accepted password") {
            "password"
        } else if line.contains("Accepted publickey") {
            "publickey"
        } else {
            continue;
        };

        records.push(SuccessfulLogin {
            timestamp: journal_timestamp(line),
            auth_method: auth_method.to_string(),
            user: user_re.captures(line).map(|c| c[1].to_string()),
            source_ip: ip_re.captures(line).map(|c| c[1].to_string()),
        });
    }

    tail(records, MAX_SUCCESS_RECORDS)
}

async fn sudo_usage(hours: u64) -> Result<Vec<SudoInvocation>> {
    let since = Local::now() - Duration::hours(hours as i64);
    let since = since.format("%Y-%m-%d %H:%M:%S").to_string();
    let journal = stdout_of(
        "journalctl",
        &["_COMM=sudo", "--since", &since, "--no-pager", "-q"],
    )
    .await?;
    Ok(parse_sudo_usage(&journal))
}

fn parse_sudo_usage(journal: &str) -> Vec<SudoInvocation> {
    let user_re = Regex::new(r"USER=(\w+)").expect("static pattern");
    let cmd_re = Regex::new(r"COMMAND=(.+)$").expect("static pattern");
    let mut records = Vec::new();

    for line in journal.lines() {
        if !line.contains("COMMAND=") {
            continue;
        }
        records.push(SudoInvocation {
            timestamp: journal_timestamp(line),
            user: user_re
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            command: cmd_re
                .captures(line)
                .map(|c| c[1].trim().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        });
    }

    tail(records, MAX_SUDO_RECORDS)
}

async fn active_sessions() -> Result<Vec<ActiveSession>> {
    let output = stdout_of("w", &["-h"]).await?;
    Ok(parse_active_sessions(&output))
}

fn parse_active_sessions(output: &str) -> Vec<ActiveSession> {
    let mut sessions = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        sessions.push(ActiveSession {
            user: parts[0].to_string(),
            tty: parts[1].to_string(),
            from: parts[2].to_string(),
            login_time: parts.get(3).unwrap_or(&"unknown").to_string(),
        });
    }

    sessions
}

/// Hardening checks against sshd_config. `None` when the file cannot be
/// read (not installed, or no permission).
async fn ssh_config_audit() -> Option<SshConfigAudit> {
    match tokio::fs::read_to_string(SSHD_CONFIG).await {
        Ok(content) => Some(audit_ssh_config(&content)),
        Err(e) => {
            warn!("cannot read {SSHD_CONFIG}: {e}");
            None
        }
    }
}

fn audit_ssh_config(content: &str) -> SshConfigAudit {
    // (setting, recommended value, predicate over the active config line)
    let expectations: [(&str, &str, fn(&str) -> bool); 4] = [
        ("PermitRootLogin", "no", |line| line.to_lowercase().contains("no")),
        ("PasswordAuthentication", "no (use keys)", |line| {
            line.to_lowercase().contains("no")
        }),
        ("PermitEmptyPasswords", "no", |line| line.to_lowercase().contains("no")),
        ("Protocol", "2", |line| line.contains('2')),
    ];

    let mut checks = Vec::new();

    for (setting, recommended, is_secure_line) in expectations {
        let active_line = content
            .lines()
            .map(str::trim)
            .find(|line| line.contains(setting) && !line.starts_with('#'));

        let (current, is_secure) = match active_line {
            Some(line) => (line.to_string(), is_secure_line(line)),
            None => ("not set".to_string(), false),
        };

        checks.push(SshConfigCheck {
            setting: setting.to_string(),
            current,
            recommended: recommended.to_string(),
            is_secure,
            severity: if is_secure { None } else { Some(Severity::Warning) },
        });
    }

    SshConfigAudit {
        config_file: SSHD_CONFIG.to_string(),
        checks,
    }
}

fn journal_timestamp(line: &str) -> Option<String> {
    let prefix: Vec<&str> = line.split_whitespace().take(3).collect();
    if prefix.len() == 3 {
        Some(prefix.join(" "))
    } else {
        None
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn tail<T>(mut records: Vec<T>, keep: usize) -> Vec<T> {
    let skip = records.len().saturating_sub(keep);
    records.split_off(skip)
}
