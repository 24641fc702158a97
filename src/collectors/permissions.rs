use anyhow::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::stdout_of;
use crate::models::alert::Severity;
use crate::models::config::MonitoringConfig;
use crate::models::metrics::{
    FilePermissionCheck, HomeDirIssue, PermissionsMetrics, PermissionsSummary, SpecialFile,
    SshKeyPermission, WorldWritableFile,
};

/// Directories scanned for SUID/SGID binaries.
const BINARY_DIRS: &[&str] = &["/bin", "/sbin", "/usr/bin", "/usr/sbin", "/usr/local/bin"];
/// Directories where a world-writable file is a finding.
const CRITICAL_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin"];

/// System files with a fixed expected mode.
const CRITICAL_FILES: &[(&str, &str, &str)] = &[
    ("/etc/passwd", "644", "User database"),
    ("/etc/shadow", "000", "Password hashes"),
    ("/etc/group", "644", "Group database"),
    ("/etc/gshadow", "000", "Group passwords"),
    ("/etc/ssh/sshd_config", "600", "SSH daemon config"),
    ("/root", "700", "Root home directory"),
    ("/boot/grub2/grub.cfg", "600", "GRUB config"),
];

const MAX_SPECIAL_FILES: usize = 100;
const MAX_WORLD_WRITABLE: usize = 30;
const MAX_HOME_ISSUES: usize = 20;
const MAX_UNOWNED: usize = 20;

pub async fn collect(config: &MonitoringConfig) -> Result<PermissionsMetrics> {
    let mut metrics = PermissionsMetrics::default();

    if config.check_suid_files {
        metrics.suid_files = special_files("-4000").await?;
    }

    if config.check_sgid_files {
        match special_files("-2000").await {
            Ok(files) => metrics.sgid_files = files,
            Err(e) => warn!("sgid scan unavailable: {e:#}"),
        }
    }

    if config.check_world_writable {
        match world_writable_files().await {
            Ok(files) => metrics.world_writable_files = files,
            Err(e) => warn!("world-writable scan unavailable: {e:#}"),
        }
    }

    if config.check_critical_files {
        metrics.critical_file_permissions = critical_file_checks().await;
    }

    if config.check_home_permissions {
        metrics.home_directory_issues = home_directory_issues().await;
    }

    if config.check_ssh_keys {
        metrics.ssh_key_permissions = ssh_key_checks().await;
    }

    if config.check_unowned_files {
        match unowned_files().await {
            Ok(files) => metrics.unowned_files = files,
            Err(e) => warn!("unowned-file scan unavailable: {e:#}"),
        }
    }

    let critical_issues = metrics
        .critical_file_permissions
        .iter()
        .filter(|c| c.severity == Some(Severity::Critical))
        .count() as u32;

    metrics.summary = PermissionsSummary {
        suid_files_found: metrics.suid_files.len() as u32,
        world_writable_found: metrics.world_writable_files.len() as u32,
        critical_permission_issues: critical_issues,
        ssh_key_issues: metrics.ssh_key_permissions.len() as u32,
        has_critical_issues: critical_issues > 0,
    };

    Ok(metrics)
}

/// Files with the given special permission bit under the binary
/// directories. `find` exits non-zero on unreadable subtrees, so stdout is
/// used regardless of status.
async fn special_files(perm: &str) -> Result<Vec<SpecialFile>> {
    let mut files = Vec::new();

    for &dir in BINARY_DIRS {
        if !Path::new(dir).exists() {
            continue;
        }
        let output = stdout_of(
            "find",
            &[dir, "-xdev", "-type", "f", "-perm", perm, "-printf", "%m %u %p\n"],
        )
        .await?;
        files.extend(parse_find_special(&output));
        if files.len() >= MAX_SPECIAL_FILES {
            break;
        }
    }

    files.truncate(MAX_SPECIAL_FILES);
    Ok(files)
}

fn parse_find_special(output: &str) -> Vec<SpecialFile> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ' ');
            Some(SpecialFile {
                permissions: parts.next()?.to_string(),
                owner: parts.next()?.to_string(),
                path: parts.next()?.to_string(),
            })
        })
        .collect()
}

async fn world_writable_files() -> Result<Vec<WorldWritableFile>> {
    let mut files = Vec::new();

    for &dir in CRITICAL_DIRS {
        if !Path::new(dir).exists() {
            continue;
        }
        let output = stdout_of(
            "find",
            &[
                dir, "-xdev", "-type", "f", "-perm", "-002", "!", "-type", "l", "-printf",
                "%m %p\n",
            ],
        )
        .await?;

        for line in output.lines().take(20) {
            let Some((permissions, path)) = line.split_once(' ') else {
                continue;
            };
            files.push(WorldWritableFile {
                path: path.to_string(),
                permissions: permissions.to_string(),
                severity: Some(Severity::Warning),
            });
        }
    }

    files.truncate(MAX_WORLD_WRITABLE);
    Ok(files)
}

async fn critical_file_checks() -> Vec<FilePermissionCheck> {
    let mut checks = Vec::new();

    for &(path, expected, description) in CRITICAL_FILES {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            continue;
        };
        let current = format!("{:03o}", metadata.permissions().mode() & 0o777);
        checks.push(evaluate_critical_file(path, description, expected, &current));
    }

    checks
}

fn evaluate_critical_file(
    path: &str,
    description: &str,
    expected: &str,
    current: &str,
) -> FilePermissionCheck {
    // Shadow-style files may legitimately be stricter than 000.
    let is_secure =
        current == expected || (expected == "000" && matches!(current, "000" | "400" | "440"));

    FilePermissionCheck {
        file: path.to_string(),
        description: description.to_string(),
        current_permissions: current.to_string(),
        expected_permissions: expected.to_string(),
        is_secure,
        severity: if is_secure {
            None
        } else {
            Some(Severity::Critical)
        },
    }
}

/// Home directories that are readable beyond their owner and group.
async fn home_directory_issues() -> Vec<HomeDirIssue> {
    let Ok(passwd) = tokio::fs::read_to_string("/etc/passwd").await else {
        return Vec::new();
    };

    let mut issues = Vec::new();

    for line in passwd.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 6 {
            continue;
        }
        let (user, home_dir) = (fields[0], fields[5]);
        let Ok(uid) = fields[2].parse::<u32>() else {
            continue;
        };
        if uid < 1000 && uid != 0 {
            continue;
        }

        let Ok(metadata) = tokio::fs::metadata(home_dir).await else {
            continue;
        };
        let mode = format!("{:03o}", metadata.permissions().mode() & 0o777);
        if !matches!(mode.as_str(), "700" | "750" | "755") {
            issues.push(HomeDirIssue {
                user: user.to_string(),
                home_dir: home_dir.to_string(),
                permissions: mode,
                recommended: "700 or 755".to_string(),
                severity: Some(Severity::Warning),
            });
        }

        if issues.len() >= MAX_HOME_ISSUES {
            break;
        }
    }

    issues
}

/// `~/.ssh` hygiene: the directory itself must be 700 and private keys
/// must not be readable by anyone else.
async fn ssh_key_checks() -> Vec<SshKeyPermission> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    let ssh_dir = home.join(".ssh");
    let Ok(dir_metadata) = tokio::fs::metadata(&ssh_dir).await else {
        return Vec::new();
    };

    let mut issues = Vec::new();

    let dir_mode = format!("{:03o}", dir_metadata.permissions().mode() & 0o777);
    if dir_mode != "700" {
        issues.push(SshKeyPermission {
            path: ssh_dir.display().to_string(),
            kind: "directory".to_string(),
            current_permissions: dir_mode,
            expected_permissions: "700".to_string(),
            severity: Some(Severity::Warning),
        });
    }

    let Ok(mut entries) = tokio::fs::read_dir(&ssh_dir).await else {
        return issues;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_private_key_name(&name) {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let mode = format!("{:03o}", metadata.permissions().mode() & 0o777);
        if !matches!(mode.as_str(), "600" | "400") {
            issues.push(SshKeyPermission {
                path: entry.path().display().to_string(),
                kind: "private_key".to_string(),
                current_permissions: mode,
                expected_permissions: "600".to_string(),
                severity: Some(Severity::Critical),
            });
        }
    }

    issues
}

fn is_private_key_name(name: &str) -> bool {
    name.starts_with("id_") && !name.ends_with(".pub")
}

async fn unowned_files() -> Result<Vec<String>> {
    let mut files = Vec::new();

    for dir in ["/etc", "/usr", "/var"] {
        if !Path::new(dir).exists() {
            continue;
        }
        let output = stdout_of(
            "find",
            &[dir, "-xdev", "(", "-nouser", "-o", "-nogroup", ")", "-printf", "%p\n"],
        )
        .await?;
        files.extend(output.lines().map(PathBuf::from).map(|p| p.display().to_string()));
        if files.len() >= MAX_UNOWNED {
            break;
        }
    }

    files.truncate(MAX_UNOWNED);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_find_printf_lines() {
        let output = "\
4755 root /usr/bin/sudo
4755 root /usr/bin/passwd with spaces
garbage";
        let files = parse_find_special(output);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].permissions, "4755");
        assert_eq!(files[0].owner, "root");
        assert_eq!(files[0].path, "/usr/bin/sudo");
        // Path keeps everything after the second field.
        assert_eq!(files[1].path, "/usr/bin/passwd with spaces");
    }

    #[test]
    fn exact_mode_is_secure() {
        let check = evaluate_critical_file("/etc/passwd", "User database", "644", "644");
        assert!(check.is_secure);
        assert!(check.severity.is_none());

        let check = evaluate_critical_file("/etc/passwd", "User database", "644", "664");
        assert!(!check.is_secure);
        assert_eq!(check.severity, Some(Severity::Critical));
    }

    #[test]
    fn shadow_accepts_stricter_modes() {
        for mode in ["000", "400", "440"] {
            let check = evaluate_critical_file("/etc/shadow", "Password hashes", "000", mode);
            assert!(check.is_secure, "mode {mode} should be acceptable");
        }
        let check = evaluate_critical_file("/etc/shadow", "Password hashes", "000", "644");
        assert!(!check.is_secure);
    }

    #[test]
    fn private_key_names() {
        assert!(is_private_key_name("id_rsa"));
        assert!(is_private_key_name("id_ed25519"));
        assert!(!is_private_key_name("id_rsa.pub"));
        assert!(!is_private_key_name("known_hosts"));
        assert!(!is_private_key_name("config"));
    }
}
