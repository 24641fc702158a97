use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use secaudit::collectors;
use secaudit::models::alert::Severity;
use secaudit::models::config::{AppConfig, SanitizeLevel};
use secaudit::models::report::Report;
use secaudit::services::alerts::AlertEngine;
use secaudit::services::report;
use secaudit::services::sanitizer::DataSanitizer;
use secaudit::services::score::ScoreCalculator;
use secaudit::utils::logging::init_logging;

/// Audit the local system's security posture.
#[derive(Parser, Debug)]
#[command(name = "secaudit", version, about = "Workstation security audit with alerting and scoring")]
struct Args {
    /// Path to a TOML or JSON config file (default: ./config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the JSON report (overrides config and SECAUDIT_OUTPUT)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Anonymize the report before writing it
    #[arg(long, value_enum, value_name = "LEVEL")]
    sanitize: Option<SanitizeLevel>,

    /// Skip writing the report file; print the summary only
    #[arg(long)]
    no_save: bool,

    /// Increase log verbosity (use -v or -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config.logging.level, args.verbose)?;

    info!("starting security audit");

    let snapshot = collectors::collect_snapshot(&config.monitoring).await;

    info!("evaluating alert rules");
    let alerts = AlertEngine::new(&config.monitoring).evaluate(&snapshot);
    let score = ScoreCalculator::new().calculate(&alerts, &snapshot);
    let mut audit_report = report::assemble(snapshot, alerts, score);

    let sanitize_level = args.sanitize.unwrap_or(config.sanitize);
    if sanitize_level != SanitizeLevel::None {
        info!("sanitizing report at level {sanitize_level:?}");
        audit_report = DataSanitizer::new(sanitize_level).sanitize(audit_report);
    }

    if !args.no_save {
        let output_dir = args
            .output
            .clone()
            .unwrap_or_else(|| config.output.resolve_output_dir());
        let path = report::save_report(&audit_report, &output_dir).await?;
        println!("Report saved to {}", path.display());
    }

    print_summary(&audit_report);

    std::process::exit(audit_report.summary.security_status.exit_code());
}

fn print_summary(report: &Report) {
    let summary = &report.summary;
    let score = &report.security_score;

    println!();
    println!("{}", "=".repeat(70));
    println!("SECURITY AUDIT SUMMARY");
    println!("{}", "=".repeat(70));
    println!();
    println!("Status:   {}", summary.security_status);
    println!("Score:    {}/100 (grade {})", score.score, score.grade);
    println!("Host:     {}", report.hostname);
    println!("When:     {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!(
        "Alerts:   {} total ({} critical, {} warning, {} info)",
        summary.total_alerts, summary.critical_alerts, summary.warning_alerts, summary.info_alerts
    );

    let critical_alerts: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .collect();
    if !critical_alerts.is_empty() {
        println!();
        println!("Critical alerts:");
        for (i, alert) in critical_alerts.iter().take(10).enumerate() {
            println!("  {}. [{}] {}", i + 1, alert.category, alert.message);
            if let Some(recommendation) = &alert.recommendation {
                println!("     -> {recommendation}");
            }
        }
    }

    if !score.deductions.is_empty() {
        println!();
        println!("Score breakdown:");
        for deduction in &score.deductions {
            println!("  {deduction}");
        }
    }
    for bonus in &score.bonus {
        println!("  {bonus}");
    }

    println!();
    println!("{}", "=".repeat(70));
}
