//! Funnel Analyzer — conversion funnel analysis over user lifecycle
//! events, from CSV to a structured report.

mod demo;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use funnel_core::{AppConfig, EventTable};
use funnel_engine::FunnelAnalyzer;
use funnel_reporting::{FunnelReport, ReportBuilder, ReportOptions};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "funnel-analyzer")]
#[command(about = "Conversion funnel analysis over user lifecycle events")]
#[command(version)]
struct Cli {
    /// Input CSV with one row per user
    #[arg(long, required_unless_present = "demo_users", conflicts_with = "demo_users")]
    input: Option<PathBuf>,

    /// Generate a seeded synthetic dataset of this many users instead
    /// of reading a file
    #[arg(long)]
    demo_users: Option<usize>,

    /// Seed for the synthetic dataset
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Anomaly threshold as a fraction, 0.5 = 50% (overrides config)
    #[arg(long, env = "FUNNEL_ANALYZER__ANOMALY__THRESHOLD")]
    threshold: Option<f64>,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to this path instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnel_analyzer=info,funnel_engine=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(threshold) = cli.threshold {
        config.anomaly.threshold = threshold;
    }

    let table = match (&cli.input, cli.demo_users) {
        (Some(path), _) => {
            info!(path = %path.display(), "Loading event table");
            EventTable::from_csv_path(path)?
        }
        (None, Some(n_users)) => {
            info!(users = n_users, seed = cli.seed, "Generating demo dataset");
            demo::generate_demo_data(n_users, cli.seed)
        }
        (None, None) => unreachable!("clap enforces --input or --demo-users"),
    };

    info!(
        rows = table.len(),
        threshold = config.anomaly.threshold,
        "Running funnel analysis"
    );

    let analyzer = FunnelAnalyzer::new(table);
    let builder = ReportBuilder::new();
    let options = ReportOptions::from_config(&config.report, config.anomaly.threshold);
    let report = builder.generate(&analyzer, &options);

    let rendered = match cli.format {
        OutputFormat::Json => builder.export_json(&report.id)?,
        OutputFormat::Csv => builder.export_csv(&report.id)?,
        OutputFormat::Text => render_text(&report),
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            info!(path = %path.display(), "Report written");
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

/// Plain-text rendering of a report for terminal use.
fn render_text(report: &FunnelReport) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{}", report.title);
    let _ = writeln!(out, "Author: {}", report.author);
    let _ = writeln!(out, "Records: {}", report.total_records);
    let _ = writeln!(out);

    if let Some(funnel) = &report.funnel {
        let _ = writeln!(out, "Funnel:");
        for row in funnel {
            let _ = writeln!(
                out,
                "  {:<16} {:>8}  {:>6.1}%",
                row.stage, row.count, row.conversion_pct
            );
        }
        let _ = writeln!(out);
    }

    let times = &report.avg_times_hours;
    let _ = writeln!(out, "Average time between stages (hours):");
    for (label, value) in [
        ("reg -> deposit", times.reg_to_deposit),
        ("deposit -> bet", times.deposit_to_bet),
        ("bet -> 2nd deposit", times.bet_to_second_deposit),
    ] {
        match value {
            Some(hours) => {
                let _ = writeln!(out, "  {label:<20} {hours:.1}");
            }
            None => {
                let _ = writeln!(out, "  {label:<20} -");
            }
        }
    }
    let _ = writeln!(out);

    if let Some(segments) = &report.segments {
        let _ = writeln!(out, "Top segments by deposit conversion:");
        for highlight in segments {
            let _ = writeln!(out, "  {}:", highlight.dimension);
            for row in &highlight.top {
                let _ = writeln!(
                    out,
                    "    {}: {:.1}% ({} users)",
                    row.value, row.reg_to_deposit_conv, row.users
                );
            }
        }
        let _ = writeln!(out);
    }

    if let Some(anomalies) = &report.anomalies {
        let _ = writeln!(out, "Anomalies:");
        if anomalies.is_empty() {
            let _ = writeln!(out, "  none detected");
        }
        for anomaly in anomalies {
            let _ = writeln!(out, "  {anomaly}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Recommendations:");
    for recommendation in &report.recommendations {
        let _ = writeln!(out, "  {recommendation}");
    }

    out
}
