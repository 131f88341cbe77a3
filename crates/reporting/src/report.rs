//! Report builder — formats engine output into a structured document
//! and exports it as CSV or JSON. Consumes the engine's output
//! structures only; no rendering concerns.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use funnel_core::ReportConfig;
use funnel_engine::{FunnelAnalyzer, SegmentRow, StageTimings};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

// ─── Types ──────────────────────────────────────────────────────────────────

/// Explicit report configuration, passed in per generation. Section
/// toggles mirror the sections of the rendered document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    pub title: String,
    pub author: String,
    pub include_overview: bool,
    pub include_funnel: bool,
    pub include_segments: bool,
    pub include_anomalies: bool,
    /// Relative conversion-change threshold for the anomaly section.
    pub anomaly_threshold: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Funnel Conversion Analysis".to_string(),
            author: "Analyst".to_string(),
            include_overview: true,
            include_funnel: true,
            include_segments: true,
            include_anomalies: true,
            anomaly_threshold: 0.5,
        }
    }
}

impl ReportOptions {
    pub fn from_config(report: &ReportConfig, anomaly_threshold: f64) -> Self {
        Self {
            title: report.title.clone(),
            author: report.author.clone(),
            anomaly_threshold,
            ..Self::default()
        }
    }
}

/// Headline counts shown before any funnel math.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewSection {
    pub total_users: u64,
    pub depositors: u64,
    pub bettors: u64,
    pub second_depositors: u64,
}

/// One row of the funnel stage table. The conversion column is
/// relative to the immediately preceding stage; Registration is
/// pinned at 100%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTableRow {
    pub stage: String,
    pub count: u64,
    pub conversion_pct: f64,
}

/// Best-converting category values for one dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHighlight {
    pub dimension: String,
    pub top: Vec<SegmentRow>,
}

/// A fully generated report: plain structured data ready for a
/// renderer or for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub generated_at: DateTime<Utc>,
    pub total_records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<OverviewSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel: Option<Vec<StageTableRow>>,
    pub avg_times_hours: StageTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<SegmentHighlight>>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<Vec<String>>,
}

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Report has no funnel section to export")]
    NoFunnelSection,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ─── Report Builder ─────────────────────────────────────────────────────────

/// Generates reports from an analyzer and keeps them addressable by id
/// for later export.
pub struct ReportBuilder {
    generated: DashMap<Uuid, FunnelReport>,
}

/// Conversion levels below which a recommendation line is emitted.
const LOW_REG_TO_DEPOSIT_PCT: f64 = 20.0;
const LOW_DEPOSIT_TO_BET_PCT: f64 = 80.0;
const LOW_BET_TO_SECOND_DEPOSIT_PCT: f64 = 30.0;

/// Segment values listed per dimension in the highlights section.
const TOP_SEGMENTS_PER_DIMENSION: usize = 3;

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            generated: DashMap::new(),
        }
    }

    /// Generate a report over the analyzer's bound snapshot.
    pub fn generate(&self, analyzer: &FunnelAnalyzer, options: &ReportOptions) -> FunnelReport {
        let metrics = analyzer.funnel_metrics();

        let overview = options.include_overview.then(|| OverviewSection {
            total_users: metrics.counts.registrations,
            depositors: metrics.counts.deposits,
            bettors: metrics.counts.first_bets,
            second_depositors: metrics.counts.second_deposits,
        });

        let funnel = options.include_funnel.then(|| {
            vec![
                StageTableRow {
                    stage: "Registration".to_string(),
                    count: metrics.counts.registrations,
                    conversion_pct: 100.0,
                },
                StageTableRow {
                    stage: "Deposit".to_string(),
                    count: metrics.counts.deposits,
                    conversion_pct: metrics.conversions.reg_to_deposit,
                },
                StageTableRow {
                    stage: "First Bet".to_string(),
                    count: metrics.counts.first_bets,
                    conversion_pct: metrics.conversions.deposit_to_bet,
                },
                StageTableRow {
                    stage: "Second Deposit".to_string(),
                    count: metrics.counts.second_deposits,
                    conversion_pct: metrics.conversions.bet_to_second_deposit,
                },
            ]
        });

        let segments = options.include_segments.then(|| {
            analyzer
                .segment_analysis()
                .into_iter()
                .map(|breakdown| {
                    let mut rows = breakdown.rows;
                    rows.sort_by(|a, b| {
                        b.reg_to_deposit_conv
                            .partial_cmp(&a.reg_to_deposit_conv)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    rows.truncate(TOP_SEGMENTS_PER_DIMENSION);
                    SegmentHighlight {
                        dimension: breakdown.dimension.to_string(),
                        top: rows,
                    }
                })
                .collect()
        });

        let anomalies = options.include_anomalies.then(|| {
            analyzer
                .anomalies(options.anomaly_threshold)
                .iter()
                .map(|a| a.to_string())
                .collect()
        });

        let mut recommendations = Vec::new();
        if metrics.conversions.reg_to_deposit < LOW_REG_TO_DEPOSIT_PCT {
            recommendations.push(
                "Low deposit conversion rate. Consider improving onboarding and bonus programs."
                    .to_string(),
            );
        }
        if metrics.conversions.deposit_to_bet < LOW_DEPOSIT_TO_BET_PCT {
            recommendations
                .push("Low first bet conversion rate. Review the betting process UX.".to_string());
        }
        if metrics.conversions.bet_to_second_deposit < LOW_BET_TO_SECOND_DEPOSIT_PCT {
            recommendations.push(
                "Low second deposit conversion rate. Improve retention mechanics.".to_string(),
            );
        }
        if recommendations.is_empty() {
            recommendations.push("All funnel metrics are within normal ranges.".to_string());
        }

        let report = FunnelReport {
            id: Uuid::new_v4(),
            title: options.title.clone(),
            author: options.author.clone(),
            generated_at: Utc::now(),
            total_records: metrics.counts.registrations,
            overview,
            funnel,
            avg_times_hours: metrics.avg_times_hours,
            segments,
            recommendations,
            anomalies,
        };

        info!(report_id = %report.id, records = report.total_records, "Report generated");
        self.generated.insert(report.id, report.clone());
        report
    }

    pub fn get_report(&self, id: &Uuid) -> Option<FunnelReport> {
        self.generated.get(id).map(|r| r.clone())
    }

    /// Export a generated report's funnel stage table as CSV.
    pub fn export_csv(&self, id: &Uuid) -> Result<String, ReportError> {
        let report = self
            .generated
            .get(id)
            .ok_or(ReportError::NotFound(*id))?;
        let funnel = report.funnel.as_ref().ok_or(ReportError::NoFunnelSection)?;

        let mut csv = String::from("stage,count,conversion_pct\n");
        for row in funnel {
            csv.push_str(&format!(
                "\"{}\",{},{:.1}\n",
                row.stage.replace('"', "\"\""),
                row.count,
                row.conversion_pct
            ));
        }
        Ok(csv)
    }

    /// Export a generated report as pretty-printed JSON.
    pub fn export_json(&self, id: &Uuid) -> Result<String, ReportError> {
        let report = self
            .generated
            .get(id)
            .ok_or(ReportError::NotFound(*id))?;
        Ok(serde_json::to_string_pretty(&*report)?)
    }

    pub fn list_reports(&self) -> Vec<FunnelReport> {
        self.generated.iter().map(|r| r.clone()).collect()
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
