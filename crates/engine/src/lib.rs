//! Funnel metrics engine — turns a table of per-user lifecycle
//! timestamps into stage counts and conversions, segment breakdowns,
//! a daily time series, anomaly flags, and monthly cohorts.

pub mod analyzer;
pub mod anomaly;
pub mod cohort;
pub mod daily;
pub mod metrics;
pub mod segments;

pub use analyzer::FunnelAnalyzer;
pub use anomaly::{detect_anomalies, Anomaly, ShiftDirection};
pub use cohort::{calculate_cohort_analysis, CohortRow};
pub use daily::{calculate_daily_metrics, DailyMetrics};
pub use metrics::{FunnelMetrics, StageConversions, StageCounts, StageTimings};
pub use segments::{analyze_by_segments, SegmentBreakdown, SegmentRow};
