//! Engine facade — binds an immutable event table snapshot and runs
//! the funnel calculators against it or against an explicit table.

use funnel_core::EventTable;
use tracing::debug;

use crate::anomaly::{detect_anomalies, Anomaly};
use crate::cohort::{calculate_cohort_analysis, CohortRow};
use crate::daily::{calculate_daily_metrics, DailyMetrics};
use crate::metrics::FunnelMetrics;
use crate::segments::{analyze_by_segments, SegmentBreakdown};

/// Stateless-per-call funnel engine bound to a dataset snapshot.
///
/// The snapshot is read-only after construction; every operation
/// recomputes from scratch and nothing is cached. Operations also come
/// in `*_for` form for running against a different table without
/// rebinding.
pub struct FunnelAnalyzer {
    snapshot: EventTable,
}

impl FunnelAnalyzer {
    pub fn new(snapshot: EventTable) -> Self {
        debug!(rows = snapshot.len(), "Funnel analyzer bound to snapshot");
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &EventTable {
        &self.snapshot
    }

    /// Stage counts, conversions, and mean inter-stage hours for the
    /// bound snapshot.
    pub fn funnel_metrics(&self) -> FunnelMetrics {
        Self::funnel_metrics_for(&self.snapshot)
    }

    pub fn funnel_metrics_for(table: &EventTable) -> FunnelMetrics {
        FunnelMetrics::calculate(table.rows())
    }

    /// Per-dimension conversion breakdowns for the bound snapshot.
    pub fn segment_analysis(&self) -> Vec<SegmentBreakdown> {
        Self::segment_analysis_for(&self.snapshot)
    }

    pub fn segment_analysis_for(table: &EventTable) -> Vec<SegmentBreakdown> {
        analyze_by_segments(table.rows())
    }

    /// Day-granularity time series for the bound snapshot.
    pub fn daily_metrics(&self) -> Vec<DailyMetrics> {
        Self::daily_metrics_for(&self.snapshot)
    }

    pub fn daily_metrics_for(table: &EventTable) -> Vec<DailyMetrics> {
        calculate_daily_metrics(table.rows())
    }

    /// Anomaly scan over the bound snapshot's daily series.
    pub fn anomalies(&self, threshold: f64) -> Vec<Anomaly> {
        Self::anomalies_for(&self.snapshot, threshold)
    }

    pub fn anomalies_for(table: &EventTable, threshold: f64) -> Vec<Anomaly> {
        detect_anomalies(table.rows(), threshold)
    }

    /// Monthly deposit-retention cohorts for the bound snapshot.
    pub fn cohort_analysis(&self) -> Vec<CohortRow> {
        Self::cohort_analysis_for(&self.snapshot)
    }

    pub fn cohort_analysis_for(table: &EventTable) -> Vec<CohortRow> {
        calculate_cohort_analysis(table.rows())
    }
}
