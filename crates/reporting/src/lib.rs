//! Structured funnel reports — stage tables, segment highlights,
//! recommendations, and CSV/JSON export.

pub mod report;

pub use report::{
    FunnelReport, OverviewSection, ReportBuilder, ReportError, ReportOptions, SegmentHighlight,
    StageTableRow,
};
