//! Core data model for funnel analysis — event records, the dataset
//! snapshot with CSV ingestion, configuration, and error types.

pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::{AnomalyConfig, AppConfig, ReportConfig};
pub use error::{FunnelError, FunnelResult};
pub use table::{EventTable, REQUIRED_COLUMNS};
pub use types::{EventRecord, FunnelStage, SegmentDimension};
