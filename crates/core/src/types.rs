//! Core value types for the conversion funnel: event records, the
//! ordered stage sequence, and the fixed segmentation dimensions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the event table: a single user's lifecycle timestamps
/// plus acquisition attributes.
///
/// A stage was reached iff its timestamp is present. The model does
/// not cross-validate stage containment: a record with a bet time but
/// no deposit time is representable and is counted at face value.
/// Timestamps are assumed non-decreasing across stages when present;
/// this is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub user_id: String,
    pub registration_time: Option<NaiveDateTime>,
    pub deposit_time: Option<NaiveDateTime>,
    pub first_bet_time: Option<NaiveDateTime>,
    pub second_deposit_time: Option<NaiveDateTime>,
    pub traffic_source: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
}

impl EventRecord {
    /// Timestamp for a given stage, if the user reached it.
    pub fn stage_time(&self, stage: FunnelStage) -> Option<NaiveDateTime> {
        match stage {
            FunnelStage::Registration => self.registration_time,
            FunnelStage::Deposit => self.deposit_time,
            FunnelStage::FirstBet => self.first_bet_time,
            FunnelStage::SecondDeposit => self.second_deposit_time,
        }
    }

    /// Value of a categorical attribute, `None` when missing/blank.
    pub fn dimension_value(&self, dimension: SegmentDimension) -> Option<&str> {
        match dimension {
            SegmentDimension::TrafficSource => self.traffic_source.as_deref(),
            SegmentDimension::Country => self.country.as_deref(),
            SegmentDimension::Device => self.device.as_deref(),
        }
    }
}

/// The four ordered funnel checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Registration,
    Deposit,
    FirstBet,
    SecondDeposit,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 4] = [
        FunnelStage::Registration,
        FunnelStage::Deposit,
        FunnelStage::FirstBet,
        FunnelStage::SecondDeposit,
    ];

    /// Display label used in report tables.
    pub fn label(&self) -> &'static str {
        match self {
            FunnelStage::Registration => "Registration",
            FunnelStage::Deposit => "Deposit",
            FunnelStage::FirstBet => "First Bet",
            FunnelStage::SecondDeposit => "Second Deposit",
        }
    }
}

/// The fixed set of segmentation dimensions. Not user-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentDimension {
    TrafficSource,
    Country,
    Device,
}

impl SegmentDimension {
    pub const ALL: [SegmentDimension; 3] = [
        SegmentDimension::TrafficSource,
        SegmentDimension::Country,
        SegmentDimension::Device,
    ];

    /// Column name in the input table.
    pub fn column(&self) -> &'static str {
        match self {
            SegmentDimension::TrafficSource => "traffic_source",
            SegmentDimension::Country => "country",
            SegmentDimension::Device => "device",
        }
    }
}

impl std::fmt::Display for SegmentDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
