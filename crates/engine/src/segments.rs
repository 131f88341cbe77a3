//! Segment analyzer — partitions the event table by each categorical
//! dimension and runs the funnel calculator per partition.

use std::collections::HashMap;

use funnel_core::{EventRecord, SegmentDimension};
use serde::{Deserialize, Serialize};

use crate::metrics::FunnelMetrics;

/// Funnel conversions for one category value within a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub value: String,
    pub users: u64,
    pub reg_to_deposit_conv: f64,
    pub deposit_to_bet_conv: f64,
    pub bet_to_second_deposit_conv: f64,
    pub overall_conv: f64,
}

/// Per-value breakdown of one dimension. Row order is the first-seen
/// order of values in the input; consumers must not rely on it beyond
/// the value ↔ metrics association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
    pub dimension: SegmentDimension,
    pub rows: Vec<SegmentRow>,
}

/// Analyze all three fixed dimensions. Rows with a missing value for a
/// dimension are excluded from that dimension's partitioning (absence
/// is not a category). Empty input yields empty breakdowns.
pub fn analyze_by_segments(rows: &[EventRecord]) -> Vec<SegmentBreakdown> {
    SegmentDimension::ALL
        .iter()
        .map(|&dimension| analyze_dimension(rows, dimension))
        .collect()
}

/// Partition rows by one dimension's value in a single pass and
/// compute funnel metrics per partition.
pub fn analyze_dimension(rows: &[EventRecord], dimension: SegmentDimension) -> SegmentBreakdown {
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let Some(value) = row.dimension_value(dimension) else {
            continue;
        };
        let slot = *group_index.entry(value).or_insert_with(|| {
            groups.push((value, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(idx);
    }

    let breakdown_rows = groups
        .into_iter()
        .map(|(value, members)| {
            let metrics = FunnelMetrics::calculate(members.iter().map(|&i| &rows[i]));
            SegmentRow {
                value: value.to_string(),
                users: members.len() as u64,
                reg_to_deposit_conv: metrics.conversions.reg_to_deposit,
                deposit_to_bet_conv: metrics.conversions.deposit_to_bet,
                bet_to_second_deposit_conv: metrics.conversions.bet_to_second_deposit,
                overall_conv: metrics.conversions.overall_conversion,
            }
        })
        .collect();

    SegmentBreakdown {
        dimension,
        rows: breakdown_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn make_row(source: Option<&str>, deposited: bool) -> EventRecord {
        EventRecord {
            user_id: "u".into(),
            registration_time: Some(ts(0)),
            deposit_time: deposited.then(|| ts(1)),
            first_bet_time: None,
            second_deposit_time: None,
            traffic_source: source.map(String::from),
            country: Some("DE".into()),
            device: Some("mobile".into()),
        }
    }

    #[test]
    fn test_empty_input_yields_empty_breakdowns() {
        let breakdowns = analyze_by_segments(&[]);
        assert_eq!(breakdowns.len(), 3);
        assert!(breakdowns.iter().all(|b| b.rows.is_empty()));
    }

    #[test]
    fn test_single_value_matches_whole_table() {
        let rows = vec![
            make_row(Some("organic"), true),
            make_row(Some("organic"), false),
        ];
        let breakdown = analyze_dimension(&rows, SegmentDimension::TrafficSource);

        assert_eq!(breakdown.rows.len(), 1);
        let row = &breakdown.rows[0];
        let whole = FunnelMetrics::calculate(&rows);
        assert_eq!(row.value, "organic");
        assert_eq!(row.users, 2);
        assert_eq!(row.reg_to_deposit_conv, whole.conversions.reg_to_deposit);
        assert_eq!(row.overall_conv, whole.conversions.overall_conversion);
    }

    #[test]
    fn test_missing_values_excluded_from_partitioning() {
        let rows = vec![
            make_row(Some("organic"), true),
            make_row(None, true),
            make_row(Some("email"), false),
        ];
        let breakdown = analyze_dimension(&rows, SegmentDimension::TrafficSource);

        let values: Vec<&str> = breakdown.rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["organic", "email"]);
        assert_eq!(breakdown.rows[0].users, 1);
        assert_eq!(breakdown.rows[0].reg_to_deposit_conv, 100.0);
        assert_eq!(breakdown.rows[1].reg_to_deposit_conv, 0.0);
    }

    #[test]
    fn test_partition_association_is_correct() {
        let mut rows = Vec::new();
        for _ in 0..4 {
            rows.push(make_row(Some("google_ads"), true));
        }
        for _ in 0..4 {
            rows.push(make_row(Some("tiktok_ads"), false));
        }
        let breakdown = analyze_dimension(&rows, SegmentDimension::TrafficSource);

        let google = breakdown.rows.iter().find(|r| r.value == "google_ads").unwrap();
        let tiktok = breakdown.rows.iter().find(|r| r.value == "tiktok_ads").unwrap();
        assert_eq!(google.reg_to_deposit_conv, 100.0);
        assert_eq!(tiktok.reg_to_deposit_conv, 0.0);
    }
}
