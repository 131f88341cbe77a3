//! Daily aggregator — groups rows by the calendar day of registration
//! and computes per-day funnel metrics, ascending by date.
//!
//! The anomaly detector consumes this exact series, so detection and
//! trend display always share one grouping definition.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use funnel_core::EventRecord;
use serde::{Deserialize, Serialize};

use crate::metrics::FunnelMetrics;

/// One day of the registration-dated time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub registrations: u64,
    pub deposits: u64,
    pub reg_to_deposit_conv: f64,
    pub overall_conv: f64,
}

/// Build the daily series. Rows without a registration timestamp
/// cannot be dated and are excluded entirely. Output is ordered
/// ascending by date.
pub fn calculate_daily_metrics(rows: &[EventRecord]) -> Vec<DailyMetrics> {
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(reg) = row.registration_time {
            by_date.entry(reg.date()).or_default().push(idx);
        }
    }

    by_date
        .into_iter()
        .map(|(date, members)| {
            let metrics = FunnelMetrics::calculate(members.iter().map(|&i| &rows[i]));
            DailyMetrics {
                date,
                registrations: metrics.counts.registrations,
                deposits: metrics.counts.deposits,
                reg_to_deposit_conv: metrics.conversions.reg_to_deposit,
                overall_conv: metrics.conversions.overall_conversion,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn make_row(reg: Option<NaiveDateTime>, deposited: bool) -> EventRecord {
        EventRecord {
            user_id: "u".into(),
            registration_time: reg,
            deposit_time: deposited.then(|| ts(28, 0)),
            first_bet_time: None,
            second_deposit_time: None,
            traffic_source: None,
            country: None,
            device: None,
        }
    }

    #[test]
    fn test_groups_by_calendar_day_ascending() {
        // Deliberately out of order; same-day rows at different hours.
        let rows = vec![
            make_row(Some(ts(3, 9)), true),
            make_row(Some(ts(1, 23)), false),
            make_row(Some(ts(3, 17)), false),
            make_row(Some(ts(1, 0)), true),
        ];
        let daily = calculate_daily_metrics(&rows);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(daily[1].date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(daily[0].registrations, 2);
        assert_eq!(daily[0].deposits, 1);
        assert_eq!(daily[0].reg_to_deposit_conv, 50.0);
        assert_eq!(daily[1].registrations, 2);
        assert_eq!(daily[1].reg_to_deposit_conv, 50.0);
    }

    #[test]
    fn test_undated_rows_excluded() {
        let rows = vec![make_row(None, true), make_row(Some(ts(2, 0)), true)];
        let daily = calculate_daily_metrics(&rows);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].registrations, 1);
        assert_eq!(daily[0].reg_to_deposit_conv, 100.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(calculate_daily_metrics(&[]).is_empty());
    }
}
