//! Anomaly detector — scans the daily series for relative conversion
//! swings and registration volume outliers.

use chrono::NaiveDate;
use funnel_core::EventRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::daily::calculate_daily_metrics;

/// Volume outlier detection needs this much history.
const MIN_VOLUME_HISTORY_DAYS: usize = 7;

/// How many sample standard deviations below the mean counts as an
/// abnormally low registration volume.
const VOLUME_STDDEV_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Fell,
    Rose,
}

impl ShiftDirection {
    fn verb(&self) -> &'static str {
        match self {
            ShiftDirection::Fell => "fell",
            ShiftDirection::Rose => "rose",
        }
    }
}

/// A single detected anomaly. Never persisted; purely the output of
/// one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Day-over-day relative change of the deposit conversion rate
    /// beyond the configured threshold. `change_pct` is the absolute
    /// magnitude of the relative change, in percent.
    ConversionShift {
        date: NaiveDate,
        direction: ShiftDirection,
        change_pct: f64,
    },
    /// Daily registration count more than two sample standard
    /// deviations below the series mean.
    VolumeOutlier { date: NaiveDate, registrations: u64 },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::ConversionShift {
                date,
                direction,
                change_pct,
            } => write!(
                f,
                "Deposit conversion {} by {:.1}% ({})",
                direction.verb(),
                change_pct,
                date
            ),
            Anomaly::VolumeOutlier {
                date,
                registrations,
            } => write!(
                f,
                "Abnormally low registration volume: {} ({})",
                registrations, date
            ),
        }
    }
}

/// Detect anomalies over the daily series built from `rows`.
///
/// `threshold` is the relative day-over-day conversion change that
/// counts as a shift, as a fraction (0.5 = 50%). All shift anomalies
/// come first in date order, followed by volume outliers in date
/// order. Fewer than two days of data yields no anomalies.
pub fn detect_anomalies(rows: &[EventRecord], threshold: f64) -> Vec<Anomaly> {
    let daily = calculate_daily_metrics(rows);
    let mut anomalies = Vec::new();

    if daily.len() < 2 {
        return anomalies;
    }

    // Day-over-day conversion shifts. A previous day at exactly zero
    // has no defined relative change and is skipped.
    for pair in daily.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);
        if prev.reg_to_deposit_conv <= 0.0 {
            continue;
        }
        let change =
            (current.reg_to_deposit_conv - prev.reg_to_deposit_conv) / prev.reg_to_deposit_conv;
        if change.abs() > threshold {
            let direction = if change < 0.0 {
                ShiftDirection::Fell
            } else {
                ShiftDirection::Rose
            };
            anomalies.push(Anomaly::ConversionShift {
                date: current.date,
                direction,
                change_pct: change.abs() * 100.0,
            });
        }
    }

    // Registration volume outliers, only with enough history. A
    // uniform series has zero stddev and can never trigger (strict <).
    if daily.len() >= MIN_VOLUME_HISTORY_DAYS {
        let counts: Vec<f64> = daily.iter().map(|d| d.registrations as f64).collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>()
            / (counts.len() - 1) as f64;
        let stddev = variance.sqrt();
        let floor = mean - VOLUME_STDDEV_MULTIPLIER * stddev;

        for day in &daily {
            if (day.registrations as f64) < floor {
                anomalies.push(Anomaly::VolumeOutlier {
                    date: day.date,
                    registrations: day.registrations,
                });
            }
        }
    }

    debug!(
        days = daily.len(),
        anomalies = anomalies.len(),
        threshold,
        "Anomaly detection pass complete"
    );

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Duration};

    fn day_ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Build `registrations` rows on the given day, of which
    /// `deposits` carry a deposit timestamp.
    fn make_day(day: u32, registrations: usize, deposits: usize) -> Vec<EventRecord> {
        (0..registrations)
            .map(|i| EventRecord {
                user_id: format!("u{day}-{i}"),
                registration_time: Some(day_ts(day)),
                deposit_time: (i < deposits).then(|| day_ts(day) + Duration::hours(1)),
                first_bet_time: None,
                second_deposit_time: None,
                traffic_source: None,
                country: None,
                device: None,
            })
            .collect()
    }

    #[test]
    fn test_conversion_fell_shift() {
        // Day 1: 50% conversion, day 2: 10% — an 80% relative fall.
        let mut rows = make_day(1, 10, 5);
        rows.extend(make_day(2, 10, 1));

        let anomalies = detect_anomalies(&rows, 0.5);
        assert_eq!(anomalies.len(), 1);
        match &anomalies[0] {
            Anomaly::ConversionShift {
                date,
                direction,
                change_pct,
            } => {
                assert_eq!(*date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
                assert_eq!(*direction, ShiftDirection::Fell);
                assert!((change_pct - 80.0).abs() < 1e-9);
            }
            other => panic!("expected conversion shift, got {other:?}"),
        }
        assert_eq!(
            anomalies[0].to_string(),
            "Deposit conversion fell by 80.0% (2024-03-02)"
        );
    }

    #[test]
    fn test_previous_day_zero_is_skipped() {
        // 0% → 50% is a large absolute jump but has no relative
        // change from zero; the pair must be skipped silently.
        let mut rows = make_day(1, 10, 0);
        rows.extend(make_day(2, 10, 5));

        assert!(detect_anomalies(&rows, 0.5).is_empty());
    }

    #[test]
    fn test_rise_beyond_threshold() {
        let mut rows = make_day(1, 10, 2);
        rows.extend(make_day(2, 10, 5));

        let anomalies = detect_anomalies(&rows, 0.5);
        assert_eq!(anomalies.len(), 1);
        assert!(matches!(
            anomalies[0],
            Anomaly::ConversionShift {
                direction: ShiftDirection::Rose,
                ..
            }
        ));
    }

    #[test]
    fn test_change_at_threshold_not_flagged() {
        // Exactly ±50% is not strictly greater than the threshold.
        let mut rows = make_day(1, 10, 4);
        rows.extend(make_day(2, 10, 2));

        assert!(detect_anomalies(&rows, 0.5).is_empty());
    }

    #[test]
    fn test_single_day_no_anomalies() {
        let rows = make_day(1, 10, 1);
        assert!(detect_anomalies(&rows, 0.1).is_empty());
    }

    #[test]
    fn test_volume_outlier_needs_seven_days() {
        // Six steady days plus one collapsed day reaches the 7-day
        // minimum; the same shape over six days must not.
        let mut rows = Vec::new();
        for day in 1..=6 {
            rows.extend(make_day(day, 100, 50));
        }
        rows.extend(make_day(7, 2, 1));

        let anomalies = detect_anomalies(&rows, 10.0);
        let outliers: Vec<_> = anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::VolumeOutlier { .. }))
            .collect();
        assert_eq!(outliers.len(), 1);
        assert_eq!(
            outliers[0].to_string(),
            "Abnormally low registration volume: 2 (2024-03-07)"
        );

        // With only six days the volume check is skipped entirely.
        let mut short_rows = Vec::new();
        for day in 1..=5 {
            short_rows.extend(make_day(day, 100, 50));
        }
        short_rows.extend(make_day(6, 2, 1));
        let short = detect_anomalies(&short_rows, 10.0);
        assert!(short
            .iter()
            .all(|a| !matches!(a, Anomaly::VolumeOutlier { .. })));
    }

    #[test]
    fn test_uniform_series_never_triggers_volume_outlier() {
        let mut rows = Vec::new();
        for day in 1..=8 {
            rows.extend(make_day(day, 50, 25));
        }
        assert!(detect_anomalies(&rows, 10.0).is_empty());
    }

    #[test]
    fn test_shift_anomalies_precede_volume_anomalies() {
        let mut rows = Vec::new();
        rows.extend(make_day(1, 100, 50));
        rows.extend(make_day(2, 100, 5)); // 90% fall
        for day in 3..=7 {
            rows.extend(make_day(day, 100, 50));
        }
        rows.extend(make_day(8, 2, 1)); // volume outlier (+ shift on day 3)

        let anomalies = detect_anomalies(&rows, 0.5);
        let first_volume = anomalies
            .iter()
            .position(|a| matches!(a, Anomaly::VolumeOutlier { .. }))
            .unwrap();
        let last_shift = anomalies
            .iter()
            .rposition(|a| matches!(a, Anomaly::ConversionShift { .. }))
            .unwrap();
        assert!(last_shift < first_volume);
    }
}
