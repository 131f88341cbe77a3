//! Funnel metrics calculator — stage counts, stage-to-stage conversion
//! rates, and mean elapsed time between adjacent stages.

use chrono::NaiveDateTime;
use funnel_core::EventRecord;
use serde::{Deserialize, Serialize};

/// Users reaching each funnel checkpoint. Registrations is the row
/// count; the remaining counts are rows with the respective timestamp
/// present, taken at face value (no containment cross-check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub registrations: u64,
    pub deposits: u64,
    pub first_bets: u64,
    pub second_deposits: u64,
}

/// Adjacent-stage conversion percentages plus the overall conversion
/// relative to registrations. A zero denominator yields 0, never NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageConversions {
    pub reg_to_deposit: f64,
    pub deposit_to_bet: f64,
    pub bet_to_second_deposit: f64,
    pub overall_conversion: f64,
}

/// Mean elapsed hours between adjacent stage pairs, averaged over rows
/// where both endpoints are present. `None` when no row qualifies —
/// distinct from an average that is literally zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub reg_to_deposit: Option<f64>,
    pub deposit_to_bet: Option<f64>,
    pub bet_to_second_deposit: Option<f64>,
}

/// Immutable result of one calculator pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub counts: StageCounts,
    pub conversions: StageConversions,
    pub avg_times_hours: StageTimings,
}

impl FunnelMetrics {
    /// Compute metrics over a set of event records in a single pass.
    ///
    /// Inverted timestamps (later stage before earlier) are not
    /// filtered; they contribute negative hours to the mean, matching
    /// the reference behavior.
    pub fn calculate<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut counts = StageCounts::default();
        let mut reg_to_deposit = DurationMean::default();
        let mut deposit_to_bet = DurationMean::default();
        let mut bet_to_second = DurationMean::default();

        for row in rows {
            counts.registrations += 1;
            if row.deposit_time.is_some() {
                counts.deposits += 1;
            }
            if row.first_bet_time.is_some() {
                counts.first_bets += 1;
            }
            if row.second_deposit_time.is_some() {
                counts.second_deposits += 1;
            }

            reg_to_deposit.add(row.registration_time, row.deposit_time);
            deposit_to_bet.add(row.deposit_time, row.first_bet_time);
            bet_to_second.add(row.first_bet_time, row.second_deposit_time);
        }

        FunnelMetrics {
            counts,
            conversions: StageConversions {
                reg_to_deposit: percentage(counts.deposits, counts.registrations),
                deposit_to_bet: percentage(counts.first_bets, counts.deposits),
                bet_to_second_deposit: percentage(counts.second_deposits, counts.first_bets),
                overall_conversion: percentage(counts.second_deposits, counts.registrations),
            },
            avg_times_hours: StageTimings {
                reg_to_deposit: reg_to_deposit.mean(),
                deposit_to_bet: deposit_to_bet.mean(),
                bet_to_second_deposit: bet_to_second.mean(),
            },
        }
    }
}

/// `numerator / denominator * 100`, with zero denominators defined as 0.
fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64 * 100.0
    } else {
        0.0
    }
}

/// Running mean of inter-stage durations in hours.
#[derive(Default)]
struct DurationMean {
    total_hours: f64,
    samples: u64,
}

impl DurationMean {
    fn add(&mut self, earlier: Option<NaiveDateTime>, later: Option<NaiveDateTime>) {
        if let (Some(earlier), Some(later)) = (earlier, later) {
            self.total_hours += (later - earlier).num_seconds() as f64 / 3600.0;
            self.samples += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.samples > 0 {
            Some(self.total_hours / self.samples as f64)
        } else {
            None
        }
    }
}
