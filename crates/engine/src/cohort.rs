//! Cohort analysis — monthly registration cohorts with cumulative
//! deposit retention over a fixed horizon.

use chrono::Datelike;
use funnel_core::EventRecord;
use serde::{Deserialize, Serialize};

/// Number of monthly periods tracked per cohort.
const COHORT_PERIODS: u32 = 6;

/// One cohort × period cell: how many of the cohort's users had
/// deposited by the end of `period` months after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// Registration month, formatted `YYYY-MM`.
    pub cohort: String,
    pub period: u32,
    pub users: u64,
    pub retained: u64,
    pub retention_rate: f64,
}

/// Months since year zero; lets cohort arithmetic ignore year rollover.
fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

/// Build the cohort table. Rows without a registration timestamp are
/// excluded. Output is ordered by cohort month, then period. Retention
/// is cumulative: a user deposited at or before the target month stays
/// retained in every later period.
pub fn calculate_cohort_analysis(rows: &[EventRecord]) -> Vec<CohortRow> {
    // (month index, deposit month index) per datable row.
    let mut dated: Vec<(i32, Option<i32>)> = Vec::new();
    for row in rows {
        let Some(reg) = row.registration_time else {
            continue;
        };
        let reg_month = month_index(reg.year(), reg.month());
        let deposit_month = row
            .deposit_time
            .map(|d| month_index(d.year(), d.month()));
        dated.push((reg_month, deposit_month));
    }

    let mut cohort_months: Vec<i32> = dated.iter().map(|(m, _)| *m).collect();
    cohort_months.sort_unstable();
    cohort_months.dedup();

    let mut out = Vec::new();
    for cohort_month in cohort_months {
        let members: Vec<&(i32, Option<i32>)> =
            dated.iter().filter(|(m, _)| *m == cohort_month).collect();
        let users = members.len() as u64;

        for period in 0..COHORT_PERIODS {
            let target_month = cohort_month + period as i32;
            let retained = members
                .iter()
                .filter(|(_, dep)| dep.is_some_and(|d| d <= target_month))
                .count() as u64;

            out.push(CohortRow {
                cohort: format_month(cohort_month),
                period,
                users,
                retained,
                retention_rate: retained as f64 / users as f64 * 100.0,
            });
        }
    }

    out
}

fn format_month(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}
