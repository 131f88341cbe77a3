//! Event table: the immutable dataset snapshot the engine computes
//! over, plus CSV ingestion with schema validation and timestamp
//! normalization.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{FunnelError, FunnelResult};
use crate::types::EventRecord;

/// Columns every input table must carry. Validated once at ingestion;
/// the engine never probes for column presence afterwards.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "user_id",
    "registration_time",
    "deposit_time",
    "first_bet_time",
    "second_deposit_time",
    "traffic_source",
    "country",
    "device",
];

/// An immutable collection of event records. Construction is the only
/// mutation point; every analysis pass reads it as-is.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    rows: Vec<EventRecord>,
}

impl EventTable {
    pub fn new(rows: Vec<EventRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EventRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.rows.iter()
    }

    /// Load a table from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> FunnelResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_csv_reader(file)?;
        debug!(rows = table.len(), path = %path.as_ref().display(), "Loaded event table");
        Ok(table)
    }

    /// Load a table from any CSV source. The header row is checked
    /// against [`REQUIRED_COLUMNS`] before any record is parsed;
    /// unparseable timestamps and blank labels are normalized to
    /// absent, never errors.
    pub fn from_csv_reader(reader: impl Read) -> FunnelResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FunnelError::Schema { missing });
        }

        // Presence of every required column was checked above.
        let index_of = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
        let col_user = index_of("user_id");
        let col_reg = index_of("registration_time");
        let col_dep = index_of("deposit_time");
        let col_bet = index_of("first_bet_time");
        let col_second = index_of("second_deposit_time");
        let col_source = index_of("traffic_source");
        let col_country = index_of("country");
        let col_device = index_of("device");

        let mut rows = Vec::new();
        let mut bad_timestamps = 0usize;
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let mut parse = |raw: &str| -> Option<NaiveDateTime> {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() && !raw.is_empty() {
                    bad_timestamps += 1;
                }
                parsed
            };

            rows.push(EventRecord {
                user_id: field(col_user).to_string(),
                registration_time: parse(field(col_reg)),
                deposit_time: parse(field(col_dep)),
                first_bet_time: parse(field(col_bet)),
                second_deposit_time: parse(field(col_second)),
                traffic_source: parse_label(field(col_source)),
                country: parse_label(field(col_country)),
                device: parse_label(field(col_device)),
            });
        }

        if bad_timestamps > 0 {
            warn!(count = bad_timestamps, "Unparseable timestamps coerced to absent");
        }

        Ok(Self { rows })
    }
}

impl<'a> IntoIterator for &'a EventTable {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Parse a timestamp cell. Accepts RFC 3339, space- or `T`-separated
/// datetimes with optional fractional seconds, and bare dates.
/// Anything else becomes `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

fn parse_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "user_id,registration_time,deposit_time,first_bet_time,second_deposit_time,traffic_source,country,device";

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01 12:30:00").is_some());
        assert!(parse_timestamp("2024-03-01 12:30:00.250").is_some());
        assert!(parse_timestamp("2024-03-01T12:30:00").is_some());
        assert!(parse_timestamp("2024-03-01T12:30:00Z").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not-a-date").is_none());
        assert!(parse_timestamp("03/01/2024").is_none());
    }

    #[test]
    fn test_csv_load_normalizes_missing_values() {
        let csv = format!(
            "{HEADER}\n\
             1,2024-03-01 10:00:00,2024-03-01 12:00:00,,,google_ads,DE,mobile\n\
             2,2024-03-01 11:00:00,garbage,,,,\t,desktop\n"
        );
        let table = EventTable::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.rows()[0].deposit_time.is_some());
        assert!(table.rows()[0].first_bet_time.is_none());
        // Unparseable timestamp coerced to absent, not an error.
        assert!(table.rows()[1].deposit_time.is_none());
        // Blank labels are absent, not empty-string categories.
        assert_eq!(table.rows()[1].traffic_source, None);
        assert_eq!(table.rows()[1].country, None);
        assert_eq!(table.rows()[1].device.as_deref(), Some("desktop"));
    }

    #[test]
    fn test_csv_missing_columns_fail_fast() {
        let csv = "user_id,registration_time,traffic_source\n1,2024-03-01,organic\n";
        let err = EventTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        match err {
            FunnelError::Schema { missing } => {
                assert!(missing.contains(&"deposit_time".to_string()));
                assert!(missing.contains(&"device".to_string()));
                assert_eq!(missing.len(), 5);
            }
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn test_empty_csv_is_empty_table() {
        let table = EventTable::from_csv_reader(format!("{HEADER}\n").as_bytes()).unwrap();
        assert!(table.is_empty());
    }
}
