//! Wall-clock parsing
//!
//! Converts raw timestamp text into minute-of-day values and resolves roster
//! records into roster rows. The date portion of a timestamp and any UTC offset
//! are discarded: all inputs are assumed to share one local zone, and no
//! timezone conversion is performed.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ParseFailure, PipelineError};
use crate::types::{MinuteOfDay, RosterRecord, RosterRow};

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%H:%M:%S%.f", "%I:%M %p", "%I:%M:%S %p"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parse a wall-clock timestamp into a minute-of-day. Seconds are truncated.
pub fn parse_minute_of_day(raw: &str) -> Option<MinuteOfDay> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.time())
        })
        // Offset is dropped, not applied
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local().time()))?;

    MinuteOfDay::from_hm(time.hour(), time.minute())
}

/// Resolve the login/logout timestamps of every record.
///
/// Fails on the first unparseable value; no rows are returned in that case.
pub fn resolve_rows(
    records: &[RosterRecord],
    login_column: &str,
    logout_column: &str,
) -> Result<Vec<RosterRow>, PipelineError> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| -> Result<RosterRow, PipelineError> {
            let parse = |column: &str, value: &str| {
                parse_minute_of_day(value).ok_or_else(|| {
                    PipelineError::Parse(ParseFailure {
                        row: idx,
                        identifier: record.identifier.clone(),
                        column: column.to_string(),
                        value: value.to_string(),
                    })
                })
            };

            Ok(RosterRow {
                identifier: record.identifier.clone(),
                login_minutes: parse(login_column, &record.login_time)?,
                logout_minutes: parse(logout_column, &record.logout_time)?,
                usage_minutes: record.usage_minutes,
                survey_attempts: record.survey_attempts,
            })
        })
        .collect()
}

/// Time of day a prediction is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTime(MinuteOfDay);

impl QueryTime {
    pub fn from_minutes(minutes: u32) -> Result<Self, PipelineError> {
        u16::try_from(minutes)
            .ok()
            .and_then(MinuteOfDay::new)
            .map(Self)
            .ok_or_else(|| {
                PipelineError::InvalidQuery(format!("{minutes} minutes is outside 0-1439"))
            })
    }

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, PipelineError> {
        MinuteOfDay::from_hm(hour, minute).map(Self).ok_or_else(|| {
            PipelineError::InvalidQuery(format!("{hour:02}:{minute:02} is not a valid time of day"))
        })
    }

    pub fn minute_of_day(&self) -> MinuteOfDay {
        self.0
    }

    pub fn minutes(&self) -> u16 {
        self.0.get()
    }
}

impl From<MinuteOfDay> for QueryTime {
    fn from(m: MinuteOfDay) -> Self {
        Self(m)
    }
}

impl FromStr for QueryTime {
    type Err = PipelineError;

    /// Accepts `HH:MM` (24-hour) or `H:MM AM/PM`; no date, no timezone.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ["%H:%M", "%I:%M %p"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
            .ok_or_else(|| {
                PipelineError::InvalidQuery(format!("'{s}' is not a time of day (expected HH:MM)"))
            })
            .and_then(|t| Self::from_hm(t.hour(), t.minute()))
    }
}

impl std::fmt::Display for QueryTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(raw: &str) -> Option<u16> {
        parse_minute_of_day(raw).map(|m| m.get())
    }

    #[test]
    fn test_parse_time_only_forms() {
        assert_eq!(minutes("08:30"), Some(510));
        assert_eq!(minutes("08:30:59"), Some(510));
        assert_eq!(minutes("23:59:00.250"), Some(1439));
        assert_eq!(minutes("8:30 PM"), Some(1230));
        assert_eq!(minutes("12:05 AM"), Some(5));
    }

    #[test]
    fn test_parse_ignores_date_portion() {
        assert_eq!(minutes("2024-03-01 08:30:00"), Some(510));
        assert_eq!(minutes("1999-12-31T08:30"), Some(510));
        assert_eq!(minutes("03/01/2024 08:30"), Some(510));
        assert_eq!(minutes("2024-03-01 00:00"), Some(0));
    }

    #[test]
    fn test_parse_spreadsheet_twelve_hour_datetimes() {
        assert_eq!(minutes("03/01/2024 2:15 PM"), Some(855));
        assert_eq!(minutes("03/01/2024 2:15:42 PM"), Some(855));
        assert_eq!(minutes("03/01/2024 12:05:00 AM"), Some(5));
    }

    #[test]
    fn test_parse_does_not_convert_offsets() {
        assert_eq!(minutes("2024-03-01T08:30:00+05:00"), Some(510));
        assert_eq!(minutes("2024-03-01T08:30:00Z"), Some(510));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(minutes(""), None);
        assert_eq!(minutes("25:00"), None);
        assert_eq!(minutes("noon"), None);
        assert_eq!(minutes("2024-03-01"), None);
    }

    #[test]
    fn test_resolve_rows_reports_offending_row() {
        let records = vec![
            RosterRecord {
                identifier: "A".to_string(),
                login_time: "08:00".to_string(),
                logout_time: "10:00".to_string(),
                usage_minutes: 5.0,
                survey_attempts: 1,
            },
            RosterRecord {
                identifier: "B".to_string(),
                login_time: "09:00".to_string(),
                logout_time: "later".to_string(),
                usage_minutes: 5.0,
                survey_attempts: 1,
            },
        ];

        let err = resolve_rows(&records, "Login Time", "Logout Time").unwrap_err();
        match err {
            PipelineError::Parse(failure) => {
                assert_eq!(failure.row, 1);
                assert_eq!(failure.identifier, "B");
                assert_eq!(failure.column, "Logout Time");
                assert_eq!(failure.value, "later");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_rows_keeps_order_and_counters() {
        let records = vec![RosterRecord {
            identifier: "A".to_string(),
            login_time: "2024-03-01 22:00".to_string(),
            logout_time: "2024-03-02 01:30".to_string(),
            usage_minutes: 42.5,
            survey_attempts: 2,
        }];

        let rows = resolve_rows(&records, "in", "out").unwrap();
        assert_eq!(rows[0].login_minutes.get(), 1320);
        assert_eq!(rows[0].logout_minutes.get(), 90);
        assert_eq!(rows[0].usage_minutes, 42.5);
        assert_eq!(rows[0].survey_attempts, 2);
    }

    #[test]
    fn test_query_time_parsing() {
        assert_eq!("08:30".parse::<QueryTime>().unwrap().minutes(), 510);
        assert_eq!("0:00".parse::<QueryTime>().unwrap().minutes(), 0);
        assert_eq!("11:59 PM".parse::<QueryTime>().unwrap().minutes(), 1439);
        assert!(matches!(
            "24:00".parse::<QueryTime>(),
            Err(PipelineError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_query_time_range() {
        assert!(QueryTime::from_minutes(1439).is_ok());
        assert!(QueryTime::from_minutes(1440).is_err());
        assert!(QueryTime::from_hm(7, 60).is_err());
    }
}
