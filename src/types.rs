//! Core types for the survey-reach pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw roster records, resolved roster rows, derived feature rows,
//! and classifier labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minutes in one day
pub const MINUTES_PER_DAY: u16 = 1440;

/// Wall-clock time with no date component, as minutes since midnight (0-1439)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    /// Create from minutes since midnight; `None` when outside 0-1439
    pub fn new(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    /// Create from an hour (0-23) and minute (0-59)
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn get(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl TryFrom<u16> for MinuteOfDay {
    type Error = String;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        Self::new(minutes).ok_or_else(|| format!("minute-of-day {minutes} is outside 0-1439"))
    }
}

impl From<MinuteOfDay> for u16 {
    fn from(m: MinuteOfDay) -> Self {
        m.0
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// One roster record as read from the dataset, timestamps still unparsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// Opaque unique key (e.g. an NPI registry number)
    pub identifier: String,
    /// Raw login timestamp text
    pub login_time: String,
    /// Raw logout timestamp text
    pub logout_time: String,
    /// Engagement measure in minutes
    pub usage_minutes: f64,
    /// Number of past survey attempts
    pub survey_attempts: u32,
}

/// One individual's activity record with timestamps resolved to minute-of-day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRow {
    pub identifier: String,
    pub login_minutes: MinuteOfDay,
    /// Not required to exceed `login_minutes`
    pub logout_minutes: MinuteOfDay,
    pub usage_minutes: f64,
    pub survey_attempts: u32,
}

/// Roster row joined with query-relative temporal features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatureRow {
    /// Source roster row
    pub row: RosterRow,
    /// Query time the features were derived against
    pub query_minutes: MinuteOfDay,
    /// logout - login, negative for sessions that cross midnight
    pub active_duration: i32,
    /// 1 iff login <= query <= logout
    pub overlap_with_query: u8,
    /// |login - query|
    pub recency_to_query: u32,
}

/// Binary classifier output for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn is_positive(&self) -> bool {
        matches!(self, Label::Positive)
    }
}

impl From<bool> for Label {
    fn from(positive: bool) -> Self {
        if positive {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}
