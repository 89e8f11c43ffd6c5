//! Feature derivation
//!
//! This module derives query-relative temporal features from roster rows:
//! - Active duration (logout - login, unclamped)
//! - Overlap of the login window with the query time
//! - Recency of the login to the query time
//!
//! It also defines the catalog of feature names a derived row exposes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::temporal::QueryTime;
use crate::types::{DerivedFeatureRow, RosterRow};

/// Every numeric feature a derived row can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    LoginMinutes,
    LogoutMinutes,
    UsageMinutes,
    SurveyAttempts,
    QueryMinutes,
    ActiveDuration,
    OverlapWithQuery,
    RecencyToQuery,
}

impl FeatureName {
    pub const ALL: [FeatureName; 8] = [
        FeatureName::LoginMinutes,
        FeatureName::LogoutMinutes,
        FeatureName::UsageMinutes,
        FeatureName::SurveyAttempts,
        FeatureName::QueryMinutes,
        FeatureName::ActiveDuration,
        FeatureName::OverlapWithQuery,
        FeatureName::RecencyToQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::LoginMinutes => "login_minutes",
            FeatureName::LogoutMinutes => "logout_minutes",
            FeatureName::UsageMinutes => "usage_minutes",
            FeatureName::SurveyAttempts => "survey_attempts",
            FeatureName::QueryMinutes => "query_minutes",
            FeatureName::ActiveDuration => "active_duration",
            FeatureName::OverlapWithQuery => "overlap_with_query",
            FeatureName::RecencyToQuery => "recency_to_query",
        }
    }

    /// Column names used by models trained on the original survey dataset frame
    fn legacy_name(&self) -> &'static str {
        match self {
            FeatureName::LoginMinutes => "Login_Time_Minutes",
            FeatureName::LogoutMinutes => "Logout_Time_Minutes",
            FeatureName::UsageMinutes => "Usage Time (mins)",
            FeatureName::SurveyAttempts => "Count of Survey Attempts",
            FeatureName::QueryMinutes => "Input_Time_Minutes",
            FeatureName::ActiveDuration => "Active_Duration",
            FeatureName::OverlapWithQuery => "Overlap_With_Input_Time",
            FeatureName::RecencyToQuery => "Time_Since_Last_Login",
        }
    }

    /// Resolve a declared feature name, canonical or legacy spelling
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name || f.legacy_name() == name)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DerivedFeatureRow {
    /// Names of the features every derived row exposes
    pub fn feature_names() -> impl Iterator<Item = FeatureName> {
        FeatureName::ALL.into_iter()
    }

    /// Numeric value of one feature
    pub fn feature(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::LoginMinutes => self.row.login_minutes.get() as f64,
            FeatureName::LogoutMinutes => self.row.logout_minutes.get() as f64,
            FeatureName::UsageMinutes => self.row.usage_minutes,
            FeatureName::SurveyAttempts => self.row.survey_attempts as f64,
            FeatureName::QueryMinutes => self.query_minutes.get() as f64,
            FeatureName::ActiveDuration => self.active_duration as f64,
            FeatureName::OverlapWithQuery => self.overlap_with_query as f64,
            FeatureName::RecencyToQuery => self.recency_to_query as f64,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.row.identifier
    }
}

/// Feature deriver for computing query-relative features
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive features for every row against one query time.
    ///
    /// Each row is computed independently; output order matches input order.
    pub fn derive(rows: &[RosterRow], query: QueryTime) -> Vec<DerivedFeatureRow> {
        rows.iter().map(|row| Self::derive_row(row, query)).collect()
    }

    pub fn derive_row(row: &RosterRow, query: QueryTime) -> DerivedFeatureRow {
        let login = i32::from(row.login_minutes.get());
        let logout = i32::from(row.logout_minutes.get());
        let q = i32::from(query.minutes());

        DerivedFeatureRow {
            row: row.clone(),
            query_minutes: query.minute_of_day(),
            active_duration: compute_active_duration(login, logout),
            overlap_with_query: compute_overlap(login, logout, q),
            recency_to_query: compute_recency(login, q),
        }
    }
}

/// Session length; negative when logout precedes login (no midnight wraparound)
fn compute_active_duration(login: i32, logout: i32) -> i32 {
    logout - login
}

/// 1 when the query falls inside [login, logout], inclusive at both ends
fn compute_overlap(login: i32, logout: i32, query: i32) -> u8 {
    u8::from(login <= query && query <= logout)
}

fn compute_recency(login: i32, query: i32) -> u32 {
    (login - query).unsigned_abs()
}
