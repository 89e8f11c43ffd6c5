//! Feature contract
//!
//! A classifier is only meaningful when it is fed the exact feature columns, in
//! the exact order, it was trained on. `FeatureLayout` is that declaration; it
//! travels with the classifier artifact and is checked against the derived rows
//! before any inference happens.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MissingFeatures, PipelineError};
use crate::features::FeatureName;
use crate::types::DerivedFeatureRow;

/// Declared, ordered feature names a classifier expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    /// Layout identifier, e.g. "extended"
    pub name: String,
    /// Bumped whenever the feature list or its order changes
    pub version: u32,
    /// Feature names in training column order
    pub features: Vec<String>,
}

impl FeatureLayout {
    pub fn new(name: impl Into<String>, version: u32, features: &[FeatureName]) -> Self {
        Self {
            name: name.into(),
            version,
            features: features.iter().map(|f| f.as_str().to_string()).collect(),
        }
    }

    /// Login, logout, usage, attempts, query time
    pub fn narrow() -> Self {
        Self::new(
            "narrow",
            1,
            &[
                FeatureName::LoginMinutes,
                FeatureName::LogoutMinutes,
                FeatureName::UsageMinutes,
                FeatureName::SurveyAttempts,
                FeatureName::QueryMinutes,
            ],
        )
    }

    /// Login, logout, usage, attempts, active duration, overlap flag, recency
    pub fn extended() -> Self {
        Self::new(
            "extended",
            1,
            &[
                FeatureName::LoginMinutes,
                FeatureName::LogoutMinutes,
                FeatureName::UsageMinutes,
                FeatureName::SurveyAttempts,
                FeatureName::ActiveDuration,
                FeatureName::OverlapWithQuery,
                FeatureName::RecencyToQuery,
            ],
        )
    }

    /// Stock layouts shipped with the crate
    pub fn stock() -> Vec<Self> {
        vec![Self::narrow(), Self::extended()]
    }

    pub fn width(&self) -> usize {
        self.features.len()
    }

    /// "name@vN", used in logs and reports
    pub fn label(&self) -> String {
        format!("{}@v{}", self.name, self.version)
    }

    /// Structural checks that do not depend on any data: non-empty, no duplicates.
    pub fn check(&self) -> Result<(), String> {
        if self.features.is_empty() {
            return Err(format!("layout '{}' declares no features", self.label()));
        }
        let mut seen = HashSet::new();
        for name in &self.features {
            // Legacy and canonical spellings of one feature count as the same column
            let key = FeatureName::lookup(name).map_or(name.as_str(), |f| f.as_str());
            if !seen.insert(key) {
                return Err(format!(
                    "layout '{}' declares feature '{name}' more than once",
                    self.label()
                ));
            }
        }
        Ok(())
    }
}

/// Check the declared layout against a set of available feature columns.
///
/// Returns the resolved features in declared order, or the exact set of
/// declared names that are not available.
pub fn validate_columns(
    available: &BTreeSet<FeatureName>,
    layout: &FeatureLayout,
) -> Result<Vec<FeatureName>, PipelineError> {
    let mut resolved = Vec::with_capacity(layout.width());
    let mut missing = BTreeSet::new();

    for declared in &layout.features {
        match FeatureName::lookup(declared).filter(|f| available.contains(f)) {
            Some(feature) => resolved.push(feature),
            None => {
                missing.insert(declared.clone());
            }
        }
    }

    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(PipelineError::MissingFeatures(MissingFeatures {
            layout: layout.label(),
            missing,
        }))
    }
}

/// Check the declared layout against the columns derived rows expose.
pub fn validate(
    _rows: &[DerivedFeatureRow],
    layout: &FeatureLayout,
) -> Result<Vec<FeatureName>, PipelineError> {
    // Every derived row carries the same columns, so the check is per-schema
    let available: BTreeSet<FeatureName> = DerivedFeatureRow::feature_names().collect();
    validate_columns(&available, layout)
}
