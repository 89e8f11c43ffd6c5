//! Error types for survey-reach

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Query,
    RosterLoad,
    ModelLoad,
    TemporalParse,
    FeatureContract,
    Inference,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Query => "query",
            Stage::RosterLoad => "roster_load",
            Stage::ModelLoad => "model_load",
            Stage::TemporalParse => "temporal_parse",
            Stage::FeatureContract => "feature_contract",
            Stage::Inference => "inference",
            Stage::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamp value that could not be turned into a minute-of-day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Zero-based data row index (header excluded)
    pub row: usize,
    pub identifier: String,
    pub column: String,
    pub value: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} (identifier {}): column '{}' has unparseable time '{}'",
            self.row, self.identifier, self.column, self.value
        )
    }
}

/// Declared feature names the derived rows do not provide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFeatures {
    pub layout: String,
    pub missing: BTreeSet<String>,
}

impl fmt::Display for MissingFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(String::as_str).collect();
        write!(
            f,
            "layout '{}' requires features not present in derived rows: {{{}}}",
            self.layout,
            names.join(", ")
        )
    }
}

/// Errors that can occur while running the prediction pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query time: {0}")]
    InvalidQuery(String),

    #[error("Failed to load roster: {0}")]
    Load(String),

    #[error("Failed to load classifier: {0}")]
    ModelLoad(String),

    #[error("Timestamp parse error: {0}")]
    Parse(ParseFailure),

    #[error("Missing required features: {0}")]
    MissingFeatures(MissingFeatures),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl PipelineError {
    /// Stage the error was raised in
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Config,
            PipelineError::InvalidQuery(_) => Stage::Query,
            PipelineError::Load(_) => Stage::RosterLoad,
            PipelineError::ModelLoad(_) => Stage::ModelLoad,
            PipelineError::Parse(_) => Stage::TemporalParse,
            PipelineError::MissingFeatures(_) => Stage::FeatureContract,
            PipelineError::Inference(_) => Stage::Inference,
            PipelineError::Export(_) => Stage::Export,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_features_message_lists_sorted_names() {
        let err = PipelineError::MissingFeatures(MissingFeatures {
            layout: "extended-v1".to_string(),
            missing: ["recency_to_query", "active_duration"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        });

        assert_eq!(err.stage(), Stage::FeatureContract);
        assert_eq!(
            err.to_string(),
            "Missing required features: layout 'extended-v1' requires features not present in \
             derived rows: {active_duration, recency_to_query}"
        );
    }

    #[test]
    fn test_parse_failure_names_row_and_column() {
        let err = PipelineError::Parse(ParseFailure {
            row: 4,
            identifier: "1234567890".to_string(),
            column: "Login Time".to_string(),
            value: "25:99".to_string(),
        });

        assert_eq!(err.stage(), Stage::TemporalParse);
        let msg = err.to_string();
        assert!(msg.contains("row 4"));
        assert!(msg.contains("Login Time"));
        assert!(msg.contains("25:99"));
    }
}
