//! Configuration for the prediction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Default config file looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "survey-reach.json";

/// Main configuration: where the inputs live and how the dataset is laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Roster dataset (CSV)
    pub dataset_path: PathBuf,

    /// Classifier artifact (JSON)
    pub model_path: PathBuf,

    /// Dataset column names
    pub columns: ColumnMapping,

    /// File name offered for the exported result table
    pub export_file_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dummy_npi_data.csv"),
            model_path: PathBuf::from("survey_attendance_model.json"),
            columns: ColumnMapping::default(),
            export_file_name: "likely_respondents.csv".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, PipelineError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Exact (case- and spelling-sensitive) dataset column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub identifier: String,
    pub login_time: String,
    pub logout_time: String,
    pub usage_minutes: String,
    pub survey_attempts: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            identifier: "NPI".to_string(),
            login_time: "Login Time".to_string(),
            logout_time: "Logout Time".to_string(),
            usage_minutes: "Usage Time (mins)".to_string(),
            survey_attempts: "Count of Survey Attempts".to_string(),
        }
    }
}

impl ColumnMapping {
    /// All mapped column names, identifier first.
    pub fn required(&self) -> [&str; 5] {
        [
            self.identifier.as_str(),
            self.login_time.as_str(),
            self.logout_time.as_str(),
            self.usage_minutes.as_str(),
            self.survey_attempts.as_str(),
        ]
    }
}
