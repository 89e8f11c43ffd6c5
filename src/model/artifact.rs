//! Classifier artifact
//!
//! A JSON document carrying the model parameters together with the feature
//! layout the model was trained on:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "layout": { "name": "extended", "version": 1, "features": ["login_minutes", "..."] },
//!   "model": { "kind": "logistic", "weights": [0.1, "..."], "intercept": -2.0 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{LogisticModel, TreeEnsemble};
use crate::contract::FeatureLayout;
use crate::error::PipelineError;

/// Artifact format this build understands
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Model parameters, tagged by backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LogisticModel),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub layout: FeatureLayout,
    pub model: ModelSpec,
}

impl ModelArtifact {
    /// Read and check an artifact file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Parse and check an artifact
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| PipelineError::ModelLoad(format!("Invalid artifact JSON: {e}")))?;
        artifact.check()?;
        Ok(artifact)
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::ModelLoad(e.to_string()))
    }

    /// Version, layout and parameter-shape checks
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PipelineError::ModelLoad(format!(
                "Unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        self.layout.check().map_err(PipelineError::ModelLoad)?;

        let width = self.layout.width();
        match &self.model {
            ModelSpec::Logistic(m) => m.check(width),
            ModelSpec::TreeEnsemble(m) => m.check(width),
        }
        .map_err(PipelineError::ModelLoad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic_json(weights: &str) -> String {
        format!(
            r#"{{
                "format_version": 1,
                "layout": {{
                    "name": "narrow",
                    "version": 1,
                    "features": ["login_minutes", "logout_minutes", "usage_minutes", "survey_attempts", "query_minutes"]
                }},
                "model": {{ "kind": "logistic", "weights": {weights}, "intercept": -1.5 }}
            }}"#
        )
    }

    #[test]
    fn test_load_logistic_artifact() {
        let artifact = ModelArtifact::from_json(&logistic_json("[0.0, 0.0, 0.02, 0.3, 0.0]")).unwrap();
        assert_eq!(artifact.layout, FeatureLayout::narrow());
        assert!(matches!(artifact.model, ModelSpec::Logistic(_)));
    }

    #[test]
    fn test_weight_count_must_match_layout() {
        let err = ModelArtifact::from_json(&logistic_json("[0.1, 0.2]")).unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
        assert!(err.to_string().contains("2 weights"));
    }

    #[test]
    fn test_unknown_format_version_rejected() {
        let json = logistic_json("[0.0, 0.0, 0.0, 0.0, 0.0]").replace(
            "\"format_version\": 1",
            "\"format_version\": 9",
        );
        let err = ModelArtifact::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("format version 9"));
    }

    #[test]
    fn test_tree_ensemble_round_trip() {
        let json = r#"{
            "format_version": 1,
            "layout": { "name": "overlap-only", "version": 1, "features": ["overlap_with_query"] },
            "model": {
                "kind": "tree_ensemble",
                "trees": [{
                    "feature": [0, -1, -1],
                    "threshold": [0.5, 0.0, 0.0],
                    "left": [1, -1, -1],
                    "right": [2, -1, -1],
                    "value": [0.0, 0.0, 1.0]
                }]
            }
        }"#;

        let artifact = ModelArtifact::from_json(json).unwrap();
        let again = ModelArtifact::from_json(&artifact.to_json_pretty().unwrap()).unwrap();
        assert_eq!(artifact, again);
    }

    #[test]
    fn test_garbage_is_model_load_error() {
        assert!(matches!(
            ModelArtifact::from_json("\u{80}PK pickle"),
            Err(PipelineError::ModelLoad(_))
        ));
    }
}
