//! Prediction engine
//!
//! Wraps an opaque pre-trained binary classifier. Rows are projected onto the
//! declared feature layout, in declared order, before the classifier sees them.

mod artifact;
mod logistic;
mod tree;

pub use artifact::{ModelArtifact, ModelSpec, ARTIFACT_FORMAT_VERSION};
pub use logistic::LogisticModel;
pub use tree::{DecisionTree, TreeEnsemble};

use std::path::Path;

use crate::contract::FeatureLayout;
use crate::error::PipelineError;
use crate::features::FeatureName;
use crate::types::{DerivedFeatureRow, Label};

/// Trait for binary classifiers over fixed-width numeric feature vectors
pub trait Classifier: Send + Sync {
    /// Short backend name for logs
    fn kind(&self) -> &'static str;

    /// Label every row of the matrix, in row order
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, String>;
}

/// Row-major feature matrix with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<FeatureName>,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Project rows onto `columns`, in that order.
    pub fn project(
        rows: &[DerivedFeatureRow],
        columns: &[FeatureName],
    ) -> Result<Self, PipelineError> {
        let mut values = Vec::with_capacity(rows.len() * columns.len());
        for (idx, row) in rows.iter().enumerate() {
            for &column in columns {
                let value = row.feature(column);
                if !value.is_finite() {
                    return Err(PipelineError::Inference(format!(
                        "row {idx} (identifier {}): feature '{column}' is not finite",
                        row.identifier()
                    )));
                }
                values.push(value);
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            values,
        })
    }

    /// Build from already-projected vectors. Every row must have exactly one
    /// value per column.
    pub fn from_rows(
        columns: Vec<FeatureName>,
        rows: &[Vec<f64>],
    ) -> Result<Self, PipelineError> {
        let width = columns.len();
        let mut values = Vec::with_capacity(rows.len() * width);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PipelineError::Inference(format!(
                    "row {idx} has {} values, expected {width}",
                    row.len()
                )));
            }
            values.extend_from_slice(row);
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[FeatureName] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            self.values.len() / self.columns.len()
        }
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let width = self.width();
        &self.values[idx * width..(idx + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.width().max(1))
    }
}

/// Classifier plus the feature layout it was trained against
pub struct PredictionEngine {
    classifier: Box<dyn Classifier>,
    layout: FeatureLayout,
}

impl std::fmt::Debug for PredictionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionEngine")
            .field("classifier", &self.classifier.kind())
            .field("layout", &self.layout)
            .finish()
    }
}

impl PredictionEngine {
    pub fn new(classifier: Box<dyn Classifier>, layout: FeatureLayout) -> Self {
        Self { classifier, layout }
    }

    /// Load a classifier artifact from disk
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let artifact = ModelArtifact::load(path)?;
        let engine = Self::from_artifact(artifact);
        tracing::info!(
            path = %path.display(),
            classifier = engine.classifier.kind(),
            layout = %engine.layout.label(),
            "loaded classifier"
        );
        Ok(engine)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        let ModelArtifact { layout, model, .. } = artifact;
        let classifier: Box<dyn Classifier> = match model {
            ModelSpec::Logistic(m) => Box::new(m),
            ModelSpec::TreeEnsemble(m) => Box::new(m),
        };
        Self::new(classifier, layout)
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    /// Label each row using exactly `features`, in that order.
    pub fn predict(
        &self,
        rows: &[DerivedFeatureRow],
        features: &[FeatureName],
    ) -> Result<Vec<Label>, PipelineError> {
        if features.len() != self.layout.width() {
            return Err(PipelineError::Inference(format!(
                "classifier expects {} features, got {}",
                self.layout.width(),
                features.len()
            )));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = FeatureMatrix::project(rows, features)?;
        let labels = self
            .classifier
            .predict(&matrix)
            .map_err(PipelineError::Inference)?;

        if labels.len() != rows.len() {
            return Err(PipelineError::Inference(format!(
                "classifier returned {} labels for {} rows",
                labels.len(),
                rows.len()
            )));
        }

        tracing::debug!(
            rows = rows.len(),
            positive = labels.iter().filter(|l| l.is_positive()).count(),
            "inference complete"
        );
        Ok(labels)
    }
}
