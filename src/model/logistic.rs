//! Linear logistic classifier

use serde::{Deserialize, Serialize};

use super::{Classifier, FeatureMatrix};
use crate::types::Label;

/// Logistic regression: positive iff `w·x + b > 0` (probability above 0.5)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub(crate) fn check(&self, width: usize) -> Result<(), String> {
        if self.weights.len() != width {
            return Err(format!(
                "logistic model has {} weights but layout declares {} features",
                self.weights.len(),
                width
            ));
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("logistic model has non-finite coefficients".to_string());
        }
        Ok(())
    }

    pub fn decision(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }

    pub fn probability(&self, features: &[f64]) -> f64 {
        sigmoid(self.decision(features))
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, String> {
        if matrix.width() != self.weights.len() {
            return Err(format!(
                "matrix has {} columns, model expects {}",
                matrix.width(),
                self.weights.len()
            ));
        }
        Ok(matrix
            .rows()
            .map(|row| Label::from(self.decision(row) > 0.0))
            .collect())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
