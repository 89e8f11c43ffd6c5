//! Decision tree ensembles in flat array form
//!
//! Node `i` is a leaf when `feature[i] < 0`; otherwise traversal goes to
//! `left[i]` when `x[feature[i]] <= threshold[i]` and to `right[i]` otherwise.
//! `value[i]` of a leaf is the positive-class probability.

use serde::{Deserialize, Serialize};

use super::{Classifier, FeatureMatrix};
use crate::types::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub value: Vec<f64>,
}

impl DecisionTree {
    pub fn n_nodes(&self) -> usize {
        self.feature.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.feature.iter().filter(|&&f| f < 0).count()
    }

    /// Structural validation. Children must come after their parent, which
    /// rules out cycles and bounds traversal by the node count.
    pub(crate) fn check(&self, width: usize) -> Result<(), String> {
        let n = self.n_nodes();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.threshold.len(),
            self.left.len(),
            self.right.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays have different lengths".to_string());
        }

        for i in 0..n {
            if self.feature[i] < 0 {
                if !(0.0..=1.0).contains(&self.value[i]) {
                    return Err(format!("leaf {i} value {} is outside 0-1", self.value[i]));
                }
                continue;
            }
            if self.feature[i] as usize >= width {
                return Err(format!(
                    "node {i} splits on feature {} but layout has {width}",
                    self.feature[i]
                ));
            }
            if !self.threshold[i].is_finite() {
                return Err(format!("node {i} has a non-finite threshold"));
            }
            for child in [self.left[i], self.right[i]] {
                if child <= i as i64 || child as usize >= n {
                    return Err(format!("node {i} has invalid child {child}"));
                }
            }
        }
        Ok(())
    }

    /// Positive-class probability for one feature vector.
    ///
    /// `None` when traversal leaves the arrays or the feature vector, or does
    /// not reach a leaf within `n_nodes` steps.
    pub fn leaf_value(&self, features: &[f64]) -> Option<f64> {
        let mut node = 0usize;
        for _ in 0..self.n_nodes() {
            let feature = *self.feature.get(node)?;
            if feature < 0 {
                return self.value.get(node).copied();
            }
            let x = *features.get(usize::try_from(feature).ok()?)?;
            let child = if x <= *self.threshold.get(node)? {
                self.left.get(node)
            } else {
                self.right.get(node)
            };
            node = usize::try_from(*child?).ok()?;
        }
        None
    }
}

/// Averaged trees: positive iff mean leaf probability `> 0.5`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub(crate) fn check(&self, width: usize) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.check(width).map_err(|e| format!("tree {idx}: {e}"))?;
        }
        Ok(())
    }

    pub fn probability(&self, features: &[f64]) -> Option<f64> {
        if self.trees.is_empty() {
            return None;
        }
        let total = self
            .trees
            .iter()
            .map(|t| t.leaf_value(features))
            .sum::<Option<f64>>()?;
        Some(total / self.trees.len() as f64)
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, String> {
        self.check(matrix.width())?;
        matrix
            .rows()
            .enumerate()
            .map(|(idx, row)| {
                self.probability(row)
                    .map(|p| Label::from(p > 0.5))
                    .ok_or_else(|| format!("row {idx}: tree traversal did not reach a leaf"))
            })
            .collect()
    }
}
