//! Trained-model loading and inference.
//!
//! Models arrive as JSON documents exported by the training pipeline. The
//! document's `model_type` picks the concrete loader; everything else the
//! service needs (the ordered feature list, the parameters) is inside the
//! document, so swapping models never requires a code change.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model document: {0}")]
    Invalid(String),
    #[error("unknown model type '{0}'")]
    UnknownType(String),
    #[error("feature vector has {got} values, model expects {expected}")]
    FeatureCount { expected: usize, got: usize },
    #[error("prediction failed: {0}")]
    Failed(String),
}

/// The model boundary: one fixed-signature prediction per forecast step.
///
/// `feature_names` is the ordered list the model was trained on; callers
/// build each feature vector in exactly that order.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
    fn name(&self) -> &str;
    fn feature_names(&self) -> &[String];
}

#[derive(Debug, Deserialize)]
struct ModelEnvelope {
    model_type: String,
}

/// Load a trained model document from disk, dispatching on `model_type`.
pub fn load_model(path: &Path) -> Result<Box<dyn Predictor>, ModelError> {
    let content = fs::read_to_string(path).map_err(|source| ModelError::Read {
        path: path.display().to_string(),
        source,
    })?;
    load_model_str(&content)
}

/// Parse a model document from its JSON text.
pub fn load_model_str(json: &str) -> Result<Box<dyn Predictor>, ModelError> {
    let envelope: ModelEnvelope = serde_json::from_str(json)?;
    match envelope.model_type.as_str() {
        "linear_regression" => Ok(Box::new(LinearRegressor::from_json_str(json)?)),
        "gradient_boosted" => Ok(Box::new(GradientBoostedRegressor::from_json_str(json)?)),
        other => Err(ModelError::UnknownType(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct LinearRegressorJson {
    model_name: String,
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Linear regression export: `dot(coefficients, x) + intercept`.
#[derive(Debug)]
pub struct LinearRegressor {
    name: String,
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let parsed: LinearRegressorJson = serde_json::from_str(json)?;
        if parsed.feature_names.is_empty() {
            return Err(ModelError::Invalid("model declares no features".into()));
        }
        if parsed.coefficients.len() != parsed.feature_names.len() {
            return Err(ModelError::Invalid(format!(
                "{} coefficients for {} feature names",
                parsed.coefficients.len(),
                parsed.feature_names.len()
            )));
        }
        if !parsed.intercept.is_finite() || parsed.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid(
                "coefficients and intercept must be finite".into(),
            ));
        }
        Ok(Self {
            name: parsed.model_name,
            feature_names: parsed.feature_names,
            coefficients: parsed.coefficients,
            intercept: parsed.intercept,
        })
    }
}

impl Predictor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::FeatureCount {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum();
        Ok(dot + self.intercept)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// One node of a regression tree. `feature == -1` marks a leaf; internal
/// nodes route on `threshold` with missing (NaN) values going left.
#[derive(Debug, Clone, Deserialize)]
struct TreeNode {
    feature: i32,
    threshold: f64,
    left: i32,
    right: i32,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Deserialize)]
struct GradientBoostedJson {
    model_name: String,
    feature_names: Vec<String>,
    n_estimators: usize,
    learning_rate: f64,
    base_score: f64,
    trees: Vec<TreeJson>,
}

/// Gradient-boosted regression trees export.
///
/// A prediction is `base_score + learning_rate * sum(leaf_i(x))`, the
/// convention the training pipeline's exporter writes tree values in.
#[derive(Debug)]
pub struct GradientBoostedRegressor {
    name: String,
    feature_names: Vec<String>,
    learning_rate: f64,
    base_score: f64,
    trees: Vec<Vec<TreeNode>>,
}

impl GradientBoostedRegressor {
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let parsed: GradientBoostedJson = serde_json::from_str(json)?;
        if parsed.feature_names.is_empty() {
            return Err(ModelError::Invalid("model declares no features".into()));
        }
        if parsed.trees.is_empty() || parsed.trees.len() != parsed.n_estimators {
            return Err(ModelError::Invalid(format!(
                "n_estimators is {} but the document holds {} trees",
                parsed.n_estimators,
                parsed.trees.len()
            )));
        }
        if !(parsed.learning_rate > 0.0 && parsed.learning_rate <= 1.0) {
            return Err(ModelError::Invalid(format!(
                "learning_rate {} outside (0, 1]",
                parsed.learning_rate
            )));
        }
        if !parsed.base_score.is_finite() {
            return Err(ModelError::Invalid("base_score must be finite".into()));
        }
        for (tree_idx, tree) in parsed.trees.iter().enumerate() {
            validate_tree(tree_idx, &tree.nodes, parsed.feature_names.len())?;
        }
        Ok(Self {
            name: parsed.model_name,
            feature_names: parsed.feature_names,
            learning_rate: parsed.learning_rate,
            base_score: parsed.base_score,
            trees: parsed.trees.into_iter().map(|t| t.nodes).collect(),
        })
    }
}

/// Node indices must stay in range and point strictly forward, so a walk
/// from the root always terminates at a leaf.
fn validate_tree(tree_idx: usize, nodes: &[TreeNode], n_features: usize) -> Result<(), ModelError> {
    if nodes.is_empty() {
        return Err(ModelError::Invalid(format!("tree {tree_idx} has no nodes")));
    }
    for (i, node) in nodes.iter().enumerate() {
        if node.feature < 0 {
            if node.value.is_none() {
                return Err(ModelError::Invalid(format!(
                    "tree {tree_idx} node {i}: leaf without a value"
                )));
            }
            continue;
        }
        if node.feature as usize >= n_features {
            return Err(ModelError::Invalid(format!(
                "tree {tree_idx} node {i}: feature index {} out of range",
                node.feature
            )));
        }
        for child in [node.left, node.right] {
            if child <= i as i32 || child as usize >= nodes.len() {
                return Err(ModelError::Invalid(format!(
                    "tree {tree_idx} node {i}: child index {child} out of range"
                )));
            }
        }
    }
    Ok(())
}

/// Walk one tree to a leaf. Indices were validated at load time.
fn traverse(nodes: &[TreeNode], features: &[f64]) -> f64 {
    let mut idx = 0usize;
    loop {
        let node = &nodes[idx];
        if node.feature < 0 {
            return node.value.unwrap_or(0.0);
        }
        let x = features[node.feature as usize];
        idx = if x.is_nan() || x <= node.threshold {
            node.left as usize
        } else {
            node.right as usize
        };
    }
}

impl Predictor for GradientBoostedRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.feature_names.len() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_names.len(),
                got: features.len(),
            });
        }
        let boosted: f64 = self.trees.iter().map(|t| traverse(t, features)).sum();
        Ok(self.base_score + self.learning_rate * boosted)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
