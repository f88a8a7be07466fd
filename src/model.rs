//! L2-regularized logistic regression and the persisted model bundle.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::artifacts::{read_json, write_json};
use crate::features::FeatureRow;

/// Model inputs, in column order.
pub const MODEL_FEATURES: [&str; 7] = [
    "count_1d",
    "count_7d",
    "count_30d",
    "maxmag_1d",
    "maxmag_7d",
    "maxmag_30d",
    "mean_depth",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub l2_penalty: f64,
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 5_000,
            l2_penalty: 1e-3,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("invalid classifier config: {0}")]
    InvalidConfig(String),
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("training labels need both classes; got {positives} positive and {negatives} negative rows")]
    DegenerateLabels { positives: usize, negatives: usize },
    #[error("row {row} has {found} features, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row} feature {column} is not finite")]
    NonFinite { row: usize, column: usize },
    #[error("feature row {day} has no column {name}")]
    MissingFeature { day: NaiveDate, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_means: Vec<f64>,
    pub feature_scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticModel {
    /// Fits on standardized inputs with deterministic full-batch gradient
    /// descent, starting from the base-rate intercept.
    pub fn fit(x: &[Vec<f64>], y: &[u8], cfg: &ClassifierConfig) -> Result<Self, ModelError> {
        validate_classifier_config(cfg)?;
        if x.is_empty() || y.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ModelError::DimensionMismatch {
                row: x.len().min(y.len()),
                expected: x.len(),
                found: y.len(),
            });
        }

        let dims = x[0].len();
        for (row, values) in x.iter().enumerate() {
            if values.len() != dims {
                return Err(ModelError::DimensionMismatch {
                    row,
                    expected: dims,
                    found: values.len(),
                });
            }
            if let Some(column) = values.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFinite { row, column });
            }
        }

        let positives = y.iter().filter(|label| **label == 1).count();
        let negatives = y.len() - positives;
        if positives == 0 || negatives == 0 {
            return Err(ModelError::DegenerateLabels {
                positives,
                negatives,
            });
        }

        let n = x.len() as f64;
        let (feature_means, feature_scales) = standardization(x, dims);
        let standardized: Vec<Vec<f64>> = x
            .iter()
            .map(|row| standardize(row, &feature_means, &feature_scales))
            .collect();

        let base_rate = positives as f64 / n;
        let mut intercept = (base_rate / (1.0 - base_rate)).ln();
        let mut weights = vec![0.0; dims];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < cfg.max_iterations {
            iterations += 1;

            let mut grad_w = vec![0.0; dims];
            let mut grad_b = 0.0;
            for (row, label) in standardized.iter().zip(y) {
                let residual = sigmoid(linear(row, &weights, intercept)) - f64::from(*label);
                grad_b += residual;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += residual * v;
                }
            }
            grad_b /= n;
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n + cfg.l2_penalty * w;
            }

            let max_grad = grad_w
                .iter()
                .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));

            intercept -= cfg.learning_rate * grad_b;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= cfg.learning_rate * g;
            }

            if max_grad < cfg.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(
                component = "model",
                event = "model.fit.converged",
                iterations
            );
        }
        info!(
            component = "model",
            event = "model.fit.finish",
            rows = x.len(),
            features = dims,
            positives,
            iterations,
            converged
        );

        Ok(Self {
            feature_means,
            feature_scales,
            weights,
            intercept,
            iterations,
            converged,
        })
    }

    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.weights.len() {
            return Err(ModelError::DimensionMismatch {
                row: 0,
                expected: self.weights.len(),
                found: features.len(),
            });
        }
        if let Some(column) = features.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite { row: 0, column });
        }
        let row = standardize(features, &self.feature_means, &self.feature_scales);
        Ok(sigmoid(linear(&row, &self.weights, self.intercept)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: LogisticModel,
    pub features: Vec<String>,
    pub target_mag: f64,
    pub horizon_days: u32,
    pub test_start: NaiveDate,
    pub feature_min_mag: f64,
    pub lookbacks: Vec<u32>,
    pub feature_schema_version: u32,
    pub feature_schema_fingerprint: String,
}

impl ModelBundle {
    pub fn save(&self, path: &Path) -> Result<(), serde_json::Error> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self, serde_json::Error> {
        read_json(path)
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let values = feature_vector(row, &self.features)?;
        self.model.predict_proba(&values)
    }
}

/// Extracts the named columns from a feature row, in order.
pub fn feature_vector(row: &FeatureRow, names: &[String]) -> Result<Vec<f64>, ModelError> {
    names
        .iter()
        .map(|name| {
            row.feature_value(name)
                .ok_or_else(|| ModelError::MissingFeature {
                    day: row.day,
                    name: name.clone(),
                })
        })
        .collect()
}

fn validate_classifier_config(cfg: &ClassifierConfig) -> Result<(), ModelError> {
    if !(cfg.learning_rate > 0.0 && cfg.learning_rate.is_finite()) {
        return Err(ModelError::InvalidConfig(
            "learning_rate must be a positive finite number".to_string(),
        ));
    }
    if cfg.max_iterations == 0 {
        return Err(ModelError::InvalidConfig(
            "max_iterations must be > 0".to_string(),
        ));
    }
    if !(cfg.l2_penalty >= 0.0 && cfg.l2_penalty.is_finite()) {
        return Err(ModelError::InvalidConfig(
            "l2_penalty must be a non-negative finite number".to_string(),
        ));
    }
    Ok(())
}

fn standardization(x: &[Vec<f64>], dims: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len() as f64;
    let mut means = vec![0.0; dims];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut scales = vec![0.0; dims];
    for row in x {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            let d = v - m;
            *s += d * d;
        }
    }
    for s in &mut scales {
        let std = (*s / n).sqrt();
        // Constant columns pass through centred but unscaled.
        *s = if std > 0.0 { std } else { 1.0 };
    }

    (means, scales)
}

fn standardize(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(scales)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn linear(row: &[f64], weights: &[f64], intercept: f64) -> f64 {
    row.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() + intercept
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
