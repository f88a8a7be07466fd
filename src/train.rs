//! Time-ordered train/test split, classifier fit and held-out evaluation.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{csv_bytes, write_atomic};
use crate::config::DAY_FORMAT;
use crate::features::{FeatureRow, FeatureTable};
use crate::metrics::{
    brier_score, calibration_curve, classification_report, roc_auc, CalibrationBin,
    ClassificationReport, DEFAULT_CALIBRATION_BINS, DEFAULT_DECISION_THRESHOLD,
};
use crate::model::{
    feature_vector, ClassifierConfig, LogisticModel, ModelBundle, ModelError, MODEL_FEATURES,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// First day of the held-out partition.
    pub test_start: NaiveDate,
    pub classifier: ClassifierConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("feature table has no column {0}")]
    MissingFeature(String),
    #[error("{partition} partition is empty for test start {test_start}")]
    EmptyPartition {
        partition: &'static str,
        test_start: NaiveDate,
    },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPrediction {
    pub day: NaiveDate,
    pub label: u8,
    pub predicted_probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub bundle: ModelBundle,
    pub train_rows: usize,
    pub test_rows: usize,
    pub roc_auc: Option<f64>,
    pub brier_score: f64,
    pub calibration: Vec<CalibrationBin>,
    pub report: ClassificationReport,
    pub test_predictions: Vec<TestPrediction>,
}

/// Splits on the calendar: rows before `test_start` train, the rest test.
/// Input order is preserved.
pub fn split_by_day(rows: &[FeatureRow], test_start: NaiveDate) -> (&[FeatureRow], &[FeatureRow]) {
    let idx = rows.partition_point(|row| row.day < test_start);
    rows.split_at(idx)
}

pub fn train_and_evaluate(table: &FeatureTable, cfg: &TrainConfig) -> Result<TrainOutcome, TrainError> {
    let columns = table.schema.column_names();
    if let Some(missing) = MODEL_FEATURES.iter().find(|name| !columns.contains(*name)) {
        return Err(TrainError::MissingFeature((*missing).to_string()));
    }
    let features: Vec<String> = MODEL_FEATURES.iter().map(|name| name.to_string()).collect();

    let (train, test) = split_by_day(&table.rows, cfg.test_start);
    if train.is_empty() {
        return Err(TrainError::EmptyPartition {
            partition: "train",
            test_start: cfg.test_start,
        });
    }
    if test.is_empty() {
        return Err(TrainError::EmptyPartition {
            partition: "test",
            test_start: cfg.test_start,
        });
    }

    info!(
        component = "train",
        event = "train.fit.start",
        train_rows = train.len(),
        test_rows = test.len(),
        test_start = %cfg.test_start,
        features = features.len()
    );

    let (x_train, y_train) = design_matrix(train, &features)?;
    let model = LogisticModel::fit(&x_train, &y_train, &cfg.classifier)?;
    if !model.converged {
        warn!(
            component = "train",
            event = "train.fit.not_converged",
            iterations = model.iterations
        );
    }

    let (x_test, y_test) = design_matrix(test, &features)?;
    let probabilities = x_test
        .iter()
        .map(|row| model.predict_proba(row))
        .collect::<Result<Vec<f64>, ModelError>>()?;

    let auc = roc_auc(&y_test, &probabilities);
    let brier = brier_score(&y_test, &probabilities).unwrap_or_default();
    let calibration = calibration_curve(&y_test, &probabilities, DEFAULT_CALIBRATION_BINS);
    let report = classification_report(&y_test, &probabilities, DEFAULT_DECISION_THRESHOLD);

    if auc.is_none() {
        warn!(
            component = "train",
            event = "train.eval.auc_undefined",
            test_rows = test.len(),
            "test partition holds a single class"
        );
    }

    let test_predictions = test
        .iter()
        .zip(&probabilities)
        .map(|(row, p)| TestPrediction {
            day: row.day,
            label: row.label,
            predicted_probability: *p,
        })
        .collect();

    let params = &table.schema.params;
    let bundle = ModelBundle {
        model,
        features,
        target_mag: params.target_mag,
        horizon_days: params.horizon_days,
        test_start: cfg.test_start,
        feature_min_mag: params.feature_min_mag,
        lookbacks: params.lookbacks.clone(),
        feature_schema_version: table.schema.version,
        feature_schema_fingerprint: table.schema.fingerprint.clone(),
    };

    info!(
        component = "train",
        event = "train.fit.finish",
        train_rows = train.len(),
        test_rows = test.len(),
        roc_auc = ?auc,
        brier_score = brier,
        calibration_bins = calibration.len(),
        accuracy = report.accuracy
    );

    Ok(TrainOutcome {
        bundle,
        train_rows: train.len(),
        test_rows: test.len(),
        roc_auc: auc,
        brier_score: brier,
        calibration,
        report,
        test_predictions,
    })
}

pub fn write_calibration_table(path: &Path, bins: &[CalibrationBin]) -> Result<(), TrainError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["mean_predicted_probability", "observed_positive_fraction"])?;
    for bin in bins {
        writer.write_record([
            bin.mean_predicted_probability.to_string(),
            bin.observed_positive_fraction.to_string(),
        ])?;
    }
    write_atomic(path, &csv_bytes(writer)?)?;
    Ok(())
}

pub fn write_test_predictions(path: &Path, predictions: &[TestPrediction]) -> Result<(), TrainError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["day", "label", "predicted_probability"])?;
    for p in predictions {
        writer.write_record([
            p.day.format(DAY_FORMAT).to_string(),
            p.label.to_string(),
            p.predicted_probability.to_string(),
        ])?;
    }
    write_atomic(path, &csv_bytes(writer)?)?;
    Ok(())
}

fn design_matrix(
    rows: &[FeatureRow],
    features: &[String],
) -> Result<(Vec<Vec<f64>>, Vec<u8>), ModelError> {
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    for row in rows {
        x.push(feature_vector(row, features)?);
        y.push(row.label);
    }
    Ok((x, y))
}
