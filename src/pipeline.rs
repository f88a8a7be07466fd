//! Stage runners: each reads its persisted inputs, writes its artifacts and
//! returns a summary for the operator.

use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use crate::events::{ingest_to_store, EventStore, IngestError, IngestReport};
use crate::features::{
    assert_schema_compatible, build_feature_table, read_feature_schema, read_feature_table,
    write_feature_schema, write_feature_table, FeatureBuildConfig, FeatureBuildReport,
    FeatureError, FeatureTable,
};
use crate::model::ModelBundle;
use crate::observability::log_artifact_written;
use crate::predict::{predict_as_of, PredictError, Prediction};
use crate::train::{
    train_and_evaluate, write_calibration_table, write_test_predictions, TrainConfig, TrainError,
    TrainOutcome,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("input artifact {path} does not exist; run the upstream stage first")]
    MissingArtifact { path: String },
    #[error("model bundle {path}: {source}")]
    Bundle {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn run_ingest(paths: &PipelineConfig, raw_path: &Path) -> Result<IngestReport, PipelineError> {
    let store_path = paths.event_store_path();
    let report = ingest_to_store(raw_path, &store_path)?;
    log_artifact_written("ingest", &store_path, Some(report.kept_rows as usize));
    Ok(report)
}

pub fn run_feature_build(
    paths: &PipelineConfig,
    cfg: &FeatureBuildConfig,
) -> Result<(FeatureTable, FeatureBuildReport), PipelineError> {
    let store_path = paths.event_store_path();
    if !store_path.is_file() {
        return Err(PipelineError::MissingArtifact {
            path: store_path.display().to_string(),
        });
    }
    let store = EventStore::open(&store_path)?;
    let events = store.load_all()?;
    let (table, report) = build_feature_table(&events, cfg)?;

    let table_path = paths.feature_table_path();
    write_feature_table(&table_path, &table)?;
    log_artifact_written("features", &table_path, Some(table.rows.len()));

    let schema_path = paths.feature_schema_path();
    write_feature_schema(&schema_path, &table.schema)?;
    log_artifact_written("features", &schema_path, None);

    Ok((table, report))
}

pub fn run_training(paths: &PipelineConfig, cfg: &TrainConfig) -> Result<TrainOutcome, PipelineError> {
    let table = load_feature_table(paths)?;
    let outcome = train_and_evaluate(&table, cfg)?;

    let bundle_path = paths.model_bundle_path();
    outcome
        .bundle
        .save(&bundle_path)
        .map_err(|source| bundle_error(&bundle_path, source))?;
    log_artifact_written("train", &bundle_path, None);

    let calibration_path = paths.calibration_table_path();
    write_calibration_table(&calibration_path, &outcome.calibration)?;
    log_artifact_written("train", &calibration_path, Some(outcome.calibration.len()));

    let predictions_path = paths.test_predictions_path();
    write_test_predictions(&predictions_path, &outcome.test_predictions)?;
    log_artifact_written("train", &predictions_path, Some(outcome.test_predictions.len()));

    Ok(outcome)
}

/// Read-only: scores one day without touching any artifact.
pub fn run_prediction(
    paths: &PipelineConfig,
    as_of: Option<NaiveDate>,
) -> Result<Prediction, PipelineError> {
    let bundle_path = paths.model_bundle_path();
    let bundle =
        ModelBundle::load(&bundle_path).map_err(|source| bundle_error(&bundle_path, source))?;
    let table = load_feature_table(paths)?;
    assert_schema_compatible(
        bundle.feature_schema_version,
        &bundle.feature_schema_fingerprint,
        &table.schema,
    )?;

    info!(
        component = "predict",
        event = "predict.inputs.loaded",
        rows = table.rows.len(),
        fingerprint = %bundle.feature_schema_fingerprint
    );

    Ok(predict_as_of(&bundle, &table, as_of)?)
}

fn load_feature_table(paths: &PipelineConfig) -> Result<FeatureTable, FeatureError> {
    let schema = read_feature_schema(&paths.feature_schema_path())?;
    read_feature_table(&paths.feature_table_path(), &schema)
}

fn bundle_error(path: &Path, source: serde_json::Error) -> PipelineError {
    PipelineError::Bundle {
        path: path.display().to_string(),
        source,
    }
}
