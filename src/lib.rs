//! quakecast core crate.
//!
//! Batch pipeline from a raw earthquake catalog to a next-horizon probability:
//! - ingest: raw CSV/zip catalog into a normalized SQLite event store
//! - features: gap-free daily aggregates, trailing windows and forward labels
//! - train: time-split logistic regression with held-out evaluation
//! - predict: as-of-day scoring against the persisted model bundle

mod artifacts;
mod config;
mod events;
mod features;
mod metrics;
mod model;
mod observability;
mod pipeline;
mod predict;
mod train;

pub use artifacts::{read_json, write_atomic, write_json};
pub use config::{
    as_of_from_env, feature_config_from_env, parse_day, parse_lookbacks,
    pipeline_config_from_env, train_config_from_env, ConfigError, PipelineConfig, DAY_FORMAT,
};
pub use events::{
    format_time_ms, ingest_to_store, load_raw_events, parse_event_time, parse_raw_events, Event,
    EventStore, IngestError, IngestReport, RawEventLoad, EARTHQUAKE_TYPE, REQUIRED_FIELDS,
};
pub use features::{
    assert_schema_compatible, build_daily_aggregates, build_feature_schema, build_feature_table,
    read_feature_schema, read_feature_table, validate_config, write_feature_schema,
    write_feature_table, DailyAggregate, FeatureBuildConfig, FeatureBuildReport, FeatureColumn,
    FeatureDType, FeatureError, FeatureRow, FeatureSchema, FeatureTable, WindowAggregate,
    FEATURE_SCHEMA_VERSION,
};
pub use metrics::{
    brier_score, calibration_curve, classification_report, roc_auc, CalibrationBin,
    ClassMetrics, ClassificationReport, DEFAULT_CALIBRATION_BINS, DEFAULT_DECISION_THRESHOLD,
};
pub use model::{
    feature_vector, ClassifierConfig, LogisticModel, ModelBundle, ModelError, MODEL_FEATURES,
};
pub use observability::{
    init_logging, log_artifact_written, log_job_start, logging_config_from_env, LogFormat,
    LoggingConfig, LoggingInitError,
};
pub use pipeline::{run_feature_build, run_ingest, run_prediction, run_training, PipelineError};
pub use predict::{predict_as_of, PredictError, Prediction};
pub use train::{
    split_by_day, train_and_evaluate, write_calibration_table, write_test_predictions,
    TestPrediction, TrainConfig, TrainError, TrainOutcome,
};
