//! As-of-day scoring against a trained bundle.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::features::FeatureTable;
use crate::model::{ModelBundle, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub day: NaiveDate,
    /// Probability of at least one target event in the `horizon_days` days
    /// after `day`.
    pub probability: f64,
    pub target_mag: f64,
    pub horizon_days: u32,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("feature table is empty")]
    EmptyTable,
    #[error("no feature row for {day}")]
    RowNotFound { day: NaiveDate },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Scores the row for `as_of`, or the table's last day when none is given.
pub fn predict_as_of(
    bundle: &ModelBundle,
    table: &FeatureTable,
    as_of: Option<NaiveDate>,
) -> Result<Prediction, PredictError> {
    let day = match as_of {
        Some(day) => day,
        None => table.last_day().ok_or(PredictError::EmptyTable)?,
    };
    let row = table
        .row_for_day(day)
        .ok_or(PredictError::RowNotFound { day })?;

    let probability = bundle.predict_row(row)?;

    info!(
        component = "predict",
        event = "predict.score.finish",
        day = %day,
        probability,
        target_mag = bundle.target_mag,
        horizon_days = bundle.horizon_days
    );

    Ok(Prediction {
        day,
        probability,
        target_mag: bundle.target_mag,
        horizon_days: bundle.horizon_days,
    })
}
