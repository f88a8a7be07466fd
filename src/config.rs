//! Artifact layout and environment overrides for the batch jobs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::features::FeatureBuildConfig;
use crate::train::TrainConfig;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub raw_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_path: PathBuf::from("data/raw/usgs_events.csv"),
        }
    }
}

impl PipelineConfig {
    pub fn event_store_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("events.sqlite")
    }

    pub fn feature_table_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("features.csv")
    }

    pub fn feature_schema_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("features.schema.json")
    }

    pub fn model_bundle_path(&self) -> PathBuf {
        self.data_dir.join("models").join("model.json")
    }

    pub fn calibration_table_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("calibration_table.csv")
    }

    pub fn test_predictions_path(&self) -> PathBuf {
        self.data_dir.join("processed").join("test_predictions.csv")
    }
}

pub fn pipeline_config_from_env() -> PipelineConfig {
    let mut config = PipelineConfig::default();

    if let Some(dir) = env_text("QUAKECAST_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(raw) = env_text("QUAKECAST_RAW_PATH") {
        config.raw_path = PathBuf::from(raw);
    }

    config
}

/// Threshold overrides are strict: a malformed value is an error, never a
/// silent fallback to the default.
pub fn feature_config_from_env() -> Result<FeatureBuildConfig, ConfigError> {
    let mut config = FeatureBuildConfig::default();

    if let Some(v) = env_parsed::<f64>("QUAKECAST_FEATURE_MIN_MAG")? {
        config.feature_min_mag = v;
    }
    if let Some(v) = env_parsed::<f64>("QUAKECAST_TARGET_MAG")? {
        config.target_mag = v;
    }
    if let Some(v) = env_parsed::<u32>("QUAKECAST_HORIZON_DAYS")? {
        config.horizon_days = v;
    }
    if let Some(raw) = env_text("QUAKECAST_LOOKBACKS") {
        config.lookbacks = parse_lookbacks(&raw).map_err(|reason| ConfigError::InvalidValue {
            key: "QUAKECAST_LOOKBACKS".to_string(),
            value: raw.clone(),
            reason,
        })?;
    }

    Ok(config)
}

pub fn train_config_from_env() -> Result<TrainConfig, ConfigError> {
    let mut config = TrainConfig::default();
    if let Some(day) = env_day("QUAKECAST_TEST_START")? {
        config.test_start = day;
    }
    Ok(config)
}

pub fn as_of_from_env() -> Result<Option<NaiveDate>, ConfigError> {
    env_day("QUAKECAST_AS_OF")
}

pub fn parse_day(key: &str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

pub fn parse_lookbacks(raw: &str) -> Result<Vec<u32>, String> {
    let mut out = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let window = token
            .parse::<u32>()
            .map_err(|err| format!("lookback '{token}': {err}"))?;
        out.push(window);
    }
    if out.is_empty() {
        return Err("at least one lookback window is required".to_string());
    }
    Ok(out)
}

fn env_text(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_text(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: err.to_string(),
            }),
        None => Ok(None),
    }
}

fn env_day(key: &str) -> Result<Option<NaiveDate>, ConfigError> {
    env_text(key).map(|raw| parse_day(key, &raw)).transpose()
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    pub(crate) fn with_env_vars<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        let previous: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| ((*key).to_string(), env::var(key).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let output = f();

        for (key, value) in previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::test_env::with_env_vars;
    use super::*;

    const FEATURE_KEYS: [&str; 4] = [
        "QUAKECAST_FEATURE_MIN_MAG",
        "QUAKECAST_TARGET_MAG",
        "QUAKECAST_HORIZON_DAYS",
        "QUAKECAST_LOOKBACKS",
    ];

    #[test]
    fn feature_defaults_when_env_missing() {
        let vars: Vec<(&str, Option<&str>)> = FEATURE_KEYS.iter().map(|k| (*k, None)).collect();
        let cfg = with_env_vars(&vars, feature_config_from_env).expect("defaults parse");
        assert_eq!(cfg, FeatureBuildConfig::default());
        assert_eq!(cfg.lookbacks, vec![1, 7, 30]);
    }

    #[test]
    fn feature_overrides_are_applied() {
        let cfg = with_env_vars(
            &[
                ("QUAKECAST_FEATURE_MIN_MAG", Some("3.0")),
                ("QUAKECAST_TARGET_MAG", Some("6.5")),
                ("QUAKECAST_HORIZON_DAYS", Some("14")),
                ("QUAKECAST_LOOKBACKS", Some("1, 3,10")),
            ],
            feature_config_from_env,
        )
        .expect("overrides parse");

        assert_eq!(cfg.feature_min_mag, 3.0);
        assert_eq!(cfg.target_mag, 6.5);
        assert_eq!(cfg.horizon_days, 14);
        assert_eq!(cfg.lookbacks, vec![1, 3, 10]);
    }

    #[test]
    fn malformed_threshold_is_an_error() {
        let err = with_env_vars(
            &[
                ("QUAKECAST_FEATURE_MIN_MAG", None),
                ("QUAKECAST_TARGET_MAG", Some("five")),
                ("QUAKECAST_HORIZON_DAYS", None),
                ("QUAKECAST_LOOKBACKS", None),
            ],
            feature_config_from_env,
        )
        .expect_err("bad target must fail");

        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "QUAKECAST_TARGET_MAG");
                assert_eq!(value, "five");
            }
        }
    }

    #[test]
    fn test_start_and_as_of_parse_days() {
        let (train, as_of) = with_env_vars(
            &[
                ("QUAKECAST_TEST_START", Some("2021-06-01")),
                ("QUAKECAST_AS_OF", Some("2023-02-03")),
            ],
            || (train_config_from_env(), as_of_from_env()),
        );

        assert_eq!(
            train.expect("train cfg").test_start,
            NaiveDate::from_ymd_opt(2021, 6, 1).expect("valid date")
        );
        assert_eq!(
            as_of.expect("as-of"),
            NaiveDate::from_ymd_opt(2023, 2, 3)
        );
    }

    #[test]
    fn lookback_list_rejects_garbage_and_empty() {
        assert!(parse_lookbacks("1,x").is_err());
        assert!(parse_lookbacks(" , ").is_err());
        assert_eq!(parse_lookbacks("30").expect("single"), vec![30]);
    }

    #[test]
    fn artifact_paths_hang_off_data_dir() {
        let cfg = PipelineConfig {
            data_dir: PathBuf::from("/tmp/q"),
            raw_path: PathBuf::from("raw.csv"),
        };
        assert_eq!(
            cfg.event_store_path(),
            PathBuf::from("/tmp/q/processed/events.sqlite")
        );
        assert_eq!(cfg.model_bundle_path(), PathBuf::from("/tmp/q/models/model.json"));
    }
}
