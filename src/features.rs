//! Events-to-daily-features transform.
//!
//! The event stream is bucketed into UTC days, reindexed onto a gap-free
//! daily range, and extended with trailing rolling aggregates and a
//! forward-looking label. Rolling state only ever sees the current and
//! earlier days; the label only sees the `horizon_days` days strictly after
//! the row's day, and rows without a complete horizon are cut from the tail.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::Cursor;
use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::artifacts::{csv_bytes, read_json, write_atomic, write_json};
use crate::config::DAY_FORMAT;
use crate::events::Event;

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureDType {
    Date,
    Int,
    Float,
}

impl FeatureDType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub dtype: FeatureDType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fingerprint: String,
    pub params: FeatureBuildConfig,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBuildConfig {
    pub feature_min_mag: f64,
    pub target_mag: f64,
    pub horizon_days: u32,
    pub lookbacks: Vec<u32>,
    pub schema_version: u32,
}

impl Default for FeatureBuildConfig {
    fn default() -> Self {
        Self {
            feature_min_mag: 2.5,
            target_mag: 5.0,
            horizon_days: 7,
            lookbacks: vec![1, 7, 30],
            schema_version: FEATURE_SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub count: u32,
    pub maxmag: f64,
    pub mean_depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAggregate {
    pub window_days: u32,
    pub count: u64,
    pub maxmag: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub day: NaiveDate,
    pub count: u32,
    pub maxmag: f64,
    pub mean_depth: f64,
    /// One entry per configured lookback, in configuration order.
    pub windows: Vec<WindowAggregate>,
    pub is_target_event_today: u8,
    pub label: u8,
}

impl FeatureRow {
    /// Looks up a numeric column by its table name.
    pub fn feature_value(&self, name: &str) -> Option<f64> {
        match name {
            "count" => Some(f64::from(self.count)),
            "maxmag" => Some(self.maxmag),
            "mean_depth" => Some(self.mean_depth),
            "is_target_event_today" => Some(f64::from(self.is_target_event_today)),
            "label" => Some(f64::from(self.label)),
            _ => {
                if let Some(window) = parse_window_column(name, "count_") {
                    self.window(window).map(|w| w.count as f64)
                } else if let Some(window) = parse_window_column(name, "maxmag_") {
                    self.window(window).map(|w| w.maxmag)
                } else {
                    None
                }
            }
        }
    }

    pub fn window(&self, window_days: u32) -> Option<&WindowAggregate> {
        self.windows.iter().find(|w| w.window_days == window_days)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.rows.last().map(|row| row.day)
    }

    pub fn row_for_day(&self, day: NaiveDate) -> Option<&FeatureRow> {
        self.rows
            .binary_search_by_key(&day, |row| row.day)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn positive_rate(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let positives = self.rows.iter().filter(|row| row.label == 1).count();
        positives as f64 / self.rows.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureBuildReport {
    pub input_events: u64,
    pub qualifying_events: u64,
    pub span_days: u64,
    pub filled_days: u64,
    pub truncated_days: u64,
    pub output_rows: u64,
    pub positive_labels: u64,
}

impl FeatureBuildReport {
    pub fn positive_rate(&self) -> f64 {
        if self.output_rows == 0 {
            0.0
        } else {
            self.positive_labels as f64 / self.output_rows as f64
        }
    }
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("invalid feature build config: {0}")]
    InvalidConfig(String),
    #[error("no qualifying events to build a feature table from")]
    EmptyInput,
    #[error(
        "observed span of {span_days} days is not longer than the {horizon_days}-day label horizon"
    )]
    InsufficientSpan { span_days: u64, horizon_days: u32 },
    #[error("invalid UTC timestamp: {0}")]
    InvalidTimestamp(i64),
    #[error("invalid feature table: {0}")]
    InvalidTable(String),
    #[error("schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
    #[error("schema fingerprint mismatch: expected {expected}, got {actual}")]
    SchemaFingerprintMismatch { expected: String, actual: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
struct DayAccumulator {
    count: u32,
    maxmag: f64,
    depth_sum: f64,
    depth_count: u32,
}

impl DayAccumulator {
    fn push(&mut self, event: &Event) {
        self.maxmag = if self.count == 0 {
            event.mag
        } else {
            self.maxmag.max(event.mag)
        };
        self.count += 1;
        if let Some(depth) = event.depth {
            self.depth_sum += depth;
            self.depth_count += 1;
        }
    }

    fn mean_depth(&self) -> f64 {
        if self.depth_count == 0 {
            0.0
        } else {
            self.depth_sum / f64::from(self.depth_count)
        }
    }
}

/// Trailing sum over the last `width` pushed values, current value included.
#[derive(Debug, Clone)]
struct RollingSum {
    width: usize,
    values: VecDeque<u64>,
    sum: u64,
}

impl RollingSum {
    fn new(width: usize) -> Self {
        Self {
            width,
            values: VecDeque::new(),
            sum: 0,
        }
    }

    fn push(&mut self, value: u64) -> u64 {
        self.values.push_back(value);
        self.sum += value;
        while self.values.len() > self.width {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }
        self.sum
    }
}

/// Trailing max over the last `width` pushed values via a monotonic deque.
#[derive(Debug, Clone)]
struct RollingMax<T> {
    width: usize,
    candidates: VecDeque<(usize, T)>,
    pushed: usize,
}

impl<T: PartialOrd + Copy> RollingMax<T> {
    fn new(width: usize) -> Self {
        Self {
            width,
            candidates: VecDeque::new(),
            pushed: 0,
        }
    }

    fn push(&mut self, value: T) -> T {
        let idx = self.pushed;
        self.pushed += 1;

        while matches!(self.candidates.back(), Some((_, back)) if *back <= value) {
            self.candidates.pop_back();
        }
        self.candidates.push_back((idx, value));
        while matches!(self.candidates.front(), Some((front_idx, _)) if front_idx + self.width <= idx)
        {
            self.candidates.pop_front();
        }

        // The just-pushed value is always a candidate, so the deque is non-empty.
        self.candidates.front().map(|(_, v)| *v).unwrap_or(value)
    }
}

pub fn build_feature_schema(cfg: &FeatureBuildConfig) -> FeatureSchema {
    let mut columns = vec![
        column("day", FeatureDType::Date),
        column("count", FeatureDType::Int),
        column("maxmag", FeatureDType::Float),
        column("mean_depth", FeatureDType::Float),
    ];
    for window in &cfg.lookbacks {
        columns.push(column(&format!("count_{window}d"), FeatureDType::Int));
    }
    for window in &cfg.lookbacks {
        columns.push(column(&format!("maxmag_{window}d"), FeatureDType::Float));
    }
    columns.push(column("is_target_event_today", FeatureDType::Int));
    columns.push(column("label", FeatureDType::Int));

    let fingerprint = schema_fingerprint(cfg, &columns);

    info!(
        component = "features",
        event = "features.schema.built",
        version = cfg.schema_version,
        lookbacks = ?cfg.lookbacks,
        column_count = columns.len(),
        fingerprint = fingerprint
    );

    FeatureSchema {
        version: cfg.schema_version,
        fingerprint,
        params: cfg.clone(),
        columns,
    }
}

/// Buckets qualifying events (`mag >= feature_min_mag`) into UTC days and
/// reindexes onto the contiguous range between the first and last such day.
pub fn build_daily_aggregates(
    events: &[Event],
    feature_min_mag: f64,
) -> Result<Vec<DailyAggregate>, FeatureError> {
    let mut by_day: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for event in events {
        // NaN never qualifies.
        if !(event.mag >= feature_min_mag) {
            continue;
        }
        let day = utc_day(event.time_ms_utc)?;
        by_day.entry(day).or_default().push(event);
    }

    let (Some(first), Some(last)) = (
        by_day.keys().next().copied(),
        by_day.keys().next_back().copied(),
    ) else {
        return Err(FeatureError::EmptyInput);
    };

    let empty = DayAccumulator::default();
    let daily = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| {
            let acc = by_day.get(&day).unwrap_or(&empty);
            DailyAggregate {
                day,
                count: acc.count,
                maxmag: if acc.count == 0 { 0.0 } else { acc.maxmag },
                mean_depth: acc.mean_depth(),
            }
        })
        .collect();

    Ok(daily)
}

pub fn build_feature_table(
    events: &[Event],
    cfg: &FeatureBuildConfig,
) -> Result<(FeatureTable, FeatureBuildReport), FeatureError> {
    validate_config(cfg)?;

    info!(
        component = "features",
        event = "features.build.start",
        input_events = events.len(),
        feature_min_mag = cfg.feature_min_mag,
        target_mag = cfg.target_mag,
        horizon_days = cfg.horizon_days,
        lookbacks = ?cfg.lookbacks
    );

    let schema = build_feature_schema(cfg);
    let daily = build_daily_aggregates(events, cfg.feature_min_mag)?;
    let horizon = cfg.horizon_days as usize;
    if daily.len() <= horizon {
        return Err(FeatureError::InsufficientSpan {
            span_days: daily.len() as u64,
            horizon_days: cfg.horizon_days,
        });
    }

    let windows = rolling_windows(&daily, &cfg.lookbacks);
    let is_target: Vec<u8> = daily
        .iter()
        .map(|d| u8::from(d.maxmag >= cfg.target_mag))
        .collect();
    let labels = forward_labels(&is_target, horizon);

    // Keep only days on or before `max_day - horizon_days`.
    let cutoff = daily[daily.len() - 1 - horizon].day;
    let rows: Vec<FeatureRow> = daily
        .iter()
        .zip(windows)
        .zip(is_target.iter().copied())
        .zip(labels)
        .map(|(((agg, windows), is_target), label)| FeatureRow {
            day: agg.day,
            count: agg.count,
            maxmag: agg.maxmag,
            mean_depth: agg.mean_depth,
            windows,
            is_target_event_today: is_target,
            label,
        })
        .collect();
    debug_assert!(rows.last().map(|row| row.day) == Some(cutoff));

    let report = FeatureBuildReport {
        input_events: events.len() as u64,
        qualifying_events: daily.iter().map(|d| u64::from(d.count)).sum(),
        span_days: daily.len() as u64,
        filled_days: daily.iter().filter(|d| d.count == 0).count() as u64,
        truncated_days: (daily.len() - rows.len()) as u64,
        output_rows: rows.len() as u64,
        positive_labels: rows.iter().filter(|row| row.label == 1).count() as u64,
    };

    info!(
        component = "features",
        event = "features.build.finish",
        span_days = report.span_days,
        filled_days = report.filled_days,
        truncated_days = report.truncated_days,
        output_rows = report.output_rows,
        positive_labels = report.positive_labels,
        cutoff_day = %cutoff
    );

    Ok((FeatureTable { schema, rows }, report))
}

pub fn assert_schema_compatible(
    expected_version: u32,
    expected_fingerprint: &str,
    actual: &FeatureSchema,
) -> Result<(), FeatureError> {
    if expected_version != actual.version {
        return Err(FeatureError::SchemaVersionMismatch {
            expected: expected_version,
            actual: actual.version,
        });
    }

    if expected_fingerprint != actual.fingerprint {
        return Err(FeatureError::SchemaFingerprintMismatch {
            expected: expected_fingerprint.to_string(),
            actual: actual.fingerprint.clone(),
        });
    }

    Ok(())
}

pub fn validate_config(cfg: &FeatureBuildConfig) -> Result<(), FeatureError> {
    if !cfg.feature_min_mag.is_finite() || !cfg.target_mag.is_finite() {
        return Err(FeatureError::InvalidConfig(
            "magnitude thresholds must be finite".to_string(),
        ));
    }

    if cfg.horizon_days == 0 {
        return Err(FeatureError::InvalidConfig(
            "horizon_days must be > 0".to_string(),
        ));
    }

    if cfg.schema_version != FEATURE_SCHEMA_VERSION {
        return Err(FeatureError::InvalidConfig(format!(
            "schema_version must equal FEATURE_SCHEMA_VERSION ({FEATURE_SCHEMA_VERSION})"
        )));
    }

    if cfg.lookbacks.is_empty() {
        return Err(FeatureError::InvalidConfig(
            "at least one lookback window is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for window in &cfg.lookbacks {
        if *window == 0 {
            return Err(FeatureError::InvalidConfig(
                "lookbacks entries must be > 0".to_string(),
            ));
        }
        if !seen.insert(*window) {
            return Err(FeatureError::InvalidConfig(
                "lookbacks entries must be unique".to_string(),
            ));
        }
    }

    Ok(())
}

pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<(), FeatureError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.schema.column_names())?;

    let lookbacks = &table.schema.params.lookbacks;
    for row in &table.rows {
        let mut record = Vec::with_capacity(table.schema.columns.len());
        record.push(row.day.format(DAY_FORMAT).to_string());
        record.push(row.count.to_string());
        record.push(row.maxmag.to_string());
        record.push(row.mean_depth.to_string());
        for window in lookbacks {
            let agg = row_window(row, *window)?;
            record.push(agg.count.to_string());
        }
        for window in lookbacks {
            let agg = row_window(row, *window)?;
            record.push(agg.maxmag.to_string());
        }
        record.push(row.is_target_event_today.to_string());
        record.push(row.label.to_string());
        writer.write_record(&record)?;
    }

    write_atomic(path, &csv_bytes(writer)?)?;
    Ok(())
}

/// Reads a feature table back, checking its header against `schema`.
pub fn read_feature_table(path: &Path, schema: &FeatureSchema) -> Result<FeatureTable, FeatureError> {
    let bytes = std::fs::read(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(bytes));

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let expected = schema.column_names();
    if header != expected {
        return Err(FeatureError::InvalidTable(format!(
            "header {header:?} does not match schema columns {expected:?}"
        )));
    }

    let lookbacks = &schema.params.lookbacks;
    let mut rows: Vec<FeatureRow> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let day = NaiveDate::parse_from_str(field(0), DAY_FORMAT)
            .map_err(|err| invalid_cell(line, "day", err))?;
        let mut windows: Vec<WindowAggregate> = Vec::with_capacity(lookbacks.len());
        for (offset, window) in lookbacks.iter().enumerate() {
            let count_idx = 4 + offset;
            let max_idx = 4 + lookbacks.len() + offset;
            windows.push(WindowAggregate {
                window_days: *window,
                count: parse_cell(field(count_idx), line, &header[count_idx])?,
                maxmag: parse_cell(field(max_idx), line, &header[max_idx])?,
            });
        }
        let flags_idx = 4 + 2 * lookbacks.len();

        let row = FeatureRow {
            day,
            count: parse_cell(field(1), line, "count")?,
            maxmag: parse_cell(field(2), line, "maxmag")?,
            mean_depth: parse_cell(field(3), line, "mean_depth")?,
            windows,
            is_target_event_today: parse_cell(field(flags_idx), line, "is_target_event_today")?,
            label: parse_cell(field(flags_idx + 1), line, "label")?,
        };

        if let Some(prev) = rows.last() {
            if row.day <= prev.day {
                return Err(FeatureError::InvalidTable(format!(
                    "day {} at row {line} is not after {}",
                    row.day, prev.day
                )));
            }
        }
        rows.push(row);
    }

    Ok(FeatureTable {
        schema: schema.clone(),
        rows,
    })
}

pub fn write_feature_schema(path: &Path, schema: &FeatureSchema) -> Result<(), FeatureError> {
    write_json(path, schema)?;
    Ok(())
}

pub fn read_feature_schema(path: &Path) -> Result<FeatureSchema, FeatureError> {
    Ok(read_json(path)?)
}

fn rolling_windows(daily: &[DailyAggregate], lookbacks: &[u32]) -> Vec<Vec<WindowAggregate>> {
    let mut sums: Vec<RollingSum> = lookbacks
        .iter()
        .map(|w| RollingSum::new(*w as usize))
        .collect();
    let mut maxima: Vec<RollingMax<f64>> = lookbacks
        .iter()
        .map(|w| RollingMax::new(*w as usize))
        .collect();

    daily
        .iter()
        .map(|agg| {
            lookbacks
                .iter()
                .zip(sums.iter_mut().zip(maxima.iter_mut()))
                .map(|(window, (sum, max))| WindowAggregate {
                    window_days: *window,
                    count: sum.push(u64::from(agg.count)),
                    maxmag: max.push(agg.maxmag),
                })
                .collect()
        })
        .collect()
}

/// `labels[i] = max(is_target[i + 1 ..= i + horizon])`, for every `i` whose
/// horizon lies fully inside the series. A trailing max of width `horizon`
/// evaluated at `i + horizon` covers exactly that window.
fn forward_labels(is_target: &[u8], horizon: usize) -> Vec<u8> {
    let mut window = RollingMax::new(horizon);
    let mut labels = Vec::with_capacity(is_target.len().saturating_sub(horizon));
    for (idx, flag) in is_target.iter().enumerate() {
        let future_max = window.push(*flag);
        if idx >= horizon {
            labels.push(future_max);
        }
    }
    labels
}

fn row_window(row: &FeatureRow, window: u32) -> Result<&WindowAggregate, FeatureError> {
    row.window(window).ok_or_else(|| {
        FeatureError::InvalidTable(format!(
            "row {} has no {window}-day window aggregate",
            row.day
        ))
    })
}

fn parse_window_column(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_suffix('d')?.parse().ok()
}

fn parse_cell<T>(raw: &str, line: usize, column: &str) -> Result<T, FeatureError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|err| invalid_cell(line, column, err))
}

fn invalid_cell(line: usize, column: &str, err: impl std::fmt::Display) -> FeatureError {
    FeatureError::InvalidTable(format!("row {line} column {column}: {err}"))
}

fn utc_day(ts_ms_utc: i64) -> Result<NaiveDate, FeatureError> {
    Utc.timestamp_millis_opt(ts_ms_utc)
        .single()
        .map(|dt| dt.date_naive())
        .ok_or(FeatureError::InvalidTimestamp(ts_ms_utc))
}

fn column(name: &str, dtype: FeatureDType) -> FeatureColumn {
    FeatureColumn {
        name: name.to_string(),
        dtype,
    }
}

fn schema_fingerprint(cfg: &FeatureBuildConfig, columns: &[FeatureColumn]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("version:{};", cfg.schema_version));
    hasher.update(format!("feature_min_mag:{};", cfg.feature_min_mag));
    hasher.update(format!("target_mag:{};", cfg.target_mag));
    hasher.update(format!("horizon_days:{};", cfg.horizon_days));
    hasher.update("lookbacks:");
    for window in &cfg.lookbacks {
        hasher.update(format!("{window},"));
    }
    hasher.update(";columns:");
    for column in columns {
        hasher.update(column.name.as_bytes());
        hasher.update(format!(":{};", column.dtype.as_str()));
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_sum_uses_partial_windows_at_start() {
        let mut sum = RollingSum::new(3);
        let out: Vec<u64> = [1, 2, 3, 4, 0].into_iter().map(|v| sum.push(v)).collect();
        assert_eq!(out, vec![1, 3, 6, 9, 7]);
    }

    #[test]
    fn rolling_sum_wider_than_input_is_prefix_sum() {
        let mut sum = RollingSum::new(u32::MAX as usize);
        let out: Vec<u64> = [2, 0, 5].into_iter().map(|v| sum.push(v)).collect();
        assert_eq!(out, vec![2, 2, 7]);
    }

    #[test]
    fn rolling_max_evicts_values_older_than_width() {
        let mut max = RollingMax::new(2);
        let out: Vec<f64> = [5.0, 1.0, 0.0, 3.0, 2.0]
            .into_iter()
            .map(|v| max.push(v))
            .collect();
        assert_eq!(out, vec![5.0, 5.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn rolling_max_width_one_is_identity() {
        let mut max = RollingMax::new(1);
        let out: Vec<u8> = [0, 1, 0, 0, 1].into_iter().map(|v| max.push(v)).collect();
        assert_eq!(out, vec![0, 1, 0, 0, 1]);
    }

    #[test]
    fn forward_labels_cover_strictly_future_days() {
        // A target on day 0 must not label day 0 itself.
        let labels = forward_labels(&[1, 0, 0, 1, 0, 0], 2);
        assert_eq!(labels, vec![0, 1, 1, 0]);
    }

    #[test]
    fn window_column_names_parse() {
        assert_eq!(parse_window_column("count_30d", "count_"), Some(30));
        assert_eq!(parse_window_column("maxmag_7d", "maxmag_"), Some(7));
        assert_eq!(parse_window_column("count_xd", "count_"), None);
        assert_eq!(parse_window_column("mean_depth", "count_"), None);
    }

    #[test]
    fn config_validation_rejects_bad_lookbacks_and_horizon() {
        let mut cfg = FeatureBuildConfig::default();
        cfg.lookbacks = vec![1, 7, 7];
        assert!(matches!(
            validate_config(&cfg),
            Err(FeatureError::InvalidConfig(_))
        ));

        cfg.lookbacks = vec![0];
        assert!(validate_config(&cfg).is_err());

        cfg.lookbacks = Vec::new();
        assert!(validate_config(&cfg).is_err());

        let cfg = FeatureBuildConfig {
            horizon_days: 0,
            ..FeatureBuildConfig::default()
        };
        assert!(validate_config(&cfg).is_err());

        let cfg = FeatureBuildConfig {
            target_mag: f64::NAN,
            ..FeatureBuildConfig::default()
        };
        assert!(validate_config(&cfg).is_err());
    }
}
