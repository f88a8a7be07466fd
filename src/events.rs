//! Raw event ingestion and the normalized SQLite event store.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use csv::StringRecord;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::ZipArchive;

pub const REQUIRED_FIELDS: [&str; 6] = ["time", "latitude", "longitude", "depth", "mag", "type"];
pub const EARTHQUAKE_TYPE: &str = "earthquake";

const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time_ms_utc: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: Option<f64>,
    pub mag: f64,
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub input_rows: u64,
    pub kept_rows: u64,
    pub dropped_invalid: u64,
    pub dropped_non_earthquake: u64,
    pub first_time_ms_utc: Option<i64>,
    pub last_time_ms_utc: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEventLoad {
    pub events: Vec<Event>,
    pub report: IngestReport,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required columns: {missing:?}; found: {found:?}")]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive at {path} has no CSV entry")]
    MissingCsvEntry { path: String },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    time: usize,
    latitude: usize,
    longitude: usize,
    depth: usize,
    mag: usize,
    event_type: usize,
}

/// Reads a raw CSV source (or the first CSV entry of a `.zip` archive) into a
/// time-ordered earthquake sequence. Bad rows are dropped and counted, never
/// surfaced as errors.
pub fn load_raw_events(path: &Path) -> Result<RawEventLoad, IngestError> {
    info!(
        component = "ingest",
        event = "ingest.load.start",
        path = %path.display()
    );

    let bytes = if is_zip_path(path) {
        read_zip_csv_entry(path)?
    } else {
        fs::read(path)?
    };

    let loaded = parse_raw_events(&bytes)?;
    let report = &loaded.report;

    if report.dropped_invalid > 0 {
        warn!(
            component = "ingest",
            event = "ingest.load.rows_dropped",
            reason = "invalid_or_incomplete",
            dropped = report.dropped_invalid
        );
    }

    info!(
        component = "ingest",
        event = "ingest.load.finish",
        input_rows = report.input_rows,
        kept_rows = report.kept_rows,
        dropped_invalid = report.dropped_invalid,
        dropped_non_earthquake = report.dropped_non_earthquake
    );

    Ok(loaded)
}

/// Parses raw CSV bytes with a header row.
pub fn parse_raw_events(bytes: &[u8]) -> Result<RawEventLoad, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(bytes));

    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut report = IngestReport {
        input_rows: 0,
        kept_rows: 0,
        dropped_invalid: 0,
        dropped_non_earthquake: 0,
        first_time_ms_utc: None,
        last_time_ms_utc: None,
    };
    let mut events = Vec::new();

    for record in reader.records() {
        report.input_rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => {
                debug!(
                    component = "ingest",
                    event = "ingest.row.malformed",
                    error = %err
                );
                report.dropped_invalid += 1;
                continue;
            }
        };

        let Some(event) = parse_event_record(&record, columns) else {
            report.dropped_invalid += 1;
            continue;
        };

        if !event.event_type.trim().eq_ignore_ascii_case(EARTHQUAKE_TYPE) {
            report.dropped_non_earthquake += 1;
            continue;
        }

        events.push(event);
    }

    events.sort_by_key(|event| event.time_ms_utc);

    report.kept_rows = events.len() as u64;
    report.first_time_ms_utc = events.first().map(|event| event.time_ms_utc);
    report.last_time_ms_utc = events.last().map(|event| event.time_ms_utc);

    Ok(RawEventLoad { events, report })
}

/// Loads the raw source and rewrites the event store with the result.
pub fn ingest_to_store(raw_path: &Path, store_path: &Path) -> Result<IngestReport, IngestError> {
    let loaded = load_raw_events(raw_path)?;
    let mut store = EventStore::open(store_path)?;
    store.replace_all(&loaded.events)?;
    Ok(loaded.report)
}

/// Parses a timestamp as UTC. Offsets are honored; naive values are taken
/// to already be UTC.
pub fn parse_event_time(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    for format in OFFSET_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc).timestamp_millis());
        }
    }
    for format in NAIVE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).timestamp_millis());
    }

    None
}

pub fn format_time_ms(ts_ms_utc: i64) -> String {
    match Utc.timestamp_millis_opt(ts_ms_utc).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ts_ms_utc.to_string(),
    }
}

fn resolve_columns(headers: &StringRecord) -> Result<ColumnIndex, IngestError> {
    let found: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    let missing: Vec<String> = REQUIRED_FIELDS
        .into_iter()
        .filter(|&name| column_position(&found, name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::Schema { missing, found });
    }

    let index = |name: &str| column_position(&found, name).unwrap_or_default();
    Ok(ColumnIndex {
        time: index("time"),
        latitude: index("latitude"),
        longitude: index("longitude"),
        depth: index("depth"),
        mag: index("mag"),
        event_type: index("type"),
    })
}

fn column_position(found: &[String], name: &str) -> Option<usize> {
    found.iter().position(|header| header == name)
}

fn parse_event_record(record: &StringRecord, columns: ColumnIndex) -> Option<Event> {
    let time_ms_utc = parse_event_time(record.get(columns.time)?)?;
    let latitude = parse_finite(record.get(columns.latitude))?;
    let longitude = parse_finite(record.get(columns.longitude))?;
    let mag = parse_finite(record.get(columns.mag))?;
    let depth = parse_finite(record.get(columns.depth));
    let event_type = record.get(columns.event_type)?.to_string();

    Some(Event {
        time_ms_utc,
        latitude,
        longitude,
        depth,
        mag,
        event_type,
    })
}

fn parse_finite(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn read_zip_csv_entry(path: &Path) -> Result<Vec<u8>, IngestError> {
    let file = fs::File::open(path)?;
    let mut zip = ZipArchive::new(file)?;

    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx)?;
        if entry.is_dir() {
            continue;
        }
        if !entry.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        return Ok(buf);
    }

    Err(IngestError::MissingCsvEntry {
        path: path.display().to_string(),
    })
}

/// Normalized event table, one row per retained event, ordered by time.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS events (
                time INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                depth REAL,
                mag REAL NOT NULL,
                type TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS events_time_idx ON events(time);
            ",
        )?;

        Ok(Self { conn })
    }

    /// Replaces the whole table; each ingest run is a full recompute.
    pub fn replace_all(&mut self, events: &[Event]) -> Result<(), IngestError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM events", [])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO events (time, latitude, longitude, depth, mag, type)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )?;
            for event in events {
                stmt.execute(params![
                    event.time_ms_utc,
                    event.latitude,
                    event.longitude,
                    event.depth,
                    event.mag,
                    event.event_type,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            component = "event_store",
            event = "event_store.replace.finish",
            rows = events.len()
        );
        Ok(())
    }

    pub fn load_all(&self) -> Result<Vec<Event>, IngestError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT time, latitude, longitude, depth, mag, type
            FROM events
            ORDER BY time ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Event {
                time_ms_utc: row.get(0)?,
                latitude: row.get(1)?,
                longitude: row.get(2)?,
                depth: row.get(3)?,
                mag: row.get(4)?,
                event_type: row.get(5)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    pub fn count(&self) -> Result<u64, IngestError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
