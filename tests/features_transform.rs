use chrono::NaiveDate;
use quakecast::{
    assert_schema_compatible, build_daily_aggregates, build_feature_schema, build_feature_table,
    parse_event_time, read_feature_table, write_feature_table, Event, FeatureBuildConfig,
    FeatureError, FEATURE_SCHEMA_VERSION,
};
use tempfile::tempdir;

const DAY_MS: i64 = 86_400_000;
const START_TS_MS: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

fn quake_at(ts_ms: i64, mag: f64, depth: Option<f64>) -> Event {
    Event {
        time_ms_utc: ts_ms,
        latitude: 37.5,
        longitude: -122.0,
        depth,
        mag,
        event_type: "earthquake".to_string(),
    }
}

fn quake(raw_time: &str, mag: f64, depth: Option<f64>) -> Event {
    let ts = parse_event_time(raw_time).expect("fixture timestamp should parse");
    quake_at(ts, mag, depth)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

fn cfg(horizon_days: u32, lookbacks: Vec<u32>) -> FeatureBuildConfig {
    FeatureBuildConfig {
        feature_min_mag: 2.5,
        target_mag: 5.0,
        horizon_days,
        lookbacks,
        schema_version: FEATURE_SCHEMA_VERSION,
    }
}

/// Sixty days of activity with every fourth day carrying only sub-threshold
/// events, so the daily index has interior zero days.
fn synthetic_catalog() -> Vec<Event> {
    let mut events = Vec::new();
    for d in 0..60_i64 {
        let base = START_TS_MS + d * DAY_MS;
        if d % 4 == 1 {
            events.push(quake_at(base + 3_600_000, 1.2, Some(4.0)));
            continue;
        }
        for k in 0..(d % 3 + 1) {
            let mag = 2.5 + ((d * 7 + k * 3) % 30) as f64 / 10.0;
            let depth = if k == 1 { None } else { Some(5.0 + k as f64) };
            events.push(quake_at(base + k * 1_800_000, mag, depth));
        }
    }
    events
}

#[test]
fn gap_day_between_events_is_zero_filled_and_labels_the_first_day() {
    let events = vec![
        quake("2024-01-01T03:00:00Z", 3.0, Some(10.0)),
        quake("2024-01-01T18:00:00Z", 4.0, Some(20.0)),
        quake("2024-01-03T06:00:00Z", 5.5, Some(30.0)),
    ];
    let cfg = cfg(2, vec![1, 7, 30]);

    let daily = build_daily_aggregates(&events, cfg.feature_min_mag).expect("daily aggregates");
    assert_eq!(daily.len(), 3);
    assert_eq!(daily[1].day, day(2024, 1, 2));
    assert_eq!(daily[1].count, 0);
    assert_eq!(daily[1].maxmag, 0.0);
    assert_eq!(daily[1].mean_depth, 0.0);

    let (table, report) = build_feature_table(&events, &cfg).expect("feature table");
    assert_eq!(table.rows.len(), 1);
    let row = &table.rows[0];
    assert_eq!(row.day, day(2024, 1, 1));
    assert_eq!(row.count, 2);
    assert_eq!(row.maxmag, 4.0);
    assert_eq!(row.mean_depth, 15.0);
    assert_eq!(row.is_target_event_today, 0);
    assert_eq!(row.label, 1);
    assert_eq!(row.feature_value("count_1d"), Some(2.0));
    assert_eq!(row.feature_value("maxmag_30d"), Some(4.0));

    assert_eq!(report.span_days, 3);
    assert_eq!(report.filled_days, 1);
    assert_eq!(report.truncated_days, 2);
    assert_eq!(report.output_rows, 1);
    assert_eq!(report.positive_labels, 1);
    assert_eq!(report.positive_rate(), 1.0);
}

#[test]
fn rolling_windows_match_brute_force_over_contiguous_days() {
    let events = synthetic_catalog();
    let cfg = cfg(7, vec![1, 7, 30]);

    let daily = build_daily_aggregates(&events, cfg.feature_min_mag).expect("daily aggregates");
    let (table, _) = build_feature_table(&events, &cfg).expect("feature table");

    assert_eq!(daily.len(), 60);
    assert_eq!(table.rows.len(), daily.len() - 7);
    assert!(table
        .rows
        .windows(2)
        .all(|w| w[0].day.succ_opt() == Some(w[1].day)));

    for (i, row) in table.rows.iter().enumerate() {
        assert_eq!(row.day, daily[i].day);
        for w in [1_usize, 7, 30] {
            let start = (i + 1).saturating_sub(w);
            let span = &daily[start..=i];
            let expected_count: u64 = span.iter().map(|d| u64::from(d.count)).sum();
            let expected_max = span.iter().map(|d| d.maxmag).fold(f64::MIN, f64::max);

            let agg = row.window(w as u32).expect("configured window present");
            assert_eq!(agg.count, expected_count, "count_{w}d at {}", row.day);
            assert_eq!(agg.maxmag, expected_max, "maxmag_{w}d at {}", row.day);
        }

        let expected_label = daily[i + 1..=i + 7].iter().any(|d| d.maxmag >= 5.0);
        assert_eq!(row.label, u8::from(expected_label), "label at {}", row.day);
        assert_eq!(row.is_target_event_today, u8::from(daily[i].maxmag >= 5.0));
    }
}

#[test]
fn future_events_only_touch_labels_inside_the_horizon() {
    let base = synthetic_catalog();
    let mut perturbed = base.clone();
    perturbed.push(quake_at(START_TS_MS + 40 * DAY_MS + 60_000, 6.5, Some(9.0)));

    let cfg = cfg(7, vec![1, 7, 30]);
    let (before, _) = build_feature_table(&base, &cfg).expect("base table");
    let (after, _) = build_feature_table(&perturbed, &cfg).expect("perturbed table");
    let shock_day = day(2024, 2, 10);

    for (a, b) in before.rows.iter().zip(&after.rows) {
        if a.day >= shock_day {
            continue;
        }
        assert_eq!(a.count, b.count);
        assert_eq!(a.maxmag, b.maxmag);
        assert_eq!(a.windows, b.windows);
        if a.day < shock_day - chrono::Duration::days(7) {
            assert_eq!(a.label, b.label, "label at {} leaked", a.day);
        } else {
            assert_eq!(b.label, 1, "label at {} should see the shock", b.day);
        }
    }
}

#[test]
fn lookback_longer_than_span_is_the_running_total() {
    let events = synthetic_catalog();
    let cfg = cfg(7, vec![1, 4_000_000_000]);

    let daily = build_daily_aggregates(&events, cfg.feature_min_mag).expect("daily aggregates");
    let (table, _) = build_feature_table(&events, &cfg).expect("feature table");

    let mut running = 0_u64;
    let mut running_max = f64::MIN;
    for (row, agg) in table.rows.iter().zip(&daily) {
        running += u64::from(agg.count);
        running_max = running_max.max(agg.maxmag);
        let wide = row.window(4_000_000_000).expect("wide window present");
        assert_eq!(wide.count, running, "count at {}", row.day);
        assert_eq!(wide.maxmag, running_max, "maxmag at {}", row.day);
    }
}

#[test]
fn written_table_is_byte_identical_across_runs_and_reads_back() {
    let events = synthetic_catalog();
    let cfg = cfg(7, vec![1, 7, 30]);
    let temp = tempdir().expect("temp dir should be created");
    let path_a = temp.path().join("a").join("features.csv");
    let path_b = temp.path().join("b").join("features.csv");

    let (table_a, _) = build_feature_table(&events, &cfg).expect("first build");
    let (table_b, _) = build_feature_table(&events, &cfg).expect("second build");
    write_feature_table(&path_a, &table_a).expect("first write");
    write_feature_table(&path_b, &table_b).expect("second write");

    let bytes_a = std::fs::read(&path_a).expect("read first");
    let bytes_b = std::fs::read(&path_b).expect("read second");
    assert_eq!(bytes_a, bytes_b);

    let header = String::from_utf8_lossy(&bytes_a)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    assert_eq!(
        header,
        "day,count,maxmag,mean_depth,count_1d,count_7d,count_30d,maxmag_1d,maxmag_7d,maxmag_30d,is_target_event_today,label"
    );

    let back = read_feature_table(&path_a, &table_a.schema).expect("read back");
    assert_eq!(back, table_a);

    let other_schema = build_feature_schema(&cfg_with_lookbacks(vec![1, 7]));
    assert!(matches!(
        read_feature_table(&path_a, &other_schema),
        Err(FeatureError::InvalidTable(_))
    ));
}

fn cfg_with_lookbacks(lookbacks: Vec<u32>) -> FeatureBuildConfig {
    cfg(7, lookbacks)
}

#[test]
fn empty_or_sub_threshold_input_is_empty_input() {
    let cfg = cfg(7, vec![1, 7, 30]);
    assert!(matches!(
        build_feature_table(&[], &cfg),
        Err(FeatureError::EmptyInput)
    ));

    let weak = vec![
        quake("2024-01-01T00:00:00Z", 1.0, None),
        quake("2024-01-09T00:00:00Z", f64::NAN, None),
    ];
    assert!(matches!(
        build_feature_table(&weak, &cfg),
        Err(FeatureError::EmptyInput)
    ));
}

#[test]
fn span_not_longer_than_horizon_is_rejected() {
    let events = vec![
        quake("2024-01-01T00:00:00Z", 3.0, None),
        quake("2024-01-07T00:00:00Z", 3.0, None),
    ];
    let err = build_feature_table(&events, &cfg(7, vec![1, 7, 30])).unwrap_err();
    assert!(matches!(
        err,
        FeatureError::InsufficientSpan {
            span_days: 7,
            horizon_days: 7
        }
    ));
}

#[test]
fn mean_depth_skips_missing_values() {
    let events = vec![
        quake("2024-01-01T01:00:00Z", 3.0, Some(8.0)),
        quake("2024-01-01T02:00:00Z", 3.5, None),
        quake("2024-01-01T03:00:00Z", 2.9, Some(12.0)),
        quake("2024-01-02T01:00:00Z", 3.0, None),
    ];
    let daily = build_daily_aggregates(&events, 2.5).expect("daily aggregates");
    assert_eq!(daily[0].count, 3);
    assert_eq!(daily[0].mean_depth, 10.0);
    assert_eq!(daily[1].count, 1);
    assert_eq!(daily[1].mean_depth, 0.0);
}

#[test]
fn days_are_bucketed_in_utc() {
    let events = vec![
        quake("2024-01-01T23:59:59Z", 3.0, None),
        quake("2024-01-01T23:30:00-02:00", 3.0, None),
    ];
    let daily = build_daily_aggregates(&events, 2.5).expect("daily aggregates");
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].day, day(2024, 1, 1));
    assert_eq!(daily[1].day, day(2024, 1, 2));
    assert_eq!(daily[1].count, 1);
}

#[test]
fn schema_fingerprint_tracks_build_parameters() {
    let base = build_feature_schema(&cfg(7, vec![1, 7, 30]));
    let same = build_feature_schema(&cfg(7, vec![1, 7, 30]));
    let other = build_feature_schema(&cfg(3, vec![1, 7, 30]));

    assert_eq!(base, same);
    assert_ne!(base.fingerprint, other.fingerprint);
    assert!(assert_schema_compatible(base.version, &base.fingerprint, &same).is_ok());
    assert!(matches!(
        assert_schema_compatible(base.version, &base.fingerprint, &other),
        Err(FeatureError::SchemaFingerprintMismatch { .. })
    ));
    assert!(matches!(
        assert_schema_compatible(base.version + 1, &base.fingerprint, &base),
        Err(FeatureError::SchemaVersionMismatch { .. })
    ));
}
