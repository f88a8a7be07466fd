use std::path::PathBuf;
use std::process::ExitCode;

use quakecast::{
    format_time_ms, init_logging, log_job_start, logging_config_from_env,
    pipeline_config_from_env, run_ingest,
};

const JOB: &str = "ingest";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{JOB} failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_job_start(JOB, &logging_cfg);

    let paths = pipeline_config_from_env();
    let raw_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.raw_path.clone());

    let report = run_ingest(&paths, &raw_path)?;

    println!(
        "Ingested {} | store={}",
        raw_path.display(),
        paths.event_store_path().display()
    );
    println!(
        "Rows: input={} kept={} dropped_invalid={} dropped_non_earthquake={}",
        report.input_rows, report.kept_rows, report.dropped_invalid, report.dropped_non_earthquake
    );
    match (report.first_time_ms_utc, report.last_time_ms_utc) {
        (Some(first), Some(last)) => println!(
            "Time range: {} -> {}",
            format_time_ms(first),
            format_time_ms(last)
        ),
        _ => println!("Time range: n/a (no events kept)"),
    }

    Ok(())
}
