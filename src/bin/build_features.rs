use std::process::ExitCode;

use quakecast::{
    feature_config_from_env, init_logging, log_job_start, logging_config_from_env,
    pipeline_config_from_env, run_feature_build,
};

const JOB: &str = "build_features";

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
    let cfg = feature_config_from_env()?;

    let (table, report) = run_feature_build(&paths, &cfg)?;

    println!(
        "Features written | table={} schema={}",
        paths.feature_table_path().display(),
        paths.feature_schema_path().display()
    );
    println!(
        "Rows: {} Cols: {}",
        table.rows.len(),
        table.schema.columns.len()
    );
    println!(
        "Span: {} days ({} without qualifying events, {} cut for the {}-day horizon)",
        report.span_days, report.filled_days, report.truncated_days, cfg.horizon_days
    );
    println!(
        "Positive label rate: {:.4} (target_mag={} horizon_days={})",
        table.positive_rate(),
        cfg.target_mag,
        cfg.horizon_days
    );

    Ok(())
}
