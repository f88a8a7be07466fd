use std::process::ExitCode;

use quakecast::{
    as_of_from_env, init_logging, log_job_start, logging_config_from_env, parse_day,
    pipeline_config_from_env, run_prediction,
};

const JOB: &str = "predict";

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
    let as_of = match std::env::args().nth(1) {
        Some(raw) => Some(parse_day("AS_OF_DAY", &raw)?),
        None => as_of_from_env()?,
    };

    let prediction = run_prediction(&paths, as_of)?;

    println!("As-of day: {}", prediction.day);
    println!(
        "P(M>={} within {} days): {:.4}",
        prediction.target_mag, prediction.horizon_days, prediction.probability
    );

    Ok(())
}
