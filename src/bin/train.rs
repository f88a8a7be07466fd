use std::process::ExitCode;

use quakecast::{
    init_logging, log_job_start, logging_config_from_env, pipeline_config_from_env,
    run_training, train_config_from_env,
};

const JOB: &str = "train";

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
    let cfg = train_config_from_env()?;

    let outcome = run_training(&paths, &cfg)?;

    println!(
        "Trained on {} days, evaluated on {} days from {}",
        outcome.train_rows, outcome.test_rows, cfg.test_start
    );
    match outcome.roc_auc {
        Some(auc) => println!("ROC-AUC: {auc:.4}"),
        None => println!("ROC-AUC: undefined (test partition holds a single class)"),
    }
    println!("Brier score: {:.4}", outcome.brier_score);
    println!("\n{}\n", outcome.report);
    println!(
        "Saved model={} calibration={} predictions={}",
        paths.model_bundle_path().display(),
        paths.calibration_table_path().display(),
        paths.test_predictions_path().display()
    );

    Ok(())
}
