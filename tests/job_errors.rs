use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn run_job(exe: &str, data_dir: &Path, args: &[&str]) -> Output {
    Command::new(exe)
        .args(args)
        .env("QUAKECAST_DATA_DIR", data_dir)
        .env("QUAKECAST_LOG_LEVEL", "off")
        .env_remove("QUAKECAST_AS_OF")
        .env_remove("QUAKECAST_LOOKBACKS")
        .env_remove("QUAKECAST_HORIZON_DAYS")
        .output()
        .expect("job binary should start")
}

#[test]
fn build_features_without_store_exits_with_readable_message() {
    let temp = tempdir().expect("temp dir should be created");
    let data_dir = temp.path().join("data");

    let output = run_job(env!("CARGO_BIN_EXE_build_features"), &data_dir, &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("build_features failed: input artifact"));
    assert!(stderr.contains("events.sqlite"));
    assert!(stderr.contains("does not exist"));
    assert!(!stderr.contains("MissingArtifact"));
    assert!(output.stdout.is_empty());
    assert!(!data_dir.exists());
}

#[test]
fn predict_with_malformed_day_exits_with_readable_message() {
    let temp = tempdir().expect("temp dir should be created");

    let output = run_job(
        env!("CARGO_BIN_EXE_predict"),
        &temp.path().join("data"),
        &["2024-13-40"],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("predict failed: invalid value for AS_OF_DAY: '2024-13-40'"));
    assert!(!stderr.contains("InvalidValue"));
}
