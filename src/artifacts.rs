//! Atomic artifact writes shared by the pipeline stages.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Writes `bytes` to a sibling temp file and renames it into place, creating
/// parent directories as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid output path: {}", path.display()),
            )
        })?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Flushes an in-memory CSV writer and returns its bytes.
pub fn csv_bytes(writer: csv::Writer<Vec<u8>>) -> io::Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|err| io::Error::new(err.error().kind(), err.error().to_string()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).map_err(serde_json::Error::io)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, serde_json::Error> {
    let bytes = fs::read(path).map_err(serde_json::Error::io)?;
    serde_json::from_slice(&bytes)
}
