use crate::model::{ErrorMap, StorageError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the per-run error map and failure list are written.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub error_map: PathBuf,
    pub failure_list: PathBuf,
}

impl ArtifactPaths {
    /// `logs/{key}/{date}/failed_list_{date}.json` and
    /// `data/{key}/error_{key}.json`.
    pub fn for_run(logs_dir: &Path, data_dir: &Path, key: &str, date: &str) -> Self {
        Self {
            error_map: logs_dir
                .join(key)
                .join(date)
                .join(format!("failed_list_{}.json", date)),
            failure_list: data_dir.join(key).join(format!("error_{}.json", key)),
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn write_error_map(path: &Path, errors: &ErrorMap) -> Result<(), StorageError> {
    write_json(path, errors)
}

pub fn write_failure_list(path: &Path, failures: &[String]) -> Result<(), StorageError> {
    write_json(path, failures)
}
