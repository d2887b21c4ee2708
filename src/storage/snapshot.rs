use crate::model::{ExtractionResult, Reconciled, Snapshot, StorageError, UniqueDelta};
use chrono::Local;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Only the stored items matter for reconciling; the metadata of an older
/// file must not fail the target.
#[derive(Deserialize)]
struct StoredItems {
    #[serde(default)]
    data: Vec<String>,
}

/// One JSON snapshot per target under a category directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the snapshot of `target`. Path separators in the name
    /// are replaced so every target stays inside the store directory.
    pub fn path_for(&self, target: &str) -> PathBuf {
        let file_name: String = target
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    /// Prior snapshot, or `None` when the target has never been saved.
    #[cfg(test)]
    pub fn load(&self, target: &str) -> Result<Option<Snapshot>, StorageError> {
        match fs::read_to_string(self.path_for(target)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn load_items(&self, target: &str) -> Result<Vec<String>, StorageError> {
        match fs::read_to_string(self.path_for(target)) {
            Ok(content) => Ok(serde_json::from_str::<StoredItems>(&content)?.data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, target: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.path_for(target), json)?;
        Ok(())
    }

    /// Compares a fresh extraction with the stored snapshot.
    ///
    /// Identical data (same items, same order) leaves the file untouched and
    /// yields [`Reconciled::Unchanged`]. Anything else overwrites the
    /// snapshot and yields the items that were not present before.
    pub fn reconcile(
        &self,
        target: &str,
        extraction: &ExtractionResult,
    ) -> Result<Reconciled, StorageError> {
        let previous = self.load_items(target)?;

        if previous == extraction.data {
            return Ok(Reconciled::Unchanged);
        }

        let snapshot = Snapshot {
            method: extraction.method,
            by: extraction.by.clone(),
            last_update_date: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            data: extraction.data.clone(),
        };
        self.save(target, &snapshot)?;

        let delta = unique_items(&previous, &snapshot.data);
        if !delta.is_empty() {
            info!("[DATA] found {} new items", delta.len());
        }
        info!("[DATA] snapshot updated");

        Ok(Reconciled::Changed(UniqueDelta {
            method: snapshot.method,
            by: snapshot.by,
            last_update_date: snapshot.last_update_date,
            data: delta,
        }))
    }
}

/// Items of `current` absent from `previous`, each listed once, in the
/// order they first appear in `current`.
pub fn unique_items(previous: &[String], current: &[String]) -> Vec<String> {
    let seen: HashSet<&str> = previous.iter().map(String::as_str).collect();
    let mut emitted = HashSet::new();
    current
        .iter()
        .filter(|item| !seen.contains(item.as_str()) && emitted.insert(item.as_str()))
        .cloned()
        .collect()
}
