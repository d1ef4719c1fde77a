//! File-backed store: one JSON document, replaced wholesale on every save

use quota_api::MonthlyStats;
use quota_util::{stats_path, YearMonth};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{decode_stats, encode_stats, Store, StoreResult};

/// JSON file store
///
/// Saves go to a sibling temp file which is then renamed over the target,
/// so a failed write leaves the previous record on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    archive_dir: Option<PathBuf>,
}

impl JsonFileStore {
    /// Store the record at exactly `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive_dir: None,
        }
    }

    /// Store the record as `stats.json` inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(stats_path(data_dir.as_ref()))
    }

    /// Before a save replaces a record from another month, copy that record
    /// to `<archive_dir>/stats-YYYY-MM.json`.
    pub fn with_archive(mut self, archive_dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(archive_dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the archive file for `year_month`, if archiving is enabled
    pub fn archive_path(&self, year_month: YearMonth) -> Option<PathBuf> {
        self.archive_dir
            .as_ref()
            .map(|dir| dir.join(format!("stats-{}.json", year_month)))
    }

    fn archive_previous(&self, incoming: &MonthlyStats) -> StoreResult<()> {
        if self.archive_dir.is_none() || !self.path.exists() {
            return Ok(());
        }

        let existing = fs::read_to_string(&self.path)?;
        let previous = match decode_stats(&existing) {
            Ok(previous) => previous,
            Err(e) => {
                debug!(error = %e, "Existing record unreadable, not archiving");
                return Ok(());
            }
        };

        if previous.year_month() == incoming.year_month() {
            return Ok(());
        }

        if let Some(archive_path) = self.archive_path(previous.year_month()) {
            write_atomic(&archive_path, &existing)?;
            info!(
                year_month = %previous.year_month(),
                path = %archive_path.display(),
                "Previous month archived"
            );
        }
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_stats(&self) -> StoreResult<Option<MonthlyStats>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved stats");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        let stats = decode_stats(&json)?;
        debug!(
            path = %self.path.display(),
            year_month = %stats.year_month(),
            sessions = stats.used_sessions(),
            "Stats loaded"
        );
        Ok(Some(stats))
    }

    fn save_stats(&self, stats: &MonthlyStats) -> StoreResult<()> {
        let json = encode_stats(stats)?;
        if let Err(e) = self.archive_previous(stats) {
            warn!(error = %e, "Failed to archive previous month, saving anyway");
        }
        write_atomic(&self.path, &json)?;

        debug!(
            path = %self.path.display(),
            year_month = %stats.year_month(),
            sessions = stats.used_sessions(),
            "Stats saved"
        );
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
