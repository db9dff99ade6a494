//! Per-run outcome report.
//!
//! One line per file, `<destination path>: <OUTCOME>`, sorted by path. The report
//! in the output directory is overwritten by every run.

use crate::errors::{AppError, AppResult};
use crate::models::Outcome;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultReport {
    outcomes: BTreeMap<PathBuf, Outcome>,
}

impl ResultReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the terminal outcome for `path`. A later record for the same path replaces it.
    pub fn record(&mut self, path: impl Into<PathBuf>, outcome: Outcome) {
        self.outcomes.insert(path.into(), outcome);
    }

    pub fn get(&self, path: &Path) -> Option<Outcome> {
        self.outcomes.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, Outcome)> {
        self.outcomes.iter().map(|(p, o)| (p.as_path(), *o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of files that ended with `outcome`.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }

    /// Whether every recorded file ended verified on disk.
    pub fn all_verified(&self) -> bool {
        self.outcomes.values().all(Outcome::is_verified)
    }

    pub fn render(&self) -> String {
        self.outcomes
            .iter()
            .map(|(path, outcome)| format!("{}: {}\n", path.display(), outcome))
            .collect()
    }

    /// Writes the report to `out_dir/file_name`, creating `out_dir` if needed.
    pub async fn flush(&self, out_dir: &Path, file_name: &str) -> AppResult<PathBuf> {
        fs::create_dir_all(out_dir).await.map_err(|e| {
            AppError::IoError(format!(
                "Failed to create output directory {}: {}",
                out_dir.display(),
                e
            ))
        })?;

        let path = out_dir.join(file_name);
        fs::write(&path, self.render()).await.map_err(|e| {
            AppError::IoError(format!(
                "Failed to write report {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(report = %path.display(), files = self.len(), "Report written");
        Ok(path)
    }
}
