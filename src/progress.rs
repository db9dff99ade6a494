//! Progress callbacks raised by the download engine.
//!
//! The engine never renders anything itself. A front-end implements
//! [`ProgressObserver`] and draws bars, prints lines, or forwards events elsewhere.
//! Implementations are shared across concurrent downloads and must be `Send + Sync`.

use crate::models::Outcome;

pub trait ProgressObserver: Send + Sync {
    /// The run discovered `total_files` data files.
    fn on_run_start(&self, _total_files: usize) {}

    /// A response for `file` arrived; `total_bytes` is the advertised content length.
    fn on_start(&self, _file: &str, _total_bytes: Option<u64>) {}

    /// `bytes_written` is cumulative for `file`.
    fn on_progress(&self, _file: &str, _bytes_written: u64, _total_bytes: Option<u64>) {}

    /// `file` reached its terminal outcome.
    fn on_finish(&self, _file: &str, _outcome: Outcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
