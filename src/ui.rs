use crate::errors::{AppError, AppResult};
use crate::models::Outcome;
use crate::progress::ProgressObserver;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;

const FILES_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";
const BYTES_TEMPLATE: &str =
    "{msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {eta}";

/// Bar style from one of the templates above.
fn bar_style(template: &str) -> AppResult<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template(template)
        .map_err(|e| AppError::IoError(format!("Failed to create progress bar template: {e}")))?
        .progress_chars("#>-"))
}

/// Terminal rendering of download progress: one bar for the file count and one
/// byte bar per file in flight.
pub struct ConsoleProgress {
    multi: MultiProgress,
    files: ProgressBar,
    byte_style: ProgressStyle,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> AppResult<Self> {
        let multi = MultiProgress::new();
        let files = multi.add(ProgressBar::new(0).with_style(bar_style(FILES_TEMPLATE)?));
        let byte_style = bar_style(BYTES_TEMPLATE)?;
        Ok(Self {
            multi,
            files,
            byte_style,
            bars: Mutex::new(HashMap::new()),
        })
    }

    fn with_bars(&self, f: impl FnOnce(&mut HashMap<String, ProgressBar>)) {
        if let Ok(mut bars) = self.bars.lock() {
            f(&mut bars);
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_run_start(&self, total_files: usize) {
        self.files.set_length(total_files as u64);
        self.files.set_message("files");
    }

    fn on_start(&self, file: &str, total_bytes: Option<u64>) {
        let bar = self.multi.add(ProgressBar::new(total_bytes.unwrap_or(0)));
        bar.set_style(self.byte_style.clone());
        bar.set_message(file.to_string());
        self.with_bars(|bars| {
            bars.insert(file.to_string(), bar);
        });
    }

    fn on_progress(&self, file: &str, bytes_written: u64, _total_bytes: Option<u64>) {
        self.with_bars(|bars| {
            if let Some(bar) = bars.get(file) {
                bar.set_position(bytes_written);
            }
        });
    }

    fn on_finish(&self, file: &str, outcome: Outcome) {
        self.with_bars(|bars| {
            if let Some(bar) = bars.remove(file) {
                bar.finish_and_clear();
                self.multi.remove(&bar);
            }
        });
        self.files.inc(1);
        self.files.set_message(format!("{file}: {outcome}"));
        if self.files.length() == Some(self.files.position()) {
            self.files.finish_with_message("done");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_valid() {
        assert!(bar_style(FILES_TEMPLATE).is_ok());
        assert!(bar_style(BYTES_TEMPLATE).is_ok());
    }

    #[test]
    fn file_count_bar_finishes_after_last_file() {
        let progress = ConsoleProgress::new().unwrap();
        progress.on_run_start(2);
        progress.on_start("a.txt.gz", Some(10));
        progress.on_progress("a.txt.gz", 10, Some(10));
        progress.on_finish("a.txt.gz", Outcome::DownloadSucceeded);
        assert!(!progress.files.is_finished());
        assert!(progress.bars.lock().unwrap().is_empty());

        progress.on_finish("b.txt.gz", Outcome::MissingChecksum);
        assert_eq!(progress.files.position(), 2);
        assert!(progress.files.is_finished());
    }
}
