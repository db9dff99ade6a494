use crate::auth::Session;
use crate::checksum::verify;
use crate::config::ResolvedConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{DownloadTarget, Outcome};
use crate::progress::ProgressObserver;
use crate::report::ResultReport;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a single transfer attempt failed. Never leaves this module: every variant
/// ends up as [`Outcome::DownloadFailed`].
#[derive(Debug, Error)]
enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no data received for {0:?}")]
    Timeout(Duration),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns `true` for retryable errors (network errors, timeouts, 5xx HTTP status codes).
    /// Returns `false` for 4xx client errors and local I/O errors.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code >= 500,
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Io(_) => false,
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
        }
    }
}

/// Calculates exponential backoff delay in milliseconds.
///
/// Formula: `min(initial_delay * 2^attempt, max_delay)`
fn calculate_backoff(attempt: u32, config: &RetryConfig) -> u64 {
    let delay = config
        .initial_delay_ms
        .saturating_mul(2_u64.saturating_pow(attempt));
    delay.min(config.max_delay_ms)
}

/// Per-file transfer settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Bytes per write while streaming the body
    pub chunk_size: usize,
    /// Longest wait for response headers or for the next body chunk
    pub read_timeout: Duration,
    pub retry: RetryConfig,
}

impl From<&ResolvedConfig> for FetchOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            read_timeout: config.timeout(),
            retry: RetryConfig {
                max_retries: config.max_retries,
                initial_delay_ms: config.retry_initial_delay_ms,
                max_delay_ms: config.retry_max_delay_ms,
            },
        }
    }
}

/// Terminal result of [`fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFetch {
    pub outcome: Outcome,
    /// Bytes written by this run (zero when nothing was fetched)
    pub bytes_downloaded: u64,
}

impl FileFetch {
    fn without_transfer(outcome: Outcome) -> Self {
        Self {
            outcome,
            bytes_downloaded: 0,
        }
    }
}

/// Runs the per-file state machine and returns its terminal outcome.
///
/// 1. No registry digest: [`Outcome::MissingChecksum`], nothing is fetched.
/// 2. Destination already verifies: [`Outcome::AlreadyExists`], nothing is fetched.
/// 3. Stream the body to the destination. Any failure: [`Outcome::DownloadFailed`];
///    a partial file is left on disk.
/// 4. Verify the written file: [`Outcome::DownloadSucceeded`] or
///    [`Outcome::ValidationFailed`]. A mismatching file is kept.
pub async fn fetch(
    session: &Session,
    target: &DownloadTarget,
    options: &FetchOptions,
    observer: &dyn ProgressObserver,
) -> FileFetch {
    let file_name = target.file_name();

    let Some(expected) = target.expected_digest.as_deref() else {
        warn!(filename = file_name, "No checksum listed for file, skipping");
        return FileFetch::without_transfer(Outcome::MissingChecksum);
    };

    if verify(expected, &target.destination).await {
        debug!(filename = file_name, "File already present and verified");
        return FileFetch::without_transfer(Outcome::AlreadyExists);
    }

    let bytes_downloaded = match download_with_retry(session, target, options, observer).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(filename = file_name, error = %e, "Failed to download file");
            return FileFetch::without_transfer(Outcome::DownloadFailed);
        }
    };

    let outcome = if verify(expected, &target.destination).await {
        Outcome::DownloadSucceeded
    } else {
        warn!(
            filename = file_name,
            file_path = %target.destination.display(),
            "Downloaded file does not match its checksum"
        );
        Outcome::ValidationFailed
    };

    FileFetch {
        outcome,
        bytes_downloaded,
    }
}

async fn download_with_retry(
    session: &Session,
    target: &DownloadTarget,
    options: &FetchOptions,
    observer: &dyn ProgressObserver,
) -> Result<u64, FetchError> {
    let retry = &options.retry;
    let mut attempt = 0;

    loop {
        match download_single_file(session, target, options, observer).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < retry.max_retries && e.is_retryable() => {
                let delay_ms = calculate_backoff(attempt, retry);
                warn!(
                    filename = target.file_name(),
                    attempt = attempt + 1,
                    max_retries = retry.max_retries + 1,
                    delay_ms = delay_ms,
                    error = %e,
                    "Retrying download after error"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Streams one response body into the destination, overwriting whatever was there.
async fn download_single_file(
    session: &Session,
    target: &DownloadTarget,
    options: &FetchOptions,
    observer: &dyn ProgressObserver,
) -> Result<u64, FetchError> {
    let file_name = target.file_name();
    let read_timeout = options.read_timeout;

    let response = timeout(read_timeout, session.get(&target.url).send())
        .await
        .map_err(|_| FetchError::Timeout(read_timeout))?
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let total = response.content_length();
    observer.on_start(file_name, total);

    let mut response = response;
    let mut file = File::create(&target.destination).await?;
    let chunk_size = options.chunk_size.max(1);
    let mut written: u64 = 0;

    loop {
        let chunk = timeout(read_timeout, response.chunk())
            .await
            .map_err(|_| FetchError::Timeout(read_timeout))?
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let Some(chunk) = chunk else {
            break;
        };

        // Empty keep-alive chunks produce no pieces.
        for piece in chunk.chunks(chunk_size) {
            file.write_all(piece).await?;
            written += piece.len() as u64;
            observer.on_progress(file_name, written, total);
        }
    }

    file.flush().await?;
    Ok(written)
}

/// Processes every target on a bounded pool and records each outcome in `report`.
///
/// # Behavior
///
/// - **Bounded concurrency**: at most `concurrent_downloads` files are processed at once.
/// - **Failure isolation**: a failing file only affects its own report entry.
/// - **Cancellation**: targets that have not started when `cancel` fires are not
///   recorded; transfers in flight are dropped and recorded as
///   [`Outcome::DownloadFailed`].
///
/// Returns the number of bytes written across all files.
///
/// # Errors
///
/// Returns an error only if a worker task panicked; the outcomes of every other
/// file are still in `report`.
pub async fn download_files(
    session: &Session,
    targets: Vec<DownloadTarget>,
    config: &ResolvedConfig,
    observer: Arc<dyn ProgressObserver>,
    report: Arc<Mutex<ResultReport>>,
    cancel: &CancellationToken,
) -> AppResult<u64> {
    let total_files = targets.len();
    info!(
        total = total_files,
        concurrency = config.concurrent_downloads,
        "Starting download"
    );

    let semaphore = Arc::new(Semaphore::new(config.concurrent_downloads));
    let options = Arc::new(FetchOptions::from(config));
    let downloaded_bytes = Arc::new(AtomicU64::new(0));

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(total_files);

    for target in targets {
        let semaphore = semaphore.clone();
        let session = session.clone();
        let options = options.clone();
        let observer = observer.clone();
        let report = report.clone();
        let downloaded_bytes = downloaded_bytes.clone();
        let cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            // Wait for a free slot unless the run is being cancelled.
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return,
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            if cancel.is_cancelled() {
                return;
            }

            let result = tokio::select! {
                result = fetch(&session, &target, &options, observer.as_ref()) => result,
                _ = cancel.cancelled() => {
                    warn!(filename = target.file_name(), "Download cancelled");
                    FileFetch::without_transfer(Outcome::DownloadFailed)
                }
            };

            downloaded_bytes.fetch_add(result.bytes_downloaded, Ordering::Relaxed);
            observer.on_finish(target.file_name(), result.outcome);
            report
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(target.destination.clone(), result.outcome);
        });

        handles.push(handle);
    }

    let errors: Vec<String> = join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| joined.err())
        .map(|e| format!("Task join error: {e}"))
        .collect();

    if !errors.is_empty() {
        return Err(AppError::IoError(format!(
            "{} download task(s) aborted: {}",
            errors.len(),
            errors.join("; ")
        )));
    }

    Ok(downloaded_bytes.load(Ordering::Relaxed))
}
