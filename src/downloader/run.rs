use crate::auth::Session;
use crate::checksum::ChecksumRegistry;
use crate::config::RunConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{DownloadTarget, Outcome};
use crate::progress::ProgressObserver;
use crate::report::ResultReport;
use crate::utils::{format_elapsed, format_size};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::file_downloader::download_files;
use super::link_fetcher::fetch_listing;

/// Downloads and verifies every data file advertised on the listing page.
///
/// Steps run in order: log in, scrape the listing page, fetch and parse the
/// checksum manifest, then process every data file on a bounded pool. The session
/// lives for this call only.
///
/// # Report
///
/// Once the download phase has started, the report is written to
/// `out_dir/<report_file_name>` on every exit path, including cancellation and
/// aborted worker tasks.
///
/// # Errors
///
/// Login, listing, and manifest failures abort the run before any file is touched
/// and no report is written. So does cancelling `cancel` during those steps, which
/// returns [`AppError::Cancelled`]. Per-file failures never abort the run; they only
/// show up as outcomes.
///
/// # Example
///
/// ```no_run
/// use oscar_dl::config::{ResolvedConfig, RunConfig};
/// use oscar_dl::downloader::download_all;
/// use oscar_dl::models::Credentials;
/// use oscar_dl::progress::NoProgress;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> oscar_dl::errors::AppResult<()> {
/// let config = RunConfig::new(
///     "https://oscar-prive.huma-num.fr/2109/packaged/br",
///     Credentials::new("user", "password"),
///     "data/br",
///     ResolvedConfig::default(),
/// )?;
/// let report = download_all(&config, Arc::new(NoProgress), CancellationToken::new()).await?;
/// println!("{}", report.render());
/// # Ok(())
/// # }
/// ```
pub async fn download_all(
    config: &RunConfig,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
) -> AppResult<ResultReport> {
    let started = Instant::now();
    let settings = &config.resolved;

    let session = Session::new(settings, config.credentials.clone())?;
    let targets = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Run cancelled before downloads started");
            return Err(AppError::Cancelled);
        }
        targets = prepare_targets(&session, config) => targets?,
    };
    observer.on_run_start(targets.len());

    let report = Arc::new(Mutex::new(ResultReport::new()));
    let result = download_files(
        &session,
        targets,
        settings,
        observer,
        report.clone(),
        &cancel,
    )
    .await;

    let report = report
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let flushed = report
        .flush(&config.out_dir, &settings.report_file_name)
        .await;
    if let Err(e) = &flushed {
        warn!(error = %e, "Failed to write report");
    }

    let downloaded_bytes = result?;
    flushed?;

    log_summary(&report, downloaded_bytes, started, cancel.is_cancelled());
    Ok(report)
}

/// Logs in, scrapes the listing, loads the manifest and prepares the output folder.
async fn prepare_targets(session: &Session, config: &RunConfig) -> AppResult<Vec<DownloadTarget>> {
    session.login(&config.resolved.login_url).await?;

    let listing = fetch_listing(session, &config.base_url).await?;

    info!(checksum_url = %listing.checksum_url, "Fetching checksum manifest");
    let manifest = session.fetch_text(&listing.checksum_url).await?;
    let registry = ChecksumRegistry::parse(&manifest)?;
    info!(entries = registry.len(), "Checksum manifest parsed");

    fs::create_dir_all(&config.out_dir).await.map_err(|e| {
        AppError::IoError(format!(
            "Failed to create output directory {}: {}",
            config.out_dir.display(),
            e
        ))
    })?;

    Ok(build_targets(&listing.data_urls, &config.out_dir, &registry))
}

/// One target per destination path. Links sharing a basename would write the same
/// file, so only the first one in listing order is kept.
fn build_targets(
    data_urls: &BTreeSet<String>,
    out_dir: &Path,
    registry: &ChecksumRegistry,
) -> Vec<DownloadTarget> {
    let mut destinations = HashSet::new();
    data_urls
        .iter()
        .map(|url| DownloadTarget::new(url, out_dir, registry))
        .filter(|target| {
            let first = destinations.insert(target.destination.clone());
            if !first {
                warn!(
                    url = %target.url,
                    file_path = %target.destination.display(),
                    "Another link already saves to this path, skipping"
                );
            }
            first
        })
        .collect()
}

fn log_summary(report: &ResultReport, downloaded_bytes: u64, started: Instant, cancelled: bool) {
    let downloaded = format_size(downloaded_bytes);
    let elapsed = format_elapsed(started.elapsed());

    info!(
        files = report.len(),
        already_exists = report.count(Outcome::AlreadyExists),
        downloaded = report.count(Outcome::DownloadSucceeded),
        download_failed = report.count(Outcome::DownloadFailed),
        validation_failed = report.count(Outcome::ValidationFailed),
        missing_checksum = report.count(Outcome::MissingChecksum),
        downloaded_size = %downloaded,
        elapsed = %elapsed,
        "Run completed"
    );

    if cancelled {
        warn!("Run was cancelled; files not started are missing from the report");
    }
}
