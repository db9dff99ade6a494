use crate::config::{ResolvedConfig, ResolvedConfigFile, RunConfig};
use crate::downloader::download_all;
use crate::errors::{AppError, AppResult};
use crate::models::Credentials;
use crate::progress::{NoProgress, ProgressObserver};
use crate::ui::ConsoleProgress;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

fn command() -> Command {
    Command::new("dodc")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .help("Do not draw progress bars")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("cli")
                .about("Log in, download and verify every data file of a listing page")
                .after_help("Example:\n  dodc cli --user me --password secret --base-url https://oscar-prive.huma-num.fr/2109/packaged/br --out data/br")
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .help("The login username")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("The login password")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("base_url")
                        .short('b')
                        .long("base-url")
                        .alias("base_url")
                        .help("The listing page to download files from")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("The folder downloaded files are saved to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("chunk_size")
                        .short('c')
                        .long("chunk-size")
                        .alias("chunk_size")
                        .help("Bytes written per chunk while streaming a download")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("concurrent_downloads")
                        .short('j')
                        .long("jobs")
                        .help("Files downloaded in parallel")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn run_config_from_flags(sub: &ArgMatches) -> AppResult<RunConfig> {
    let required = |name: &str| {
        sub.get_one::<String>(name)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("Missing --{name}")))
    };

    let mut resolved = ResolvedConfig::default();
    if let Some(&chunk_size) = sub.get_one::<usize>("chunk_size") {
        resolved.chunk_size = chunk_size;
    }
    if let Some(&jobs) = sub.get_one::<usize>("concurrent_downloads") {
        resolved.concurrent_downloads = jobs;
    }

    let out = sub
        .get_one::<PathBuf>("out")
        .cloned()
        .ok_or_else(|| AppError::InvalidInput("Missing --out".into()))?;

    RunConfig::new(
        required("base_url")?,
        Credentials::new(required("user")?, required("password")?),
        out,
        resolved,
    )
}

/// Parses command-line arguments and runs one download.
///
/// This function handles two subcommands:
/// - `cli`: credentials, listing URL and output folder given as flags
/// - `toml`: the same inputs plus download settings read from a TOML file
///
/// Ctrl-C cancels the run. Once downloads have started, the report of the files
/// processed so far is still written.
///
/// # Errors
///
/// Returns an error if the arguments or configuration are invalid, or if the run
/// aborts before downloading (login, listing, or manifest failure).
pub async fn cli() -> AppResult<()> {
    let cmd = command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    let config = match matches.subcommand() {
        Some(("cli", sub)) => run_config_from_flags(sub)?,
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .ok_or_else(|| AppError::InvalidInput("Missing config path".into()))?;
            ResolvedConfigFile::from_toml_file(config_path)?.into_run_config()?
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
            return Ok(());
        }
    };

    let observer: Arc<dyn ProgressObserver> = if matches.get_flag("quiet") {
        Arc::new(NoProgress)
    } else {
        Arc::new(ConsoleProgress::new()?)
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping downloads");
            ctrl_c.cancel();
        }
    });

    info!(
        base_url = %config.base_url,
        out = %config.out_dir.display(),
        "Starting run"
    );
    let report = download_all(&config, observer, cancel).await?;

    if !report.all_verified() {
        warn!(
            report = %config.report_path().display(),
            "Some files were not downloaded or failed verification"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_build_run_config() {
        let matches = command()
            .try_get_matches_from(vec![
                "dodc",
                "cli",
                "--user",
                "alice",
                "--password",
                "secret",
                "--base-url",
                "https://oscar.example.org/fr",
                "--out",
                "data/fr",
                "--chunk-size",
                "8192",
            ])
            .unwrap();
        let sub = matches.subcommand_matches("cli").unwrap();
        let config = run_config_from_flags(sub).unwrap();

        assert_eq!(config.base_url, "https://oscar.example.org/fr");
        assert_eq!(config.credentials.user, "alice");
        assert_eq!(config.out_dir, PathBuf::from("data/fr"));
        assert_eq!(config.resolved.chunk_size, 8192);
        assert_eq!(config.resolved.concurrent_downloads, 4);
    }

    #[test]
    fn cli_requires_credentials() {
        let result = command().try_get_matches_from(vec![
            "dodc",
            "cli",
            "--base-url",
            "https://oscar.example.org/fr",
            "--out",
            "out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let matches = command()
            .try_get_matches_from(vec![
                "dodc", "cli", "-u", "a", "-p", "b", "-b", "https://x.org/fr", "-o", "out", "-c",
                "0",
            ])
            .unwrap();
        let sub = matches.subcommand_matches("cli").unwrap();
        assert!(matches!(
            run_config_from_flags(sub),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn toml_command_requires_path() {
        let result = command().try_get_matches_from(vec!["dodc", "toml"]);
        assert!(result.is_err());
    }
}
