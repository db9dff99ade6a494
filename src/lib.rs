//! oscar-dl library
//!
//! This crate provides the core functionality for the `dodc` binary: logging in to
//! the OSCAR corpus archive, discovering the data files of a listing page, and
//! downloading each one with SHA-256 verification.
//!
//! ## Overview
//!
//! - [`auth`] - Authenticated session and the two-step form login
//! - [`downloader`] - Listing discovery, per-file download state machine, run orchestration
//! - [`checksum`] - Checksum manifest parsing and file digest verification
//! - [`report`] - Per-file outcomes and the `results.txt` report
//! - [`progress`] - Progress callbacks for front-ends
//! - [`config`] - Run configuration and TOML loading
//! - [`models`] - Outcomes, download targets, credentials
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! ```no_run
//! use oscar_dl::config::{ResolvedConfig, RunConfig};
//! use oscar_dl::models::Credentials;
//! use oscar_dl::{downloader, errors::AppResult, progress::NoProgress};
//! use std::sync::Arc;
//!
//! # async fn example() -> AppResult<()> {
//! let config = RunConfig::new(
//!     "https://oscar-prive.huma-num.fr/2109/packaged/br",
//!     Credentials::new("user", "password"),
//!     "data/br",
//!     ResolvedConfig::default(),
//! )?;
//! let report =
//!     downloader::download_all(&config, Arc::new(NoProgress), Default::default()).await?;
//! assert!(report.all_verified());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod errors;
pub mod models;
pub mod progress;
pub mod report;
pub mod ui;
pub mod utils;
