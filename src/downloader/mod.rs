//! Listing discovery and verified downloads.
//!
//! This module scrapes the authenticated listing page for data files and the
//! checksum manifest, and downloads each data file with checksum verification. The
//! main entry point is [`download_all`]; [`fetch`] runs the state machine for a
//! single file.

mod file_downloader;
mod link_fetcher;
mod run;

// Re-export public API
pub use file_downloader::{download_files, fetch, FetchOptions, FileFetch, RetryConfig};
pub use link_fetcher::{discover_checksum_link, discover_data_links, fetch_listing, ListingLinks};
pub use run::download_all;
