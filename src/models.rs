use crate::checksum::ChecksumRegistry;
use crate::utils::file_name_from_url;
use std::fmt;
use std::path::{Path, PathBuf};

/// Login credentials. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Terminal classification of one file within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    /// A local file already matched its digest; nothing was fetched.
    AlreadyExists,
    /// Fetched and verified.
    DownloadSucceeded,
    /// Transport or write failure. A partial file may remain on disk.
    DownloadFailed,
    /// Fetched completely but the digest did not match. The file is kept.
    ValidationFailed,
    /// The manifest had no entry for this file; nothing was fetched.
    MissingChecksum,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::AlreadyExists,
        Outcome::DownloadSucceeded,
        Outcome::DownloadFailed,
        Outcome::ValidationFailed,
        Outcome::MissingChecksum,
    ];

    /// Label written to the report.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::DownloadSucceeded => "DOWNLOAD_SUCCESS",
            Self::DownloadFailed => "DOWNLOAD_FAILED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::MissingChecksum => "MISSING_CHECKSUM",
        }
    }

    /// Whether the file on disk is verified after this outcome.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::DownloadSucceeded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One data file to process: where it comes from, where it goes, what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub destination: PathBuf,
    pub expected_digest: Option<String>,
}

impl DownloadTarget {
    /// Pairs a data URL with `out_dir/<basename>` and the registry's digest for that basename.
    pub fn new(url: &str, out_dir: &Path, registry: &ChecksumRegistry) -> Self {
        let file_name = file_name_from_url(url);
        Self {
            url: url.to_string(),
            destination: out_dir.join(file_name),
            expected_digest: registry.lookup(file_name).map(str::to_string),
        }
    }

    /// File name used for logging and progress.
    pub fn file_name(&self) -> &str {
        file_name_from_url(&self.url)
    }
}
