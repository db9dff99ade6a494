use crate::constants::{DEFAULT_CHUNK_SIZE, LOGIN_URL, REPORT_FILE_NAME, USER_AGENT};
use crate::errors::{AppError, AppResult};
use crate::models::Credentials;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved configuration with all values filled in (no Options).
///
/// This is the immutable configuration object handed to the authenticator and the
/// download engine. It can be deserialized by the TOML loader; missing keys fall
/// back to [`Default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Identity provider login page (fetched, then posted to)
    pub login_url: String,
    /// User agent sent with every request
    pub user_agent: String,

    // Downloads
    /// Size in bytes of each write while streaming a response body
    pub chunk_size: usize,
    /// Number of concurrent download tasks
    pub concurrent_downloads: usize,
    /// Connect timeout and per-read timeout, in seconds
    pub timeout_secs: u64,
    /// Maximum number of retry attempts for failed downloads
    pub max_retries: u32,
    /// Initial delay in milliseconds before the first retry
    pub retry_initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries
    pub retry_max_delay_ms: u64,

    // Output
    /// Name of the outcome report written into the output directory
    pub report_file_name: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrent_downloads: 4,
            timeout_secs: 30,
            max_retries: 2,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 10000,
            report_file_name: REPORT_FILE_NAME.to_string(),
        }
    }
}

impl ResolvedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects values that would stall or break a run.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::InvalidInput(
                "Chunk size must be greater than 0".into(),
            ));
        }
        if self.concurrent_downloads == 0 {
            return Err(AppError::InvalidInput(
                "Concurrent downloads must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::InvalidInput(
                "Timeout must be greater than 0".into(),
            ));
        }
        if self.report_file_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Report file name must not be empty".into(),
            ));
        }
        url::Url::parse(&self.login_url)?;
        Ok(())
    }
}

/// Everything one run needs: what to download, who to log in as, where to put it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub out_dir: PathBuf,
    pub resolved: ResolvedConfig,
}

impl RunConfig {
    /// Builds a run configuration, validating the base URL and the resolved settings.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        out_dir: impl Into<PathBuf>,
        resolved: ResolvedConfig,
    ) -> AppResult<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)?;
        resolved.validate()?;
        Ok(Self {
            base_url,
            credentials,
            out_dir: out_dir.into(),
            resolved,
        })
    }

    /// Path of the outcome report inside the output directory.
    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(&self.resolved.report_file_name)
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// Deserializes the required run inputs (base_url, user, password, out) and an
/// optional `[download]` table of settings. The parser rejects unknown keys at both
/// levels to catch typos.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfigFile {
    /// Listing page to download every data file from
    pub base_url: String,
    /// Login user name
    pub user: String,
    /// Login password
    pub password: String,
    /// Output directory
    pub out: PathBuf,
    /// Download settings; omitted keys take their defaults
    #[serde(default, rename = "download")]
    pub resolved: ResolvedConfig,
}

impl ResolvedConfigFile {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, required fields are missing,
    /// unknown keys are present, or a numeric setting is zero. Returns `IoError` if
    /// the file cannot be read.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ResolvedConfigFile = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;

        config.resolved.validate()?;
        Ok(config)
    }

    pub fn into_run_config(self) -> AppResult<RunConfig> {
        RunConfig::new(
            self.base_url,
            Credentials::new(self.user, self.password),
            self.out,
            self.resolved,
        )
    }
}
