use thiserror::Error;

/// Failures of the two-step form login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login page no longer carries a hidden input the form submission needs.
    #[error("login page has no hidden `{0}` field; the provider's login flow may have changed")]
    MissingField(String),
    /// Fetching the login page or posting the credentials failed.
    #[error("login request failed: {0}")]
    Network(String),
}

/// Failures while scraping the listing page.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No anchor on the listing page points at a checksum manifest.
    #[error("no checksum manifest link found on the listing page")]
    NotFound,
}

/// Failures while parsing a checksum manifest.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A non-empty manifest line did not split into exactly two tokens.
    #[error("malformed checksum line: {0:?}")]
    MalformedLine(String),
}

/// Run-level errors. Anything in here aborts the whole run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("Checksum registry error: {0}")]
    Registry(#[from] RegistryError),
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    UrlError(String),
    /// Invalid input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    IoError(String),
    /// The run was cancelled while logging in or reading the listing
    #[error("Run cancelled before downloads started")]
    Cancelled,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::UrlError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
