// Identity provider
pub const LOGIN_URL: &str = "https://humanid.huma-num.fr/";

/// Browser-identifying user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_1_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.41 Safari/537.36";

// Fixed login form parameters
pub const LOGIN_TIMEZONE: &str = "1";
pub const LOGIN_LM_AUTH: &str = "1HumanID";
pub const LOGIN_SKIN: &str = "humanid";

// Hidden inputs replayed from the login page
pub const LOGIN_URL_FIELD: &str = "url";
pub const LOGIN_TOKEN_FIELD: &str = "token";

// Selectors
pub const ANCHOR_SELECTOR: &str = "a[href]";

/// Suffixes marking plain-text-gzip, JSON-lines-gzip and JSON-lines-zstd archives.
pub const DATA_EXTENSIONS: &[&str] = &["txt.gz", "jsonl.gz", "jsonl.zst"];

/// Suffixes marking the checksum manifest.
pub const CHECKSUM_EXTENSIONS: &[&str] = &["sha256.txt", "checksum.sha256"];

pub const REPORT_FILE_NAME: &str = "results.txt";
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
