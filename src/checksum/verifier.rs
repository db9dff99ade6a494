use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

const READ_BLOCK_SIZE: usize = 64 * 1024;

/// Computes the lowercase hex SHA-256 of a file, streaming it in fixed-size blocks.
pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Returns `true` only if `path` is a regular file whose SHA-256 equals `expected_digest`.
///
/// Never fails: a missing file, a directory, an unreadable file and a digest
/// mismatch all yield `false`. The comparison is case-sensitive.
pub async fn verify(expected_digest: &str, path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return false,
    }

    match sha256_file(path).await {
        Ok(actual) => actual == expected_digest,
        Err(e) => {
            debug!(file_path = %path.display(), error = %e, "Could not hash file");
            false
        }
    }
}
