// ─── HTTP Fetcher ───
// Single-file downloads plus the SHA-1 helpers used by explicit
// validators. The engine gates re-downloads on file existence, not on
// hashes; verification here only runs when a caller asks for it.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{BootstrapError, BootstrapResult};
use crate::layout;

/// Streaming downloader over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` into `dest`, creating parent directories and
    /// replacing any existing file. Fails on non-2xx. When
    /// `sha1_expected` is given, the streamed bytes are hashed and a
    /// mismatch removes the partial file.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> BootstrapResult<u64> {
        layout::ensure_parent(dest).await?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| BootstrapError::io(dest, e))?;

        let mut hasher = sha1_expected.map(|_| Sha1::new());
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| BootstrapError::io(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| BootstrapError::io(dest, e))?;
        drop(file);

        if let (Some(hasher), Some(expected)) = (hasher, sha1_expected) {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(BootstrapError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        debug!("Downloaded {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }
}

/// SHA-1 of a file's contents as lowercase hex, computed over a buffered
/// streaming read.
pub async fn sha1_file(path: &Path) -> BootstrapResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| BootstrapError::io(path, e))?;

    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| BootstrapError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether the file exists and its SHA-1 matches `expected`
/// (case-insensitive). Unreadable files count as a mismatch.
pub async fn validate_file_hash(path: &Path, expected: &str) -> bool {
    match sha1_file(path).await {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            if path.exists() {
                warn!("Failed to hash {:?}: {}", path, e);
            }
            false
        }
    }
}

/// File size in bytes, 0 when the file is missing or unreadable.
pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .unwrap_or(0)
}

/// Whether the file exists and is non-empty.
pub async fn is_valid_file(path: &Path) -> bool {
    file_size(path).await > 0
}
