use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the bootstrap engine.
/// Every fallible operation returns `BootstrapResult<T>`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    // ── Configuration ───────────────────────────────────
    #[error("invalid launch configuration: {0}")]
    InvalidConfig(String),

    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("version {0} not found in manifest")]
    VersionNotFound(String),

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Parsing ─────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl From<std::io::Error> for BootstrapError {
    fn from(source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl BootstrapError {
    /// Short label for log lines and progress reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            BootstrapError::InvalidConfig(_) => "config",
            BootstrapError::PreconditionNotMet(_) => "precondition",
            BootstrapError::Http(_) | BootstrapError::DownloadFailed { .. } => "network",
            BootstrapError::VersionNotFound(_) => "version",
            BootstrapError::Sha1Mismatch { .. } => "integrity",
            BootstrapError::Json(_) => "parsing",
            BootstrapError::Io { .. } => "io",
        }
    }

    /// Whether a retry of the same operation could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BootstrapError::Http(_)
                | BootstrapError::DownloadFailed { .. }
                | BootstrapError::Io { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: path.into(),
            source,
        }
    }
}
