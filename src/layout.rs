// ─── File Layout ───
// Maps logical identifiers onto the on-disk installation tree and
// provisions the directories the engine writes into.

use std::path::{Path, PathBuf};

use crate::config::LaunchConfig;
use crate::error::{BootstrapError, BootstrapResult};

/// Create every directory the bootstrap writes into. Idempotent.
///
/// Provisions `mc_dir`, `libraries/`, `assets/`, `versions/`,
/// `assets/indexes/` and `assets/objects/`.
pub async fn ensure_directories(config: &LaunchConfig) -> BootstrapResult<()> {
    for dir in [
        config.mc_dir.clone(),
        config.libraries_dir.clone(),
        config.assets_dir.clone(),
        config.mc_dir.join("versions"),
        config.assets_dir.join("indexes"),
        config.assets_dir.join("objects"),
    ] {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BootstrapError::io(&dir, e))?;
    }
    Ok(())
}

/// Create the parent directory of a leaf file, if it has one.
pub async fn ensure_parent(path: &Path) -> BootstrapResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BootstrapError::io(parent, e))?;
    }
    Ok(())
}

/// The platform's conventional Minecraft installation directory:
/// `%APPDATA%\.minecraft` on Windows, `~/Library/Application
/// Support/minecraft` on macOS, `~/.minecraft` elsewhere.
pub fn default_mc_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    }
}
