// ─── Version Manifest ───
// Fetching and decoding of the Mojang version manifest v2.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::error::{BootstrapError, BootstrapResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level upstream catalog of all published versions.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestPointers,
    pub versions: Vec<VersionEntry>,
}

/// The `latest` block: ids of the newest release and snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestPointers {
    pub release: String,
    pub snapshot: String,
}

/// A single catalog entry. Upstream order is arbitrary; use
/// [`VersionManifest::sorted_by_release_time`] for display.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(rename = "releaseTime")]
    pub release_time: DateTime<Utc>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Fetch the manifest from Mojang using a shared HTTP client.
    pub async fn fetch(client: &reqwest::Client) -> BootstrapResult<Self> {
        let response = client.get(VERSION_MANIFEST_URL).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: VERSION_MANIFEST_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let manifest: VersionManifest = response.json().await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by id (e.g. "1.20.1").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Entries sorted newest-first by release time.
    pub fn sorted_by_release_time(&self) -> Vec<&VersionEntry> {
        let mut entries: Vec<&VersionEntry> = self.versions.iter().collect();
        entries.sort_by(|a, b| b.release_time.cmp(&a.release_time));
        entries
    }

    /// Stable release entries only.
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}
