// ─── Version Catalog ───
// Enumerates installed versions from the versions directory and merges
// them with the remote manifest. The remote manifest is cached
// process-wide for five minutes; concurrent refreshes may race and the
// last writer wins, which is harmless for an immutable catalog.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::BootstrapResult;
use crate::version::VersionManifest;

/// Parallelism for local descriptor parsing.
const CATALOG_CONCURRENCY: usize = 4;

const CACHE_KEY: &str = "main";
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A version visible to the shell, either installed locally or offered by
/// the remote manifest.
#[derive(Debug, Clone)]
pub struct MinecraftVersion {
    pub id: String,
    pub version_type: String,
    pub release_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub is_local: bool,
    pub local_path: Option<PathBuf>,
}

impl fmt::Display for MinecraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}{})",
            self.id,
            self.version_type,
            if self.is_local { ", local" } else { "" }
        )
    }
}

/// The subset of a version descriptor the catalog needs. Local descriptors
/// are parsed leniently so a half-installed version still lists.
#[derive(Debug, Deserialize)]
struct LocalVersionHeader {
    #[serde(rename = "type")]
    version_type: Option<String>,
    #[serde(rename = "releaseTime")]
    release_time: Option<DateTime<Utc>>,
}

/// Versions installed under `<mc_dir>/versions`, in directory-scan order.
/// A directory lists when `<name>/<name>.json` exists and parses; parse
/// failures are logged and skipped.
pub async fn local_versions(mc_dir: &Path) -> Vec<MinecraftVersion> {
    let versions_dir = mc_dir.join("versions");
    let mut dirs = Vec::new();

    let mut entries = match tokio::fs::read_dir(&versions_dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    futures::stream::iter(dirs)
        .map(parse_local_version)
        .buffered(CATALOG_CONCURRENCY)
        .filter_map(|v| async { v })
        .collect()
        .await
}

async fn parse_local_version(version_dir: PathBuf) -> Option<MinecraftVersion> {
    let id = version_dir.file_name()?.to_string_lossy().into_owned();
    let json_path = version_dir.join(format!("{id}.json"));
    let raw = tokio::fs::read_to_string(&json_path).await.ok()?;

    match serde_json::from_str::<LocalVersionHeader>(&raw) {
        Ok(header) => Some(MinecraftVersion {
            id,
            version_type: header.version_type.unwrap_or_else(|| "unknown".into()),
            release_time: header.release_time,
            url: None,
            is_local: true,
            local_path: Some(json_path),
        }),
        Err(e) => {
            warn!("Failed to parse local version {:?}: {}", json_path, e);
            None
        }
    }
}

/// All versions the remote manifest offers, in upstream order.
pub async fn remote_versions(client: &reqwest::Client) -> BootstrapResult<Vec<MinecraftVersion>> {
    let manifest = version_manifest(client).await?;
    Ok(manifest
        .versions
        .iter()
        .map(|entry| MinecraftVersion {
            id: entry.id.clone(),
            version_type: entry.version_type.clone(),
            release_time: Some(entry.release_time),
            url: Some(entry.url.clone()),
            is_local: false,
            local_path: None,
        })
        .collect())
}

/// Union of local and remote versions: locals first in scan order, then
/// remote entries whose id is not already installed. A remote failure
/// degrades to locals only and never fails the call.
pub async fn available_versions(client: &reqwest::Client, mc_dir: &Path) -> Vec<MinecraftVersion> {
    let locals = local_versions(mc_dir).await;

    let mut versions = locals.clone();
    match remote_versions(client).await {
        Ok(remotes) => {
            for remote in remotes {
                if !locals.iter().any(|local| local.id == remote.id) {
                    versions.push(remote);
                }
            }
        }
        Err(e) => {
            warn!("Failed to fetch remote versions, using local only: {}", e);
        }
    }
    versions
}

/// Whether a version is fully present locally (descriptor and jar).
pub fn is_version_local(mc_dir: &Path, version_id: &str) -> bool {
    let version_dir = mc_dir.join("versions").join(version_id);
    version_dir.join(format!("{version_id}.json")).exists()
        && version_dir.join(format!("{version_id}.jar")).exists()
}

/// Look up one locally installed version by id.
pub async fn local_version(mc_dir: &Path, version_id: &str) -> Option<MinecraftVersion> {
    let version_dir = mc_dir.join("versions").join(version_id);
    if !version_dir.join(format!("{version_id}.json")).exists() {
        return None;
    }
    parse_local_version(version_dir).await
}

// ─── Manifest cache ───

struct CacheEntry {
    fetched_at: Instant,
    manifest: Arc<VersionManifest>,
}

fn cache() -> &'static Mutex<HashMap<String, CacheEntry>> {
    static CACHE: OnceLock<Mutex<HashMap<String, CacheEntry>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The remote version manifest, cached process-wide with a five-minute
/// TTL. Concurrent callers may each fetch; the last writer wins.
pub async fn version_manifest(
    client: &reqwest::Client,
) -> BootstrapResult<Arc<VersionManifest>> {
    if let Some(entry) = cache().lock().unwrap().get(CACHE_KEY) {
        if entry.fetched_at.elapsed() < CACHE_TTL {
            debug!("Version manifest served from cache");
            return Ok(entry.manifest.clone());
        }
    }

    let manifest = Arc::new(VersionManifest::fetch(client).await?);
    cache().lock().unwrap().insert(
        CACHE_KEY.to_string(),
        CacheEntry {
            fetched_at: Instant::now(),
            manifest: manifest.clone(),
        },
    );
    Ok(manifest)
}

/// Drop any cached manifest; the next call refetches.
pub fn clear_manifest_cache() {
    cache().lock().unwrap().clear();
}
