// ─── Asset Index ───
// Maps logical asset names onto content-addressed storage paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// The asset index document: logical name → hash and size.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// First two hex digits of the hash, used as the storage shard.
    pub fn hash_prefix(&self) -> &str {
        &self.hash[..2]
    }

    /// On-disk location: `<assets_dir>/objects/<prefix>/<hash>`.
    pub fn storage_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir
            .join("objects")
            .join(self.hash_prefix())
            .join(&self.hash)
    }

    /// Download location on the resources CDN.
    pub fn url(&self) -> String {
        format!("{}/{}/{}", RESOURCES_URL, self.hash_prefix(), self.hash)
    }
}

impl AssetIndex {
    /// Path of the index document itself: `<assets_dir>/indexes/<id>.json`.
    pub fn index_path(assets_dir: &Path, index_id: &str) -> PathBuf {
        assets_dir.join("indexes").join(format!("{index_id}.json"))
    }
}
