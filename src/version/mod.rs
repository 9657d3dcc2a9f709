pub mod manifest;
pub mod version_file;

pub use manifest::{LatestPointers, VersionEntry, VersionManifest, VERSION_MANIFEST_URL};
pub use version_file::{
    current_arch, current_os_name, Artifact, AssetIndexRef, DownloadRef, Library,
    LibraryDownloads, Natives, OsRule, Rule, RuleAction, VersionDescriptor, VersionDownloads,
    LIBRARIES_URL,
};
