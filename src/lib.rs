// ─── mc-bootstrap ───
// Minecraft client bootstrap engine.
//
// Architecture:
//   config      — LaunchConfig fluent builder + validation
//   layout      — on-disk installation tree + directory provisioning
//   http        — shared HTTP client construction
//   version     — Mojang manifest + version descriptor + OS rules
//   assets      — asset index + content-addressed object paths
//   downloader  — streaming fetches + SHA-1 helpers
//   catalog     — local/remote version enumeration with manifest cache
//   state       — LaunchState diff + DownloadState session tracking
//   bootstrap   — the init/download/run/close engine
//   launch      — classpath + argv assembly, process spawn

pub mod assets;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod launch;
pub mod layout;
pub mod state;
pub mod version;

pub use bootstrap::Bootstrap;
pub use config::LaunchConfig;
pub use error::{BootstrapError, BootstrapResult};
pub use state::{DownloadState, DownloadStatus, LaunchState};
