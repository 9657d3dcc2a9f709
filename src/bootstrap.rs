// ─── Bootstrap Engine ───
// The init → diff → download → re-init → launch state machine. The
// engine owns the launch state, the HTTP client and the in-memory
// manifest documents; callers observe snapshots and a per-session
// DownloadState.

use std::path::Path;
use std::process::Child;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::assets::AssetIndex;
use crate::config::LaunchConfig;
use crate::downloader::Downloader;
use crate::error::{BootstrapError, BootstrapResult};
use crate::http::build_http_client;
use crate::launch;
use crate::layout;
use crate::state::{DownloadState, DownloadStatus, LaunchState};
use crate::version::{current_os_name, Artifact, VersionDescriptor, VersionManifest};

/// Parallelism for the library and asset download phases.
const DOWNLOAD_CONCURRENCY: usize = 8;

/// Sentinels in `LaunchState::missing_files`.
const FILE_VERSION_JSON: &str = "version.json";
const FILE_ASSET_INDEX: &str = "asset_index";
const FILE_CLIENT_JAR: &str = "client.jar";

/// The bootstrap engine for one configured installation.
///
/// Lifecycle: [`init`](Self::init) diffs the installation against disk,
/// [`download`](Self::download) fetches what the diff found missing,
/// [`run`](Self::run) spawns the game once `can_launch` holds, and
/// [`close`](Self::close) releases resources. `init` and `download`
/// record failures in the observable state instead of returning them;
/// construction and precondition violations are returned as errors.
pub struct Bootstrap {
    inner: Arc<Inner>,
}

struct Inner {
    config: LaunchConfig,
    client: reqwest::Client,
    downloader: Downloader,
    state: Mutex<LaunchState>,
    descriptor: Mutex<Option<VersionDescriptor>>,
    asset_index: Mutex<Option<AssetIndex>>,
    session: Mutex<Option<Arc<DownloadState>>>,
}

impl Bootstrap {
    /// Validate the config and build the engine. Fails with
    /// [`BootstrapError::InvalidConfig`] on an empty username or unset
    /// directories.
    pub fn new(config: LaunchConfig) -> BootstrapResult<Self> {
        config.validate()?;
        let client = build_http_client()?;
        let downloader = Downloader::new(client.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                downloader,
                state: Mutex::new(LaunchState::new()),
                descriptor: Mutex::new(None),
                asset_index: Mutex::new(None),
                session: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.inner.config
    }

    /// Snapshot of the current launch state.
    pub fn state(&self) -> LaunchState {
        self.inner.state.lock().unwrap().clone()
    }

    /// Reset the state, provision directories, load the local descriptor
    /// and asset index, and diff every required file against disk.
    /// Failures are captured in `LaunchState::last_error`.
    pub async fn init(&self) {
        self.inner.init().await;
    }

    /// Start a download session for everything `init` found missing.
    /// Returns immediately; the session runs on the runtime and reports
    /// through the returned [`DownloadState`].
    pub fn download(&self) -> BootstrapResult<Arc<DownloadState>> {
        if !self.inner.with_state(|s| s.initialized()) {
            return Err(BootstrapError::PreconditionNotMet(
                "init() must complete before download()".into(),
            ));
        }

        let download = Arc::new(DownloadState::new());
        let inner = self.inner.clone();
        let session = download.clone();
        let handle = tokio::spawn(async move {
            inner.run_download_session(&session).await;
        });
        download.attach_task(handle);

        *self.inner.session.lock().unwrap() = Some(download.clone());
        Ok(download)
    }

    /// Spawn the game process. Fails with
    /// [`BootstrapError::PreconditionNotMet`] unless the last `init`
    /// found the installation complete.
    pub async fn run(&self) -> BootstrapResult<Child> {
        if !self.inner.with_state(|s| s.can_launch()) {
            return Err(BootstrapError::PreconditionNotMet(
                "cannot launch: missing files or not initialized".into(),
            ));
        }

        let descriptor = self
            .inner
            .descriptor
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                BootstrapError::PreconditionNotMet("version descriptor not loaded".into())
            })?;

        launch::spawn_game(&self.inner.config, &descriptor)
    }

    /// Cancel any active download session. Idempotent; the HTTP client
    /// is released when the engine drops.
    pub fn close(&self) {
        let session = self.inner.session.lock().unwrap().take();
        if let Some(session) = session {
            session.cancel();
        }
    }
}

impl Inner {
    fn with_state<R>(&self, f: impl FnOnce(&mut LaunchState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    async fn init(&self) {
        self.with_state(|s| {
            s.reset();
            s.set_status_message("Initializing...");
        });

        if let Err(e) = self.try_init().await {
            error!("Initialization failed: {}", e);
            self.with_state(|s| {
                s.set_status_message(format!("Initialization failed: {e}"));
                s.set_last_error(e);
            });
        }
    }

    async fn try_init(&self) -> BootstrapResult<()> {
        layout::ensure_directories(&self.config).await?;

        self.load_version_descriptor().await?;
        self.load_asset_index().await?;
        self.check_missing_files().await;

        self.with_state(|s| {
            s.set_initialized(true);
            let missing = s.total_missing();
            s.set_can_launch(missing == 0);
            if missing == 0 {
                s.set_status_message("Ready to launch");
            } else {
                s.set_status_message(format!("Missing {missing} files, download required"));
            }
        });

        debug!("Initialized: {}", self.state.lock().unwrap());
        Ok(())
    }

    /// Parse the local version descriptor, or record its sentinel. An
    /// in-memory descriptor from an earlier session is kept if the file
    /// has since vanished.
    async fn load_version_descriptor(&self) -> BootstrapResult<()> {
        let path = &self.config.version_json_path;
        if !file_exists(path).await {
            self.with_state(|s| s.add_missing_file(FILE_VERSION_JSON));
            return Ok(());
        }

        debug!("Loading version descriptor: {:?}", path);
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BootstrapError::io(path, e))?;
        let descriptor: VersionDescriptor = serde_json::from_str(&raw)?;
        *self.descriptor.lock().unwrap() = Some(descriptor);
        Ok(())
    }

    /// Parse the local asset index, or record its sentinel. Without a
    /// descriptor the index cannot be located, which also counts as
    /// missing.
    async fn load_asset_index(&self) -> BootstrapResult<()> {
        let asset_index_id = self
            .descriptor
            .lock()
            .unwrap()
            .as_ref()
            .map(|d| d.asset_index.id.clone());
        let Some(asset_index_id) = asset_index_id else {
            self.with_state(|s| s.add_missing_file(FILE_ASSET_INDEX));
            return Ok(());
        };

        let path = AssetIndex::index_path(&self.config.assets_dir, &asset_index_id);
        if !file_exists(&path).await {
            self.with_state(|s| s.add_missing_file(FILE_ASSET_INDEX));
            return Ok(());
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| BootstrapError::io(&path, e))?;
        let index: AssetIndex = serde_json::from_str(&raw)?;
        *self.asset_index.lock().unwrap() = Some(index);
        Ok(())
    }

    async fn check_missing_files(&self) {
        if !file_exists(&self.config.version_jar_path).await {
            self.with_state(|s| s.add_missing_file(FILE_CLIENT_JAR));
        }

        let descriptor = self.descriptor.lock().unwrap().clone();
        if let Some(descriptor) = descriptor {
            let missing = self.collect_missing_libraries(&descriptor).await;
            self.with_state(|s| {
                for path in missing {
                    s.add_missing_library(path);
                }
            });
        }

        let index = self.asset_index.lock().unwrap().clone();
        if let Some(index) = index {
            let missing = self.collect_missing_assets(&index).await;
            self.with_state(|s| {
                for name in missing {
                    s.add_missing_asset(name);
                }
            });
        }
    }

    /// Paths of admitted library artifacts (main and native) absent from
    /// the libraries directory.
    async fn collect_missing_libraries(&self, descriptor: &VersionDescriptor) -> Vec<String> {
        let mut missing = Vec::new();
        for library in &descriptor.libraries {
            if !library.is_allowed_for_current_os() {
                continue;
            }

            if let Some(artifact) = &library.downloads.artifact {
                if !file_exists(&self.config.libraries_dir.join(&artifact.path)).await {
                    missing.push(artifact.path.clone());
                }
            }

            if let Some(native) = library.native_artifact_for(current_os_name()) {
                if !file_exists(&self.config.libraries_dir.join(&native.path)).await {
                    missing.push(native.path.clone());
                }
            }
        }
        missing
    }

    /// Logical names of asset objects absent from content storage.
    async fn collect_missing_assets(&self, index: &AssetIndex) -> Vec<String> {
        let mut missing = Vec::new();
        for (name, object) in &index.objects {
            if !file_exists(&object.storage_path(&self.config.assets_dir)).await {
                missing.push(name.clone());
            }
        }
        missing
    }

    // ── Download session ──

    async fn run_download_session(&self, download: &DownloadState) {
        download.set_status(DownloadStatus::Downloading);
        download.set_total_files(self.with_state(|s| s.total_missing()));

        match self.download_missing_files(download).await {
            Ok(()) => {
                info!(
                    "Download session finished: {} completed, {} failed",
                    download.completed_files(),
                    download.failed_files()
                );
                download.set_status(DownloadStatus::Completed);
                // Re-diff against disk; failed files stay missing and
                // keep can_launch false.
                self.init().await;
            }
            Err(e) => {
                error!("Download failed: {}", e);
                download.set_status(DownloadStatus::Failed);
                download.notify_error(&e);
            }
        }
    }

    async fn download_missing_files(&self, download: &DownloadState) -> BootstrapResult<()> {
        if self.descriptor.lock().unwrap().is_none() && self.is_file_missing(FILE_VERSION_JSON) {
            self.download_version_descriptor(download).await?;
        }

        if self.asset_index.lock().unwrap().is_none() && self.is_file_missing(FILE_ASSET_INDEX) {
            self.download_asset_index(download).await?;
        }

        if self.is_file_missing(FILE_CLIENT_JAR) {
            self.download_client_jar(download).await?;
        }

        self.download_libraries(download).await;
        self.download_assets(download).await;
        Ok(())
    }

    fn is_file_missing(&self, sentinel: &str) -> bool {
        self.with_state(|s| s.missing_files().iter().any(|f| f == sentinel))
    }

    /// Resolve the version through the remote manifest, persist the
    /// descriptor byte-for-byte and bring it into memory. Newly visible
    /// missing libraries are added to the diff and the session total.
    async fn download_version_descriptor(
        &self,
        download: &DownloadState,
    ) -> BootstrapResult<()> {
        download.set_current_file("version_manifest.json");

        let manifest = VersionManifest::fetch(&self.client).await?;
        let entry = manifest
            .find_version(&self.config.version_id)
            .ok_or_else(|| BootstrapError::VersionNotFound(self.config.version_id.clone()))?;

        download.set_current_file(FILE_VERSION_JSON);
        let (descriptor, raw) = VersionDescriptor::fetch(&self.client, &entry.url).await?;

        let path = &self.config.version_json_path;
        layout::ensure_parent(path).await?;
        tokio::fs::write(path, &raw)
            .await
            .map_err(|e| BootstrapError::io(path, e))?;

        let newly_missing = self.collect_missing_libraries(&descriptor).await;
        *self.descriptor.lock().unwrap() = Some(descriptor);
        self.extend_diff(download, newly_missing, |s, p| s.add_missing_library(p));

        self.with_state(|s| s.remove_missing_file(FILE_VERSION_JSON));
        download.increment_completed_files();
        Ok(())
    }

    /// Fetch and persist the asset index named by the descriptor. Newly
    /// visible missing assets are added to the diff and the session
    /// total.
    async fn download_asset_index(&self, download: &DownloadState) -> BootstrapResult<()> {
        let asset_index = self
            .descriptor
            .lock()
            .unwrap()
            .as_ref()
            .map(|d| d.asset_index.clone());
        let Some(asset_index) = asset_index else {
            return Ok(());
        };

        download.set_current_file("asset_index.json");

        let response = self.client.get(&asset_index.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: asset_index.url.clone(),
                status: status.as_u16(),
            });
        }
        let raw = response.text().await?;

        let path = AssetIndex::index_path(&self.config.assets_dir, &asset_index.id);
        layout::ensure_parent(&path).await?;
        tokio::fs::write(&path, &raw)
            .await
            .map_err(|e| BootstrapError::io(&path, e))?;

        let index: AssetIndex = serde_json::from_str(&raw)?;
        let newly_missing = self.collect_missing_assets(&index).await;
        *self.asset_index.lock().unwrap() = Some(index);
        self.extend_diff(download, newly_missing, |s, n| s.add_missing_asset(n));

        self.with_state(|s| s.remove_missing_file(FILE_ASSET_INDEX));
        download.increment_completed_files();
        Ok(())
    }

    fn extend_diff(
        &self,
        download: &DownloadState,
        entries: Vec<String>,
        add: impl Fn(&mut LaunchState, String),
    ) {
        if entries.is_empty() {
            return;
        }
        let added = self.with_state(|s| {
            let before = s.total_missing();
            for entry in entries {
                add(s, entry);
            }
            s.total_missing() - before
        });
        download.set_total_files(download.total_files() + added);
    }

    async fn download_client_jar(&self, download: &DownloadState) -> BootstrapResult<()> {
        let client_ref = self
            .descriptor
            .lock()
            .unwrap()
            .as_ref()
            .map(|d| d.downloads.client.clone());
        let Some(client_ref) = client_ref else {
            return Ok(());
        };

        download.set_current_file(FILE_CLIENT_JAR);
        download.add_total_bytes(client_ref.size);

        let written = self
            .downloader
            .download_file(&client_ref.url, &self.config.version_jar_path, None)
            .await?;
        download.add_downloaded_bytes(written);

        self.with_state(|s| s.remove_missing_file(FILE_CLIENT_JAR));
        download.increment_completed_files();
        Ok(())
    }

    /// Fetch every missing library artifact with bounded parallelism.
    /// Individual failures are counted, never raised.
    async fn download_libraries(&self, download: &DownloadState) {
        let descriptor = self.descriptor.lock().unwrap().clone();
        let Some(descriptor) = descriptor else {
            return;
        };

        let missing = self.with_state(|s| s.missing_libraries().to_vec());
        if missing.is_empty() {
            return;
        }

        let mut jobs: Vec<Artifact> = Vec::new();
        for library in &descriptor.libraries {
            if !library.is_allowed_for_current_os() {
                continue;
            }
            if let Some(artifact) = &library.downloads.artifact {
                if missing.iter().any(|p| p == &artifact.path) {
                    jobs.push(artifact.clone());
                }
            }
            if let Some(native) = library.native_artifact_for(current_os_name()) {
                if missing.iter().any(|p| p == &native.path) {
                    jobs.push(native.clone());
                }
            }
        }

        for job in &jobs {
            if let Some(size) = job.size {
                download.add_total_bytes(size);
            }
        }

        futures::stream::iter(jobs)
            .for_each_concurrent(DOWNLOAD_CONCURRENCY, |artifact| async move {
                self.download_library_artifact(artifact, download).await;
            })
            .await;
    }

    async fn download_library_artifact(&self, artifact: Artifact, download: &DownloadState) {
        download.set_current_file(&artifact.path);

        let url = artifact.resolve_url();
        let dest = self.config.libraries_dir.join(&artifact.path);
        match self.downloader.download_file(&url, &dest, None).await {
            Ok(written) => {
                download.add_downloaded_bytes(written);
                self.with_state(|s| s.remove_missing_library(&artifact.path));
                download.increment_completed_files();
            }
            Err(e) => {
                warn!("Failed to download library {}: {}", artifact.path, e);
                download.increment_failed_files();
            }
        }
    }

    /// Fetch every missing asset object with bounded parallelism.
    /// Individual failures are counted, never raised.
    async fn download_assets(&self, download: &DownloadState) {
        let index = self.asset_index.lock().unwrap().clone();
        let Some(index) = index else {
            return;
        };

        let missing = self.with_state(|s| s.missing_assets().to_vec());
        if missing.is_empty() {
            return;
        }

        let jobs: Vec<(String, crate::assets::AssetObject)> = missing
            .into_iter()
            .filter_map(|name| index.objects.get(&name).map(|obj| (name, obj.clone())))
            .collect();

        for (_, object) in &jobs {
            download.add_total_bytes(object.size);
        }

        futures::stream::iter(jobs)
            .for_each_concurrent(DOWNLOAD_CONCURRENCY, |(name, object)| async move {
                self.download_asset(name, object, download).await;
            })
            .await;
    }

    async fn download_asset(
        &self,
        name: String,
        object: crate::assets::AssetObject,
        download: &DownloadState,
    ) {
        download.set_current_file(&name);

        let dest = object.storage_path(&self.config.assets_dir);
        match self.downloader.download_file(&object.url(), &dest, None).await {
            Ok(written) => {
                download.add_downloaded_bytes(written);
                self.with_state(|s| s.remove_missing_asset(&name));
                download.increment_completed_files();
            }
            Err(e) => {
                warn!("Failed to download asset {}: {}", name, e);
                download.increment_failed_files();
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
