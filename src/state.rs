// ─── Launcher State ───
// LaunchState is the engine's diff of the installation against disk;
// DownloadState tracks one download session with progress callbacks.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::BootstrapError;

/// Result of the last `init()` diff. Owned by the engine behind a single
/// mutex; callers observe snapshots via [`crate::bootstrap::Bootstrap::state`].
///
/// Invariant: `can_launch` implies `initialized` and all missing sets
/// empty. The missing sets preserve insertion order and uniqueness.
#[derive(Debug, Clone, Default)]
pub struct LaunchState {
    initialized: bool,
    can_launch: bool,
    missing_files: Vec<String>,
    missing_libraries: Vec<String>,
    missing_assets: Vec<String>,
    status_message: String,
    last_error: Option<Arc<BootstrapError>>,
}

impl LaunchState {
    pub fn new() -> Self {
        Self {
            status_message: "Not initialized".into(),
            ..Default::default()
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn can_launch(&self) -> bool {
        self.can_launch
    }

    pub fn missing_files(&self) -> &[String] {
        &self.missing_files
    }

    pub fn missing_libraries(&self) -> &[String] {
        &self.missing_libraries
    }

    pub fn missing_assets(&self) -> &[String] {
        &self.missing_assets
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn last_error(&self) -> Option<&Arc<BootstrapError>> {
        self.last_error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn total_missing(&self) -> usize {
        self.missing_files.len() + self.missing_libraries.len() + self.missing_assets.len()
    }

    pub fn needs_download(&self) -> bool {
        self.total_missing() > 0
    }

    // ── Mutators (engine-internal, called under the state mutex) ──

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub(crate) fn set_can_launch(&mut self, can_launch: bool) {
        self.can_launch = can_launch;
    }

    pub(crate) fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub(crate) fn set_last_error(&mut self, error: BootstrapError) {
        self.last_error = Some(Arc::new(error));
    }

    pub(crate) fn add_missing_file(&mut self, file: impl Into<String>) {
        push_unique(&mut self.missing_files, file.into());
    }

    pub(crate) fn remove_missing_file(&mut self, file: &str) {
        self.missing_files.retain(|f| f != file);
    }

    pub(crate) fn add_missing_library(&mut self, path: impl Into<String>) {
        push_unique(&mut self.missing_libraries, path.into());
    }

    pub(crate) fn remove_missing_library(&mut self, path: &str) {
        self.missing_libraries.retain(|p| p != path);
    }

    pub(crate) fn add_missing_asset(&mut self, name: impl Into<String>) {
        push_unique(&mut self.missing_assets, name.into());
    }

    pub(crate) fn remove_missing_asset(&mut self, name: &str) {
        self.missing_assets.retain(|n| n != name);
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

fn push_unique(set: &mut Vec<String>, value: String) {
    if !set.iter().any(|v| *v == value) {
        set.push(value);
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LaunchState{{initialized={}, can_launch={}, missing={}, status='{}'}}",
            self.initialized,
            self.can_launch,
            self.total_missing(),
            self.status_message
        )
    }
}

// ─── Download Session ───

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Initializing,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Cancelled
        )
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadStatus::Initializing => "initializing",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

type ProgressCallback = Arc<dyn Fn(&DownloadState) + Send + Sync>;
type StatusCallback = Arc<dyn Fn(DownloadStatus) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&BootstrapError) + Send + Sync>;

/// One download session. Counters are atomic and monotonic;
/// `current_file` is last-writer-wins. Callbacks run synchronously on the
/// worker that observed the change and must not block.
pub struct DownloadState {
    total_files: AtomicUsize,
    completed_files: AtomicUsize,
    failed_files: AtomicUsize,
    total_bytes: AtomicU64,
    downloaded_bytes: AtomicU64,
    current_file: Mutex<String>,
    status_tx: watch::Sender<DownloadStatus>,
    progress_callback: Mutex<Option<ProgressCallback>>,
    status_callback: Mutex<Option<StatusCallback>>,
    error_callback: Mutex<Option<ErrorCallback>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadState {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(DownloadStatus::Initializing);
        Self {
            total_files: AtomicUsize::new(0),
            completed_files: AtomicUsize::new(0),
            failed_files: AtomicUsize::new(0),
            total_bytes: AtomicU64::new(0),
            downloaded_bytes: AtomicU64::new(0),
            current_file: Mutex::new(String::new()),
            status_tx,
            progress_callback: Mutex::new(None),
            status_callback: Mutex::new(None),
            error_callback: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    // ── Observation ──

    pub fn total_files(&self) -> usize {
        self.total_files.load(Ordering::Relaxed)
    }

    pub fn completed_files(&self) -> usize {
        self.completed_files.load(Ordering::Relaxed)
    }

    pub fn failed_files(&self) -> usize {
        self.failed_files.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    pub fn current_file(&self) -> String {
        self.current_file.lock().unwrap().clone()
    }

    pub fn status(&self) -> DownloadStatus {
        *self.status_tx.borrow()
    }

    pub fn is_downloading(&self) -> bool {
        self.status() == DownloadStatus::Downloading
    }

    pub fn is_completed(&self) -> bool {
        self.status() == DownloadStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status() == DownloadStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == DownloadStatus::Cancelled
    }

    /// Completed fraction in [0, 1]; 0 when nothing is scheduled.
    pub fn progress(&self) -> f64 {
        let total = self.total_files();
        if total == 0 {
            return 0.0;
        }
        self.completed_files() as f64 / total as f64
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress() * 100.0
    }

    pub fn bytes_progress(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        self.downloaded_bytes() as f64 / total as f64
    }

    pub fn formatted_progress(&self) -> String {
        format!(
            "{}/{} files ({:.1}%)",
            self.completed_files(),
            self.total_files(),
            self.progress_percentage()
        )
    }

    pub fn formatted_bytes_progress(&self) -> String {
        format!(
            "{}/{} ({:.1}%)",
            format_bytes(self.downloaded_bytes()),
            format_bytes(self.total_bytes()),
            self.bytes_progress() * 100.0
        )
    }

    // ── Callback registration ──

    pub fn on_progress(&self, callback: impl Fn(&DownloadState) + Send + Sync + 'static) {
        *self.progress_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn on_status(&self, callback: impl Fn(DownloadStatus) + Send + Sync + 'static) {
        *self.status_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn on_error(&self, callback: impl Fn(&BootstrapError) + Send + Sync + 'static) {
        *self.error_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    // ── Session control ──

    /// Resolve once the session reaches a terminal status.
    pub async fn wait_for_completion(&self) {
        let mut rx = self.status_tx.subscribe();
        loop {
            if rx.borrow_and_update().is_terminal() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Cancel the session. In-flight per-file downloads are not forcibly
    /// aborted but their results are discarded; a later `init()`
    /// re-establishes truth against disk.
    pub fn cancel(&self) {
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            if !handle.is_finished() {
                handle.abort();
                self.set_status(DownloadStatus::Cancelled);
            }
        }
    }

    // ── Mutation (engine-internal) ──

    pub(crate) fn set_total_files(&self, total: usize) {
        self.total_files.store(total, Ordering::Relaxed);
        self.notify_progress();
    }

    pub(crate) fn increment_completed_files(&self) {
        self.completed_files.fetch_add(1, Ordering::Relaxed);
        self.notify_progress();
    }

    pub(crate) fn increment_failed_files(&self) {
        self.failed_files.fetch_add(1, Ordering::Relaxed);
        self.notify_progress();
    }

    pub(crate) fn add_total_bytes(&self, bytes: u64) {
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.notify_progress();
    }

    pub(crate) fn add_downloaded_bytes(&self, bytes: u64) {
        self.downloaded_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.notify_progress();
    }

    pub(crate) fn set_current_file(&self, file: impl Into<String>) {
        *self.current_file.lock().unwrap() = file.into();
        self.notify_progress();
    }

    pub(crate) fn set_status(&self, status: DownloadStatus) {
        self.status_tx.send_replace(status);
        let callback = self.status_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(status);
        }
        self.notify_progress();
    }

    pub(crate) fn attach_task(&self, handle: JoinHandle<()>) {
        *self.task.lock().unwrap() = Some(handle);
    }

    pub(crate) fn notify_error(&self, error: &BootstrapError) {
        let callback = self.error_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    fn notify_progress(&self) {
        let callback = self.progress_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(self);
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download{{status={}, progress={}, current='{}'}}",
            self.status(),
            self.formatted_progress(),
            self.current_file()
        )
    }
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sets_stay_unique() {
        let mut state = LaunchState::new();
        state.add_missing_library("a/b.jar");
        state.add_missing_library("a/b.jar");
        state.add_missing_library("c/d.jar");
        assert_eq!(state.missing_libraries(), ["a/b.jar", "c/d.jar"]);
    }

    #[test]
    fn remove_absent_entry_is_noop() {
        let mut state = LaunchState::new();
        state.add_missing_file("client.jar");
        state.remove_missing_file("version.json");
        assert_eq!(state.missing_files(), ["client.jar"]);
    }

    #[test]
    fn total_missing_sums_all_sets() {
        let mut state = LaunchState::new();
        state.add_missing_file("version.json");
        state.add_missing_library("a/b.jar");
        state.add_missing_asset("minecraft/lang/en_us.json");
        assert_eq!(state.total_missing(), 3);
        assert!(state.needs_download());
    }

    #[test]
    fn reset_restores_pristine_state() {
        let mut state = LaunchState::new();
        state.add_missing_file("client.jar");
        state.set_initialized(true);
        state.set_can_launch(true);
        state.set_last_error(BootstrapError::VersionNotFound("x".into()));

        state.reset();

        assert!(!state.initialized());
        assert!(!state.can_launch());
        assert_eq!(state.total_missing(), 0);
        assert!(!state.has_error());
        assert_eq!(state.status_message(), "Not initialized");
    }

    #[test]
    fn progress_is_zero_without_work() {
        let download = DownloadState::new();
        assert_eq!(download.progress(), 0.0);
        assert_eq!(download.formatted_progress(), "0/0 files (0.0%)");
    }

    #[test]
    fn progress_fraction() {
        let download = DownloadState::new();
        download.set_total_files(4);
        download.increment_completed_files();
        download.increment_completed_files();
        assert_eq!(download.progress(), 0.5);
        assert_eq!(download.formatted_progress(), "2/4 files (50.0%)");
    }

    #[test]
    fn progress_callback_fires_on_counter_updates() {
        let download = DownloadState::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        download.on_progress(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        download.set_total_files(2);
        download.increment_completed_files();
        download.set_current_file("client.jar");
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn status_callback_observes_transitions() {
        let download = DownloadState::new();
        let last = Arc::new(Mutex::new(None));
        let seen = last.clone();
        download.on_status(move |status| {
            *seen.lock().unwrap() = Some(status);
        });

        download.set_status(DownloadStatus::Downloading);
        assert_eq!(*last.lock().unwrap(), Some(DownloadStatus::Downloading));
        assert!(download.is_downloading());

        download.set_status(DownloadStatus::Completed);
        assert!(download.is_completed());
        assert!(download.status().is_terminal());
    }

    #[tokio::test]
    async fn wait_for_completion_resolves_on_terminal_status() {
        let download = Arc::new(DownloadState::new());
        let waiter = download.clone();
        let wait = tokio::spawn(async move { waiter.wait_for_completion().await });

        download.set_status(DownloadStatus::Downloading);
        download.set_status(DownloadStatus::Completed);
        wait.await.unwrap();
    }

    #[test]
    fn format_bytes_boundaries() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
