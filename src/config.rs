use std::path::{Path, PathBuf};

use crate::error::{BootstrapError, BootstrapResult};
use crate::layout;

/// Launch parameters for a single game installation. Built fluently, then
/// handed to [`crate::bootstrap::Bootstrap::new`] which validates it; the
/// engine never mutates the config afterwards.
///
/// Custom JVM and game arguments are `(flag, value)` pairs emitted in
/// insertion order; an empty value emits the flag alone.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfig {
    pub username: String,
    pub version_id: String,
    pub mc_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub version_json_path: PathBuf,
    pub version_jar_path: PathBuf,
    pub max_memory_mb: u32,
    pub min_memory_mb: u32,
    pub custom_jvm_args: Vec<(String, String)>,
    pub custom_game_args: Vec<(String, String)>,
}

impl LaunchConfig {
    pub fn new() -> Self {
        Self {
            max_memory_mb: 2048,
            min_memory_mb: 512,
            ..Default::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn mc_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mc_dir = dir.into();
        self
    }

    pub fn libraries(mut self, dir: impl Into<PathBuf>) -> Self {
        self.libraries_dir = dir.into();
        self
    }

    pub fn assets(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn version_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.version_json_path = path.into();
        self
    }

    pub fn version_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.version_jar_path = path.into();
        self
    }

    pub fn max_memory_mb(mut self, megabytes: u32) -> Self {
        self.max_memory_mb = megabytes;
        self
    }

    pub fn min_memory_mb(mut self, megabytes: u32) -> Self {
        self.min_memory_mb = megabytes;
        self
    }

    pub fn jvm_arg(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_jvm_args.push((flag.into(), value.into()));
        self
    }

    pub fn game_arg(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_game_args.push((flag.into(), value.into()));
        self
    }

    /// Point the config at the platform's standard `.minecraft` directory,
    /// with `libraries/` and `assets/` beneath it.
    pub fn use_default_mc_dir(self) -> Self {
        let mc_dir = layout::default_mc_dir();
        let libraries = mc_dir.join("libraries");
        let assets = mc_dir.join("assets");
        self.mc_dir(mc_dir).libraries(libraries).assets(assets)
    }

    /// Select a version and derive its descriptor and jar paths under
    /// `<mc_dir>/versions/<id>/`. Requires `mc_dir` to be set first.
    pub fn discover_version(mut self, version_id: impl Into<String>) -> Self {
        let version_id = version_id.into();
        let version_dir = self.mc_dir.join("versions").join(&version_id);
        self.version_json_path = version_dir.join(format!("{version_id}.json"));
        self.version_jar_path = version_dir.join(format!("{version_id}.jar"));
        self.version_id = version_id;
        self
    }

    pub(crate) fn validate(&self) -> BootstrapResult<()> {
        if self.username.trim().is_empty() {
            return Err(BootstrapError::InvalidConfig("username is required".into()));
        }
        if is_unset(&self.mc_dir) {
            return Err(BootstrapError::InvalidConfig(
                "minecraft directory is required".into(),
            ));
        }
        if self.version_id.is_empty() {
            return Err(BootstrapError::InvalidConfig(
                "version id is required".into(),
            ));
        }
        if is_unset(&self.version_json_path) || is_unset(&self.version_jar_path) {
            return Err(BootstrapError::InvalidConfig(
                "version descriptor and jar paths are required (see discover_version)".into(),
            ));
        }
        if is_unset(&self.libraries_dir) || is_unset(&self.assets_dir) {
            return Err(BootstrapError::InvalidConfig(
                "libraries and assets directories are required".into(),
            ));
        }
        Ok(())
    }
}

fn is_unset(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> LaunchConfig {
        LaunchConfig::new()
            .username("Steve")
            .mc_dir("/tmp/.minecraft")
            .libraries("/tmp/.minecraft/libraries")
            .assets("/tmp/.minecraft/assets")
            .discover_version("1.20.1")
    }

    #[test]
    fn defaults() {
        let config = LaunchConfig::new();
        assert_eq!(config.max_memory_mb, 2048);
        assert_eq!(config.min_memory_mb, 512);
        assert!(config.custom_jvm_args.is_empty());
    }

    #[test]
    fn discover_version_places_paths_under_versions_dir() {
        let config = valid_config();
        assert_eq!(
            config.version_json_path,
            PathBuf::from("/tmp/.minecraft/versions/1.20.1/1.20.1.json")
        );
        assert_eq!(
            config.version_jar_path,
            PathBuf::from("/tmp/.minecraft/versions/1.20.1/1.20.1.jar")
        );
        assert_eq!(config.version_id, "1.20.1");
    }

    #[test]
    fn validation_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validation_rejects_blank_username() {
        let config = valid_config().username("   ");
        assert!(matches!(
            config.validate(),
            Err(BootstrapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validation_rejects_unset_mc_dir() {
        let config = LaunchConfig::new().username("Steve").discover_version("1.20.1");
        assert!(matches!(
            config.validate(),
            Err(BootstrapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn custom_args_keep_insertion_order() {
        let config = LaunchConfig::new()
            .jvm_arg("-XX:+UseG1GC", "")
            .jvm_arg("-Dfml.ignore", "true")
            .game_arg("--demo", "");
        assert_eq!(config.custom_jvm_args[0].0, "-XX:+UseG1GC");
        assert_eq!(config.custom_jvm_args[1].0, "-Dfml.ignore");
        assert_eq!(config.custom_game_args[0].0, "--demo");
    }
}
