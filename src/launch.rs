// ─── Launch Command ───
// Deterministic argv assembly and process spawn for the game client.

use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LaunchConfig;
use crate::error::{BootstrapError, BootstrapResult};
use crate::version::{current_arch, current_os_name, VersionDescriptor};

/// Offline-profile access token accepted by vanilla clients.
const OFFLINE_ACCESS_TOKEN: &str = "0";

/// Platform classpath separator: `;` on Windows, `:` elsewhere.
pub fn classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// Classpath for the current host: the client jar first, then every
/// admitted library's main artifact. Native-only entries are excluded.
pub fn build_classpath(config: &LaunchConfig, descriptor: &VersionDescriptor) -> String {
    build_classpath_for(config, descriptor, current_os_name(), current_arch())
}

fn build_classpath_for(
    config: &LaunchConfig,
    descriptor: &VersionDescriptor,
    os_name: &str,
    arch: &str,
) -> String {
    let mut entries = vec![path_str(&config.version_jar_path)];

    for library in &descriptor.libraries {
        if !library.is_allowed_for(os_name, arch) {
            continue;
        }
        if let Some(artifact) = &library.downloads.artifact {
            entries.push(path_str(&config.libraries_dir.join(&artifact.path)));
        }
    }

    entries.join(classpath_separator())
}

/// The full argv for the game process, in launch order: the `java`
/// binary, memory flags, custom JVM args, classpath, main class, game
/// args, custom game args. A fresh v4 UUID is generated per call.
pub fn build_launch_command(config: &LaunchConfig, descriptor: &VersionDescriptor) -> Vec<String> {
    build_launch_command_for(config, descriptor, current_os_name(), current_arch())
}

fn build_launch_command_for(
    config: &LaunchConfig,
    descriptor: &VersionDescriptor,
    os_name: &str,
    arch: &str,
) -> Vec<String> {
    let mut command = Vec::new();

    command.push("java".to_string());

    command.push(format!("-Xmx{}m", config.max_memory_mb));
    command.push(format!("-Xms{}m", config.min_memory_mb));

    for (flag, value) in &config.custom_jvm_args {
        command.push(flag.clone());
        if !value.is_empty() {
            command.push(value.clone());
        }
    }

    command.push("-cp".to_string());
    command.push(build_classpath_for(config, descriptor, os_name, arch));

    command.push(descriptor.main_class.clone());

    command.extend(game_arguments(config, descriptor));

    command
}

fn game_arguments(config: &LaunchConfig, descriptor: &VersionDescriptor) -> Vec<String> {
    let mut args = vec![
        "--username".to_string(),
        config.username.clone(),
        "--version".to_string(),
        descriptor.id.clone(),
        "--gameDir".to_string(),
        path_str(&config.mc_dir),
        "--assetsDir".to_string(),
        path_str(&config.assets_dir),
        "--assetIndex".to_string(),
        descriptor.asset_index.id.clone(),
        "--uuid".to_string(),
        Uuid::new_v4().to_string(),
        "--accessToken".to_string(),
        OFFLINE_ACCESS_TOKEN.to_string(),
        "--userType".to_string(),
        "mojang".to_string(),
        "--versionType".to_string(),
        descriptor.version_type.clone(),
    ];

    for (flag, value) in &config.custom_game_args {
        args.push(flag.clone());
        if !value.is_empty() {
            args.push(value.clone());
        }
    }

    args
}

/// Spawn the game with working directory `mc_dir` and inherited stdio.
pub fn spawn_game(config: &LaunchConfig, descriptor: &VersionDescriptor) -> BootstrapResult<Child> {
    let argv = build_launch_command(config, descriptor);
    info!("Launching Minecraft: {}", argv.join(" "));
    debug!("Working directory: {:?}", config.mc_dir);

    let child = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(&config.mc_dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| BootstrapError::io(&config.mc_dir, e))?;

    Ok(child)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{
        Artifact, AssetIndexRef, DownloadRef, Library, LibraryDownloads, Natives, OsRule, Rule,
        RuleAction, VersionDownloads,
    };
    use chrono::TimeZone;

    fn config() -> LaunchConfig {
        LaunchConfig::new()
            .username("Steve")
            .mc_dir("/mc")
            .libraries("/mc/libraries")
            .assets("/mc/assets")
            .discover_version("1.20.1")
    }

    fn artifact(path: &str) -> Artifact {
        Artifact {
            path: path.into(),
            url: None,
            sha1: None,
            size: None,
        }
    }

    fn descriptor(libraries: Vec<Library>) -> VersionDescriptor {
        VersionDescriptor {
            id: "1.20.1".into(),
            version_type: "release".into(),
            release_time: chrono::Utc.with_ymd_and_hms(2023, 6, 12, 13, 25, 51).unwrap(),
            main_class: "net.minecraft.client.main.Main".into(),
            asset_index: AssetIndexRef {
                id: "5".into(),
                url: "https://example.com/5.json".into(),
                sha1: "a0".into(),
                size: 1,
                total_size: None,
            },
            downloads: VersionDownloads {
                client: DownloadRef {
                    url: "https://example.com/client.jar".into(),
                    sha1: "c0".into(),
                    size: 1,
                },
            },
            libraries,
        }
    }

    fn plain_library(path: &str) -> Library {
        Library {
            name: path.into(),
            downloads: LibraryDownloads {
                artifact: Some(artifact(path)),
                classifiers: None,
            },
            rules: None,
            natives: None,
        }
    }

    #[test]
    fn classpath_starts_with_client_jar() {
        let descriptor = descriptor(vec![plain_library("com/a/a/1/a-1.jar")]);
        let classpath = build_classpath_for(&config(), &descriptor, "linux", "x86_64");
        let entries: Vec<&str> = classpath.split(classpath_separator()).collect();
        assert_eq!(entries[0], "/mc/versions/1.20.1/1.20.1.jar");
        assert_eq!(entries[1], "/mc/libraries/com/a/a/1/a-1.jar");
    }

    #[test]
    fn classpath_excludes_disallowed_and_native_only_entries() {
        let mut osx_only = plain_library("com/osx/osx/1/osx-1.jar");
        osx_only.rules = Some(vec![Rule {
            action: RuleAction::Allow,
            os: Some(OsRule {
                name: Some("osx".into()),
                arch: None,
                version: None,
            }),
        }]);

        let native_only = Library {
            name: "org.lwjgl:lwjgl-platform:2.9.4".into(),
            downloads: LibraryDownloads {
                artifact: None,
                classifiers: Some(
                    [(
                        "natives-linux".to_string(),
                        artifact("org/lwjgl/platform-natives-linux.jar"),
                    )]
                    .into(),
                ),
            },
            rules: None,
            natives: Some(Natives {
                linux: Some("natives-linux".into()),
                osx: None,
                windows: None,
            }),
        };

        let descriptor = descriptor(vec![osx_only, native_only, plain_library("com/b/b/1/b-1.jar")]);
        let classpath = build_classpath_for(&config(), &descriptor, "linux", "x86_64");

        assert!(!classpath.contains("osx-1.jar"));
        assert!(!classpath.contains("natives-linux"));
        assert!(classpath.contains("b-1.jar"));
    }

    #[test]
    fn command_order_and_offline_profile() {
        let config = config()
            .jvm_arg("-XX:+UseG1GC", "")
            .game_arg("--demo", "");
        let descriptor = descriptor(vec![]);
        let argv = build_launch_command_for(&config, &descriptor, "linux", "x86_64");

        assert_eq!(argv[0], "java");
        assert_eq!(argv[1], "-Xmx2048m");
        assert_eq!(argv[2], "-Xms512m");
        assert_eq!(argv[3], "-XX:+UseG1GC");
        assert_eq!(argv[4], "-cp");
        assert_eq!(argv[6], "net.minecraft.client.main.Main");

        assert_eq!(argv.iter().filter(|a| *a == "-cp").count(), 1);

        let token_at = argv.iter().position(|a| a == "--accessToken").unwrap();
        assert_eq!(argv[token_at + 1], "0");
        let user_type_at = argv.iter().position(|a| a == "--userType").unwrap();
        assert_eq!(argv[user_type_at + 1], "mojang");
        let version_type_at = argv.iter().position(|a| a == "--versionType").unwrap();
        assert_eq!(argv[version_type_at + 1], "release");
        assert_eq!(argv.last().unwrap(), "--demo");
    }

    #[test]
    fn uuid_is_fresh_per_invocation() {
        let config = config();
        let descriptor = descriptor(vec![]);
        let uuid_of = |argv: &[String]| {
            let at = argv.iter().position(|a| a == "--uuid").unwrap();
            argv[at + 1].clone()
        };

        let first = uuid_of(&build_launch_command_for(&config, &descriptor, "linux", "x86_64"));
        let second = uuid_of(&build_launch_command_for(&config, &descriptor, "linux", "x86_64"));
        assert!(Uuid::parse_str(&first).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn jvm_flag_with_value_emits_both() {
        let config = config().jvm_arg("-Dminecraft.launcher.brand", "mc-bootstrap");
        let descriptor = descriptor(vec![]);
        let argv = build_launch_command_for(&config, &descriptor, "linux", "x86_64");
        let at = argv
            .iter()
            .position(|a| a == "-Dminecraft.launcher.brand")
            .unwrap();
        assert_eq!(argv[at + 1], "mc-bootstrap");
    }

    #[test]
    fn game_args_reference_descriptor_identity() {
        let config = config();
        let descriptor = descriptor(vec![]);
        let argv = build_launch_command_for(&config, &descriptor, "linux", "x86_64");

        let version_at = argv.iter().position(|a| a == "--version").unwrap();
        assert_eq!(argv[version_at + 1], "1.20.1");
        let index_at = argv.iter().position(|a| a == "--assetIndex").unwrap();
        assert_eq!(argv[index_at + 1], "5");
        let assets_at = argv.iter().position(|a| a == "--assetsDir").unwrap();
        assert_eq!(argv[assets_at + 1], "/mc/assets");
    }
}
