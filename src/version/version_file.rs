// ─── Version Descriptor ───
// The per-version JSON: main class, client download, asset index pointer,
// and the library list with its OS rules and native classifiers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{BootstrapError, BootstrapResult};

pub const LIBRARIES_URL: &str = "https://libraries.minecraft.net";

/// A fully parsed version descriptor. Unknown upstream fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub release_time: DateTime<Utc>,
    pub main_class: String,
    pub asset_index: AssetIndexRef,
    pub downloads: VersionDownloads,
    #[serde(default)]
    pub libraries: Vec<Library>,
}

/// Pointer to the asset index document for this version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub sha1: String,
    pub size: u64,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: DownloadRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRef {
    pub url: String,
    pub sha1: String,
    pub size: u64,
}

// ─── Libraries ───

/// One library entry. `downloads.artifact` carries the JVM jar,
/// `downloads.classifiers` the platform-specific native jars keyed by the
/// classifier strings in `natives`.
#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    pub downloads: LibraryDownloads,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub natives: Option<Natives>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, Artifact>>,
}

/// A downloadable jar. Used both for main artifacts and for native
/// classifiers; the caller's context decides the role. `path` is the
/// Maven-style relative path under the libraries directory.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Artifact {
    /// Absolute download URL: the declared one when it is absolute,
    /// otherwise the default libraries endpoint plus the Maven path.
    pub fn resolve_url(&self) -> String {
        match &self.url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.clone(),
            _ => format!("{}/{}", LIBRARIES_URL, self.path),
        }
    }
}

// ─── OS Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl Rule {
    /// Whether this rule applies to the given host. A rule without an `os`
    /// block matches unconditionally; `name` is an exact match against the
    /// normalized OS name, `arch` a substring match against the host arch.
    fn matches(&self, os_name: &str, arch: &str) -> bool {
        let os = match &self.os {
            None => return true,
            Some(os) => os,
        };
        if let Some(name) = &os.name {
            if name != os_name {
                return false;
            }
        }
        if let Some(rule_arch) = &os.arch {
            if !arch.contains(rule_arch.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Platform-specific native classifier names.
#[derive(Debug, Clone, Deserialize)]
pub struct Natives {
    #[serde(default)]
    pub linux: Option<String>,
    #[serde(default)]
    pub osx: Option<String>,
    #[serde(default)]
    pub windows: Option<String>,
}

impl Library {
    /// Evaluate the library's rules against an explicit host identity.
    ///
    /// Mojang semantics: no rules → allowed; otherwise the action of the
    /// last matching rule wins, and no match at all means rejected.
    pub fn is_allowed_for(&self, os_name: &str, arch: &str) -> bool {
        let rules = match &self.rules {
            Some(rules) if !rules.is_empty() => rules,
            _ => return true,
        };

        let mut allowed = false;
        for rule in rules {
            if rule.matches(os_name, arch) {
                allowed = rule.action == RuleAction::Allow;
            }
        }
        allowed
    }

    pub fn is_allowed_for_current_os(&self) -> bool {
        self.is_allowed_for(current_os_name(), current_arch())
    }

    /// The native classifier string for the given OS, with `${arch}`
    /// substituted by the host pointer width.
    pub fn native_classifier_for(&self, os_name: &str) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let raw = match os_name {
            "windows" => natives.windows.as_ref(),
            "osx" => natives.osx.as_ref(),
            "linux" => natives.linux.as_ref(),
            _ => None,
        }?;

        let arch = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        Some(raw.replace("${arch}", arch))
    }

    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        self.native_classifier_for(current_os_name())
    }

    /// The native artifact selected by the classifier for the given OS.
    pub fn native_artifact_for(&self, os_name: &str) -> Option<&Artifact> {
        let classifier = self.native_classifier_for(os_name)?;
        self.downloads.classifiers.as_ref()?.get(&classifier)
    }
}

/// The Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// The runtime architecture string, matched as a substring by `os.arch`
/// rules.
pub fn current_arch() -> &'static str {
    std::env::consts::ARCH
}

impl VersionDescriptor {
    /// Fetch a descriptor from `url`, returning both the parsed value and
    /// the raw body so the caller can persist it byte-for-byte.
    pub async fn fetch(
        client: &reqwest::Client,
        url: &str,
    ) -> BootstrapResult<(Self, String)> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let descriptor: VersionDescriptor = serde_json::from_str(&raw)?;
        Ok((descriptor, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(rules: Option<Vec<Rule>>, natives: Option<Natives>) -> Library {
        Library {
            name: "test:lib:1.0".into(),
            downloads: LibraryDownloads {
                artifact: None,
                classifiers: None,
            },
            rules,
            natives,
        }
    }

    fn allow_os(name: &str) -> Rule {
        Rule {
            action: RuleAction::Allow,
            os: Some(OsRule {
                name: Some(name.into()),
                arch: None,
                version: None,
            }),
        }
    }

    #[test]
    fn no_rules_means_allowed() {
        let lib = library(None, None);
        assert!(lib.is_allowed_for("windows", "x86_64"));
        assert!(lib.is_allowed_for("osx", "aarch64"));
    }

    #[test]
    fn empty_rules_means_allowed() {
        let lib = library(Some(vec![]), None);
        assert!(lib.is_allowed_for("linux", "x86_64"));
    }

    #[test]
    fn allow_rule_admits_named_host_only() {
        let lib = library(Some(vec![allow_os("windows")]), None);
        assert!(lib.is_allowed_for("windows", "x86_64"));
        assert!(!lib.is_allowed_for("linux", "x86_64"));
        assert!(!lib.is_allowed_for("osx", "x86_64"));
    }

    #[test]
    fn disallow_osx_admits_other_hosts() {
        let lib = library(
            Some(vec![
                Rule {
                    action: RuleAction::Allow,
                    os: None,
                },
                Rule {
                    action: RuleAction::Disallow,
                    os: Some(OsRule {
                        name: Some("osx".into()),
                        arch: None,
                        version: None,
                    }),
                },
            ]),
            None,
        );
        assert!(lib.is_allowed_for("windows", "x86_64"));
        assert!(lib.is_allowed_for("linux", "x86_64"));
        assert!(!lib.is_allowed_for("osx", "x86_64"));
    }

    #[test]
    fn last_matching_rule_wins() {
        let lib = library(
            Some(vec![
                Rule {
                    action: RuleAction::Disallow,
                    os: None,
                },
                allow_os("linux"),
            ]),
            None,
        );
        assert!(lib.is_allowed_for("linux", "x86_64"));
        assert!(!lib.is_allowed_for("windows", "x86_64"));
    }

    #[test]
    fn arch_rule_is_substring_match() {
        let lib = library(
            Some(vec![Rule {
                action: RuleAction::Allow,
                os: Some(OsRule {
                    name: None,
                    arch: Some("x86".into()),
                    version: None,
                }),
            }]),
            None,
        );
        assert!(lib.is_allowed_for("linux", "x86_64"));
        assert!(!lib.is_allowed_for("linux", "aarch64"));
    }

    #[test]
    fn native_classifier_per_os() {
        let lib = library(
            None,
            Some(Natives {
                linux: Some("natives-linux".into()),
                osx: None,
                windows: Some("natives-windows".into()),
            }),
        );
        assert_eq!(
            lib.native_classifier_for("linux").as_deref(),
            Some("natives-linux")
        );
        assert_eq!(lib.native_classifier_for("osx"), None);
    }

    #[test]
    fn native_classifier_substitutes_arch() {
        let lib = library(
            None,
            Some(Natives {
                linux: None,
                osx: None,
                windows: Some("natives-windows-${arch}".into()),
            }),
        );
        let classifier = lib.native_classifier_for("windows").unwrap();
        assert!(classifier == "natives-windows-64" || classifier == "natives-windows-32");
    }

    #[test]
    fn artifact_url_resolution() {
        let absolute = Artifact {
            path: "com/example/lib/1.0/lib-1.0.jar".into(),
            url: Some("https://example.com/lib-1.0.jar".into()),
            sha1: None,
            size: None,
        };
        assert_eq!(absolute.resolve_url(), "https://example.com/lib-1.0.jar");

        let relative = Artifact {
            path: "com/example/lib/1.0/lib-1.0.jar".into(),
            url: None,
            sha1: None,
            size: None,
        };
        assert_eq!(
            relative.resolve_url(),
            "https://libraries.minecraft.net/com/example/lib/1.0/lib-1.0.jar"
        );
    }

    #[test]
    fn deserialize_descriptor() {
        let json = r#"{
            "id": "1.20.1",
            "type": "release",
            "releaseTime": "2023-06-12T13:25:51+00:00",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": {
                "id": "5",
                "sha1": "a0b1",
                "size": 412518,
                "totalSize": 624594507,
                "url": "https://example.com/5.json"
            },
            "downloads": {
                "client": { "sha1": "c0ffee", "size": 24476931, "url": "https://example.com/client.jar" }
            },
            "libraries": [
                {
                    "name": "org.lwjgl:lwjgl:3.3.1",
                    "downloads": {
                        "artifact": {
                            "path": "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar",
                            "sha1": "f000",
                            "size": 724243,
                            "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar"
                        }
                    },
                    "rules": [{ "action": "allow", "os": { "name": "linux" } }]
                }
            ],
            "unknownField": { "ignored": true }
        }"#;
        let descriptor: VersionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.id, "1.20.1");
        assert_eq!(descriptor.main_class, "net.minecraft.client.main.Main");
        assert_eq!(descriptor.asset_index.id, "5");
        assert_eq!(descriptor.downloads.client.size, 24476931);
        assert_eq!(descriptor.libraries.len(), 1);
        assert!(descriptor.libraries[0].is_allowed_for("linux", "x86_64"));
        assert!(!descriptor.libraries[0].is_allowed_for("windows", "x86_64"));
    }

    #[test]
    fn classifiers_deserialize_as_artifacts() {
        let json = r#"{
            "name": "org.lwjgl:lwjgl-platform:2.9.4",
            "downloads": {
                "classifiers": {
                    "natives-linux": {
                        "path": "org/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar",
                        "sha1": "ab12",
                        "size": 578680,
                        "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar"
                    }
                }
            },
            "natives": { "linux": "natives-linux", "windows": "natives-windows" }
        }"#;
        let lib: Library = serde_json::from_str(json).unwrap();
        assert!(lib.downloads.artifact.is_none());
        let native = lib.native_artifact_for("linux").unwrap();
        assert!(native.path.ends_with("natives-linux.jar"));
        assert!(lib.native_artifact_for("osx").is_none());
    }
}
