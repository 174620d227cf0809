//! JSON shape returned by `Target.Describe`.
//!
//! Clients parse this document, so field names and nesting are fixed.

use serde::{Deserialize, Serialize};

use super::target::Target;

/// Modification times are fixed so the same version always describes the same way.
const IMAGE_MTIME_USEC: u64 = 1_756_074_882_866_705;
const UKI_MTIME_USEC: u64 = 1_756_082_194_000_000;

/// 0640
const IMAGE_MODE: u32 = 0o640;
/// 0600
const UKI_MODE: u32 = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    RegularFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub path: String,
    /// Microseconds since the epoch.
    pub mtime: u64,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescription {
    pub version: String,
    pub newest: bool,
    pub available: bool,
    pub installed: bool,
    pub obsolete: bool,
    pub protected: bool,
    pub incomplete: bool,
    pub changelog_urls: Vec<String>,
    pub contents: Vec<ContentEntry>,
}

impl VersionDescription {
    pub fn for_target(target: &Target, version: &str) -> Self {
        let installed = version == target.version();
        let available = target.is_available(version);
        Self {
            version: version.to_string(),
            newest: version == target.latest(),
            available,
            installed,
            obsolete: available && !installed && version < target.version(),
            protected: installed,
            incomplete: false,
            changelog_urls: Vec::new(),
            contents: vec![
                ContentEntry {
                    kind: ContentKind::RegularFile,
                    path: format!("/system/{}_{}.erofs", target.name(), version),
                    mtime: IMAGE_MTIME_USEC,
                    mode: IMAGE_MODE,
                },
                ContentEntry {
                    kind: ContentKind::RegularFile,
                    path: format!("/boot/EFI/Linux/{}_{}.efi", target.name(), version),
                    mtime: UKI_MTIME_USEC,
                    mode: UKI_MODE,
                },
            ],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::sysupdate::{JobRegistry, SimulationConfig, TargetConfig};

    fn os_target() -> Target {
        Target::new(
            TargetConfig::os(),
            Arc::new(JobRegistry::new(SimulationConfig::default())),
        )
        .unwrap()
    }

    #[test]
    fn test_describe_field_names() {
        let json = os_target().describe("2.0.0", false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "version",
            "newest",
            "available",
            "installed",
            "obsolete",
            "protected",
            "incomplete",
            "changelogUrls",
            "contents",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        let entry = &value["contents"][0];
        assert_eq!(entry["type"], "regular-file");
        assert_eq!(entry["mode"], 416);
        assert!(entry["mtime"].is_u64());
        assert!(entry["path"].as_str().unwrap().ends_with("os_2.0.0.erofs"));
        assert_eq!(value["contents"][1]["mode"], 384);
    }

    #[test]
    fn test_describe_flags_follow_version_list() {
        let target = os_target();

        let newest = VersionDescription::for_target(&target, "2.0.0");
        assert!(newest.newest && newest.available && !newest.installed && !newest.obsolete);

        let current = VersionDescription::for_target(&target, "1.0.0");
        assert!(current.installed && current.protected && !current.newest);

        let unknown = VersionDescription::for_target(&target, "9.9.9");
        assert!(!unknown.available && !unknown.installed && !unknown.newest);
        assert_eq!(unknown.version, "9.9.9");
    }

    #[test]
    fn test_describe_is_deterministic() {
        let target = os_target();
        assert_eq!(
            target.describe("1.2.0", true).unwrap(),
            target.describe("1.2.0", false).unwrap()
        );
    }
}
