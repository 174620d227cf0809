//! Upgradeable targets and the update jobs they create.

use std::sync::Arc;

use thiserror::Error;

use super::describe::VersionDescription;
use super::job::JOB_TYPE_UPDATE;
use super::path::ObjectPath;
use super::property::{Properties, PropertyName, Variant};
use super::registry::JobRegistry;
use super::{DEFAULT_APPSTREAM_URL, TARGET_INTERFACE};
use crate::telemetry;

/// `Update` flag bit requesting an offline update.
pub const UPDATE_FLAG_OFFLINE: u64 = 1;

/// Vacuum has nothing real to prune; it always reports this many versions.
const SIMULATED_VACUUM_COUNT: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("Target {0} has no available versions")]
    NoVersions(String),

    #[error("Target name {0:?} is not usable in an object path")]
    InvalidName(String),

    #[error("Duplicate target name: {0}")]
    Duplicate(String),
}

/// Startup description of one target.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub name: String,
    pub class: String,
    pub current_version: String,
    /// Oldest to newest.
    pub available_versions: Vec<String>,
    pub appstream_urls: Vec<String>,
}

impl TargetConfig {
    /// The host OS image.
    pub fn os() -> Self {
        Self {
            name: "os".to_string(),
            class: "os".to_string(),
            current_version: "1.0.0".to_string(),
            available_versions: ["1.0.0", "1.1.0", "1.2.0", "2.0.0"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            appstream_urls: vec![DEFAULT_APPSTREAM_URL.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetProperty {
    Class,
    Name,
    Path,
}

impl PropertyName for TargetProperty {
    const ALL: &'static [Self] = &[Self::Class, Self::Name, Self::Path];

    fn as_str(self) -> &'static str {
        match self {
            Self::Class => "Class",
            Self::Name => "Name",
            Self::Path => "Path",
        }
    }
}

/// Result of `Target::update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStarted {
    pub version: String,
    pub job_id: u64,
    pub job_path: ObjectPath,
}

pub struct Target {
    name: String,
    class: String,
    path: ObjectPath,
    current_version: String,
    available_versions: Vec<String>,
    appstream_urls: Vec<String>,
    registry: Arc<JobRegistry>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("current_version", &self.current_version)
            .finish()
    }
}

impl Target {
    pub fn new(config: TargetConfig, registry: Arc<JobRegistry>) -> Result<Self, TargetError> {
        if config.name.is_empty() || config.name.contains('/') {
            return Err(TargetError::InvalidName(config.name));
        }
        if config.available_versions.is_empty() {
            return Err(TargetError::NoVersions(config.name));
        }
        Ok(Self {
            path: ObjectPath::target(&config.name),
            name: config.name,
            class: config.class,
            current_version: config.current_version,
            available_versions: config.available_versions,
            appstream_urls: config.appstream_urls,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Available versions, oldest first. The offline flag is accepted for
    /// interface compatibility and ignored.
    pub fn list(&self, _offline: bool) -> Vec<String> {
        self.available_versions.clone()
    }

    pub fn latest(&self) -> &str {
        // Non-empty by construction.
        self.available_versions
            .last()
            .map(String::as_str)
            .unwrap_or(&self.current_version)
    }

    pub fn is_available(&self, version: &str) -> bool {
        self.available_versions.iter().any(|v| v == version)
    }

    /// Metadata and file contents of `version` as JSON. Any version string
    /// is described; flags are derived from the target's version list.
    pub fn describe(&self, version: &str, _offline: bool) -> Result<String, serde_json::Error> {
        VersionDescription::for_target(self, version).to_json()
    }

    /// Newest version if it sorts after the current one.
    ///
    /// Plain string comparison: "10.0.0" sorts before "2.0.0".
    pub fn check_new(&self) -> Option<&str> {
        let latest = self.latest();
        (latest > self.current_version.as_str()).then_some(latest)
    }

    /// Start a simulated update to `new_version`.
    ///
    /// Bit 0 of `flags` marks the job offline; the rest are ignored.
    pub fn update(&self, new_version: &str, flags: u64) -> UpdateStarted {
        let offline = flags & UPDATE_FLAG_OFFLINE != 0;
        let job = self.registry.start_job(JOB_TYPE_UPDATE, offline);
        telemetry::record_job_started(&self.name);
        tracing::info!(
            target_name = %self.name,
            version = new_version,
            job_id = job.id(),
            offline,
            "Update job started"
        );
        UpdateStarted {
            version: new_version.to_string(),
            job_id: job.id(),
            job_path: job.path().clone(),
        }
    }

    pub fn vacuum(&self) -> u32 {
        tracing::debug!(target_name = %self.name, "Vacuum requested");
        SIMULATED_VACUUM_COUNT
    }

    pub fn appstream(&self) -> &[String] {
        &self.appstream_urls
    }

    /// Currently installed version.
    pub fn version(&self) -> &str {
        &self.current_version
    }
}

impl Properties for Target {
    type Property = TargetProperty;

    const INTERFACE: &'static str = TARGET_INTERFACE;

    fn read(&self, property: TargetProperty) -> Variant {
        match property {
            TargetProperty::Class => Variant::String(self.class.clone()),
            TargetProperty::Name => Variant::String(self.name.clone()),
            // The real daemon reports the backing directory; the object path stands in.
            TargetProperty::Path => Variant::String(self.path.to_string()),
        }
    }
}
