//! Object paths and their mapping onto object roles.

use std::fmt;

use serde::{Deserialize, Serialize};

const MANAGER_PATH: &str = "/org/freedesktop/sysupdate1";
const TARGET_PREFIX: &str = "/org/freedesktop/sysupdate1/target/";
const JOB_PREFIX: &str = "/org/freedesktop/sysupdate1/job/";

/// Bus object path (`o` in D-Bus signatures).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn manager() -> Self {
        Self(MANAGER_PATH.to_string())
    }

    pub fn target(name: &str) -> Self {
        Self(format!("{}{}", TARGET_PREFIX, name))
    }

    pub fn job(id: u64) -> Self {
        Self(format!("{}{}", JOB_PREFIX, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role an object path addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Manager,
    Target(String),
    Job(u64),
}

impl ObjectRef {
    /// Resolve a path to a role. Returns `None` for paths outside the
    /// service's tree; whether the named target or job exists is checked
    /// later against the manager.
    pub fn parse(path: &str) -> Option<Self> {
        if path == MANAGER_PATH {
            return Some(Self::Manager);
        }
        if let Some(name) = path.strip_prefix(TARGET_PREFIX) {
            if name.is_empty() || name.contains('/') {
                return None;
            }
            return Some(Self::Target(name.to_string()));
        }
        if let Some(id) = path.strip_prefix(JOB_PREFIX) {
            return id.parse::<u64>().ok().map(Self::Job);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_to_roles() {
        assert_eq!(ObjectRef::parse(ObjectPath::manager().as_str()), Some(ObjectRef::Manager));
        assert_eq!(
            ObjectRef::parse(ObjectPath::target("os").as_str()),
            Some(ObjectRef::Target("os".into()))
        );
        assert_eq!(
            ObjectRef::parse(ObjectPath::job(1756074882866).as_str()),
            Some(ObjectRef::Job(1756074882866))
        );
    }

    #[test]
    fn test_foreign_paths_rejected() {
        assert_eq!(ObjectRef::parse("/"), None);
        assert_eq!(ObjectRef::parse("/org/freedesktop/sysupdate1/target/"), None);
        assert_eq!(ObjectRef::parse("/org/freedesktop/sysupdate1/target/os/extra"), None);
        assert_eq!(ObjectRef::parse("/org/freedesktop/sysupdate1/job/abc"), None);
        assert_eq!(ObjectRef::parse("/org/freedesktop/login1"), None);
    }

    #[test]
    fn test_object_path_serializes_as_string() {
        let json = serde_json::to_string(&ObjectPath::job(7)).unwrap();
        assert_eq!(json, "\"/org/freedesktop/sysupdate1/job/7\"");
    }
}
