//! Events published by the object tree.

use std::collections::BTreeMap;

use super::path::ObjectPath;
use super::property::Variant;
use super::{JOB_INTERFACE, MANAGER_INTERFACE, PROPERTIES_INTERFACE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// `org.freedesktop.DBus.Properties.PropertiesChanged` from any object.
    PropertiesChanged {
        path: ObjectPath,
        interface: String,
        changed: BTreeMap<String, Variant>,
        invalidated: Vec<String>,
    },
    /// `org.freedesktop.sysupdate1.Manager.JobRemoved`.
    JobRemoved {
        id: u64,
        path: ObjectPath,
        status: i32,
    },
}

impl Signal {
    pub fn progress_changed(path: ObjectPath, progress: u32) -> Self {
        let mut changed = BTreeMap::new();
        changed.insert("Progress".to_string(), Variant::U32(progress));
        Self::PropertiesChanged {
            path,
            interface: JOB_INTERFACE.to_string(),
            changed,
            invalidated: Vec::new(),
        }
    }

    /// Object the signal is emitted from.
    pub fn path(&self) -> ObjectPath {
        match self {
            Self::PropertiesChanged { path, .. } => path.clone(),
            Self::JobRemoved { .. } => ObjectPath::manager(),
        }
    }

    /// Interface the signal member belongs to.
    pub fn interface(&self) -> &'static str {
        match self {
            Self::PropertiesChanged { .. } => PROPERTIES_INTERFACE,
            Self::JobRemoved { .. } => MANAGER_INTERFACE,
        }
    }

    pub fn member(&self) -> &'static str {
        match self {
            Self::PropertiesChanged { .. } => "PropertiesChanged",
            Self::JobRemoved { .. } => "JobRemoved",
        }
    }
}
