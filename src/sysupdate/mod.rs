//! The sysupdate1 object model: one manager, a fixed set of targets and
//! the live update jobs they spawn.
//!
//! Object roles mirror the real daemon's bus layout:
//!
//! - Manager: `/org/freedesktop/sysupdate1`
//! - Target:  `/org/freedesktop/sysupdate1/target/<name>`
//! - Job:     `/org/freedesktop/sysupdate1/job/<id>`
//!
//! Everything here is in-memory. Jobs only simulate progress; nothing is
//! written to disk and nothing survives a restart.

mod describe;
mod introspect;
mod job;
mod manager;
mod path;
mod property;
mod registry;
mod signal;
mod target;

pub use describe::{ContentEntry, ContentKind, VersionDescription};
pub use introspect::{introspection_xml, INTROSPECTION_XML};
pub use job::{Job, SimulationConfig, JOB_TYPE_UPDATE};
pub use manager::{JobSummary, Manager, ManagerProperty, TargetSummary};
pub use path::{ObjectPath, ObjectRef};
pub use property::{Properties, PropertyError, PropertyName, Variant};
pub use registry::{JobRegistry, JOB_STATUS_SUCCESS};
pub use signal::Signal;
pub use target::{
    Target, TargetConfig, TargetError, TargetProperty, UpdateStarted, UPDATE_FLAG_OFFLINE,
};

pub const MANAGER_INTERFACE: &str = "org.freedesktop.sysupdate1.Manager";
pub const TARGET_INTERFACE: &str = "org.freedesktop.sysupdate1.Target";
pub const JOB_INTERFACE: &str = "org.freedesktop.sysupdate1.Job";

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
pub const PEER_INTERFACE: &str = "org.freedesktop.DBus.Peer";

/// AppStream metadata advertised for the OS image.
pub const DEFAULT_APPSTREAM_URL: &str =
    "https://invent.kde.org/kde-linux/kde-linux/-/raw/master/org.kde.linux.metainfo.xml";
