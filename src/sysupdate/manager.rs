//! The service root: fixed targets plus the live job registry.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::introspect::INTROSPECTION_XML;
use super::job::{Job, SimulationConfig};
use super::path::ObjectPath;
use super::property::{Properties, PropertyName, Variant};
use super::registry::JobRegistry;
use super::signal::Signal;
use super::target::{Target, TargetConfig, TargetError};
use super::MANAGER_INTERFACE;

/// One row of `ListTargets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub class: String,
    pub name: String,
    pub path: ObjectPath,
}

/// One row of `ListJobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub job_type: String,
    pub progress: u32,
    pub path: ObjectPath,
}

/// The manager has no properties of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerProperty {}

impl PropertyName for ManagerProperty {
    const ALL: &'static [Self] = &[];

    fn as_str(self) -> &'static str {
        match self {}
    }
}

pub struct Manager {
    /// Configuration order.
    targets: Vec<Arc<Target>>,
    registry: Arc<JobRegistry>,
    machine_id: String,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("targets", &self.targets)
            .field("live_jobs", &self.registry.len())
            .finish()
    }
}

impl Manager {
    /// Build the target set. It does not change for the lifetime of the manager.
    pub fn new(
        targets: Vec<TargetConfig>,
        simulation: SimulationConfig,
    ) -> Result<Self, TargetError> {
        let registry = Arc::new(JobRegistry::new(simulation));
        let mut built: Vec<Arc<Target>> = Vec::with_capacity(targets.len());
        for config in targets {
            if built.iter().any(|t| t.name() == config.name) {
                return Err(TargetError::Duplicate(config.name));
            }
            built.push(Arc::new(Target::new(config, Arc::clone(&registry))?));
        }
        tracing::info!(targets = built.len(), "Manager ready");

        Ok(Self {
            targets: built,
            registry,
            machine_id: uuid::Uuid::new_v4().simple().to_string(),
        })
    }

    pub fn list_targets(&self) -> Vec<TargetSummary> {
        self.targets
            .iter()
            .map(|t| TargetSummary {
                class: t.class().to_string(),
                name: t.name().to_string(),
                path: t.path().clone(),
            })
            .collect()
    }

    pub fn target(&self, name: &str) -> Option<&Arc<Target>> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// Snapshot of live jobs at call time.
    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.registry.snapshot()
    }

    pub fn job(&self, id: u64) -> Option<Arc<Job>> {
        self.registry.get(id)
    }

    /// AppStream URLs of all targets, first occurrence wins.
    pub fn list_appstream(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.targets.iter().flat_map(|t| t.appstream()) {
            if !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }

    /// Deregister a job and emit `JobRemoved`. No-op for unknown ids.
    pub fn remove_job(&self, id: u64, status: i32) -> bool {
        self.registry.remove(id, status)
    }

    /// Cancel all live jobs; used on shutdown.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Wait for every job task to deregister its job. Returns `false` on
    /// timeout.
    pub async fn wait_for_jobs(&self, timeout: Duration) -> bool {
        self.registry.wait_until_empty(timeout).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.registry.subscribe()
    }

    pub fn ping(&self) {}

    /// Stable for the lifetime of the process.
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn introspect(&self) -> &'static str {
        INTROSPECTION_XML
    }
}

impl Properties for Manager {
    type Property = ManagerProperty;

    const INTERFACE: &'static str = MANAGER_INTERFACE;

    fn read(&self, property: ManagerProperty) -> Variant {
        match property {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysupdate::PropertyError;

    #[test]
    fn test_duplicate_targets_rejected() {
        let result = Manager::new(
            vec![TargetConfig::os(), TargetConfig::os()],
            SimulationConfig::default(),
        );
        assert!(matches!(result, Err(TargetError::Duplicate(name)) if name == "os"));
    }

    #[test]
    fn test_list_targets_in_configuration_order() {
        let mut firmware = TargetConfig::os();
        firmware.name = "firmware".into();
        firmware.class = "component".into();
        let manager = Manager::new(vec![firmware, TargetConfig::os()], SimulationConfig::default())
            .unwrap();

        let names: Vec<_> = manager.list_targets().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["firmware", "os"]);
        assert_eq!(manager.list_appstream().len(), 1, "shared URL listed once");
    }

    #[test]
    fn test_manager_has_no_properties() {
        let manager = Manager::new(vec![TargetConfig::os()], SimulationConfig::default()).unwrap();
        assert!(matches!(
            manager.get(MANAGER_INTERFACE, "Version"),
            Err(PropertyError::Unknown { .. })
        ));
        assert!(manager.get_all(MANAGER_INTERFACE).is_empty());
        assert!(matches!(
            manager.set(MANAGER_INTERFACE, "Version", Variant::Bool(true)),
            Err(PropertyError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_machine_id_is_stable_hex() {
        let manager = Manager::new(vec![TargetConfig::os()], SimulationConfig::default()).unwrap();
        let id = manager.machine_id().to_string();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(manager.machine_id(), id);
    }
}
