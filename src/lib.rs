//! sysupdate mock service
//!
//! An in-process stand-in for the `org.freedesktop.sysupdate1` system update
//! service. It publishes the same object tree (one manager, a set of update
//! targets, transient update jobs), answers the same method calls and emits
//! the same signals, but never touches the disk: versions are a fixed list
//! and an update is a timer that walks progress from 0 to 100.
//!
//! # Object tree
//!
//! - `/org/freedesktop/sysupdate1`: manager, lists targets and jobs
//! - `/org/freedesktop/sysupdate1/target/<name>`: one per update target
//! - `/org/freedesktop/sysupdate1/job/<id>`: one per running update
//!
//! # Transport
//!
//! Calls arrive over a local socket as length-prefixed JSON frames shaped
//! like D-Bus messages (see [`ipc`]). Clients may subscribe to signals on
//! the same connection.

pub mod cli;
pub mod config;
pub mod ipc;
pub mod shutdown;
pub mod sysupdate;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use ipc::{ConnectionConfig, ConnectionPool, IpcHandler, IpcServerConfig};
use shutdown::{ShutdownCoordinator, ShutdownResult};
use sysupdate::{Manager, SimulationConfig, TargetConfig, TargetError};

/// Added to one progress interval when waiting for cancelled jobs to
/// deregister.
const JOB_DRAIN_SLACK: Duration = Duration::from_millis(250);

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub targets: Vec<TargetConfig>,
    pub simulation: SimulationConfig,
    pub shutdown_timeout: Duration,
    pub ipc_server: IpcServerConfig,
    pub connections: ConnectionConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            targets: vec![TargetConfig::os()],
            simulation: SimulationConfig::default(),
            shutdown_timeout: Duration::from_secs(5),
            ipc_server: IpcServerConfig::default(),
            connections: ConnectionConfig::default(),
        }
    }
}

impl From<config::EnvConfig> for ServiceConfig {
    fn from(env: config::EnvConfig) -> Self {
        Self {
            simulation: env.simulation,
            shutdown_timeout: env.shutdown_timeout,
            ipc_server: env.ipc_server,
            connections: env.connections,
            ..Self::default()
        }
    }
}

/// Outcome of [`Service::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub calls: ShutdownResult,
    pub cancelled_jobs: usize,
    /// Every cancelled job deregistered (and announced `JobRemoved`) in time.
    pub jobs_drained: bool,
}

/// The mock service instance.
pub struct Service {
    pub manager: Arc<Manager>,
    pub ipc_handler: Arc<IpcHandler>,
    pub connections: Arc<ConnectionPool>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub config: ServiceConfig,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("manager", &self.manager)
            .field("active_connections", &self.connections.active_count())
            .field("config", &self.config)
            .finish()
    }
}

impl Service {
    /// Build the object tree. Must be called inside a tokio runtime, since
    /// updates spawn their progress tasks on it.
    pub fn new(config: ServiceConfig) -> Result<Self, TargetError> {
        let manager = Arc::new(Manager::new(
            config.targets.clone(),
            config.simulation.clone(),
        )?);
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let connections = Arc::new(ConnectionPool::new(config.connections.clone()));
        let ipc_handler = Arc::new(IpcHandler::new(
            Arc::clone(&manager),
            Arc::clone(&shutdown),
        ));

        Ok(Self {
            manager,
            ipc_handler,
            connections,
            shutdown,
            config,
        })
    }

    /// Drain in-flight calls, then cancel every live job and wait for the
    /// job tasks to deregister them.
    ///
    /// New calls are rejected from the first step on. Cancelled tasks wake
    /// immediately, so the wait is bounded by one progress interval plus a
    /// small slack.
    pub async fn shutdown(&self) -> ShutdownReport {
        let calls = self.shutdown.initiate(self.config.shutdown_timeout).await;
        match &calls {
            ShutdownResult::Complete => tracing::info!("In-flight calls drained"),
            ShutdownResult::Timeout { remaining } => {
                tracing::warn!(remaining, "Shutdown timeout, calls still in flight");
            }
        }

        let cancelled_jobs = self.manager.cancel_all();
        let grace = self.config.simulation.interval + JOB_DRAIN_SLACK;
        let jobs_drained = self.manager.wait_for_jobs(grace).await;
        if cancelled_jobs > 0 {
            tracing::info!(
                jobs = cancelled_jobs,
                drained = jobs_drained,
                "Cancelled running jobs"
            );
        }

        ShutdownReport {
            calls,
            cancelled_jobs,
            jobs_drained,
        }
    }
}
