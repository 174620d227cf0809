//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `SYSUPDATE_MOCK_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `SYSUPDATE_MOCK_SOCKET_PATH` | /tmp/sysupdate-mock.sock | IPC socket path |
//! | `SYSUPDATE_MOCK_TICK_MS` | 100 | Progress interval (ms) |
//! | `SYSUPDATE_MOCK_PROGRESS_STEP` | 5 | Progress increment per tick (percent) |
//! | `SYSUPDATE_MOCK_SHUTDOWN_TIMEOUT` | 5 | Graceful shutdown timeout (secs) |
//! | `SYSUPDATE_MOCK_IPC_FRAME_LIMIT` | 1048576 | Max IPC frame size (bytes) |
//! | `SYSUPDATE_MOCK_MAX_CONNECTIONS` | 32 | Max concurrent IPC connections |
//! | `SYSUPDATE_MOCK_LOG` | info | Tracing filter directive |
//! | `SYSUPDATE_MOCK_LOG_FORMAT` | pretty | `pretty` or `json` |

use std::time::Duration;

use serde::Serialize;

use crate::ipc::{ConnectionConfig, IpcServerConfig};
use crate::sysupdate::SimulationConfig;
use crate::telemetry::{LogConfig, LogFormat};

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/sysupdate-mock.sock";

/// Effective runtime configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub socket_path: String,
    pub tick_ms: u64,
    pub progress_step: u32,
    pub signal_capacity: usize,
    pub shutdown_timeout_secs: u64,
    pub ipc_frame_limit: usize,
    pub max_connections: usize,
    pub log_level: String,
    pub log_format: String,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub socket_path: String,
    pub simulation: SimulationConfig,
    pub shutdown_timeout: Duration,
    pub ipc_server: IpcServerConfig,
    pub connections: ConnectionConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn load_simulation_config() -> SimulationConfig {
    let defaults = SimulationConfig::default();
    let tick_ms = parse_u64("SYSUPDATE_MOCK_TICK_MS", defaults.interval.as_millis() as u64);
    let step = parse_u32("SYSUPDATE_MOCK_PROGRESS_STEP", defaults.step);
    SimulationConfig {
        interval: Duration::from_millis(tick_ms.max(1)),
        step: step.clamp(1, 100),
        ..defaults
    }
}

/// Load IPC server configuration from environment.
fn load_ipc_server_config() -> IpcServerConfig {
    const DEFAULT_FRAME: usize = 1024 * 1024; // 1 MiB
    const MIN_FRAME: usize = 4096; // floor: 4 KiB
    let max_frame_size = parse_usize("SYSUPDATE_MOCK_IPC_FRAME_LIMIT", DEFAULT_FRAME);
    let max_frame_size = max_frame_size.max(MIN_FRAME);
    IpcServerConfig { max_frame_size }
}

/// Load connection pool configuration from environment.
fn load_connection_config() -> ConnectionConfig {
    let max_connections = parse_usize("SYSUPDATE_MOCK_MAX_CONNECTIONS", 32);
    let max_connections = max_connections.max(1);
    ConnectionConfig { max_connections }
}

fn load_log_config() -> LogConfig {
    let level = std::env::var("SYSUPDATE_MOCK_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let format = match std::env::var("SYSUPDATE_MOCK_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };
    LogConfig {
        format,
        level,
        output_path: None,
    }
}

/// Socket path from `SYSUPDATE_MOCK_SOCKET_PATH`, or the default.
pub fn socket_path() -> String {
    std::env::var("SYSUPDATE_MOCK_SOCKET_PATH")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_string())
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let shutdown_secs = parse_u64("SYSUPDATE_MOCK_SHUTDOWN_TIMEOUT", 5).max(1);

    EnvConfig {
        socket_path: socket_path(),
        simulation: load_simulation_config(),
        shutdown_timeout: Duration::from_secs(shutdown_secs),
        ipc_server: load_ipc_server_config(),
        connections: load_connection_config(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            socket_path: self.socket_path.clone(),
            tick_ms: self.simulation.interval.as_millis() as u64,
            progress_step: self.simulation.step,
            signal_capacity: self.simulation.signal_capacity,
            shutdown_timeout_secs: self.shutdown_timeout.as_secs(),
            ipc_frame_limit: self.ipc_server.max_frame_size,
            max_connections: self.connections.max_connections,
            log_level: self.log.level.clone(),
            log_format: match self.log.format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
        }
    }
}
