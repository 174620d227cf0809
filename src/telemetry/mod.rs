//! Telemetry for the sysupdate mock.
//!
//! Structured logging via `tracing` and counters/gauges via the `metrics`
//! facade. Logs go to stderr or a file; nothing is sent over the network.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_call, record_job_finished, record_job_started, record_live_jobs,
};
