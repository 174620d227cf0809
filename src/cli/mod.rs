//! CLI subcommands for talking to a running mock.
//!
//! ## Usage
//!
//! ```bash
//! sysupdate-mock targets                 # List update targets
//! sysupdate-mock update os 2.0.0 --wait  # Start an update and follow it
//! sysupdate-mock monitor                 # Print every emitted signal
//! ```

pub mod client;
pub mod commands;
pub mod config_cmd;

pub use client::{CliConnection, CliError, CliIpcClient};
pub use commands::{
    run_cancel, run_check_new, run_describe, run_jobs, run_machine_id, run_monitor, run_ping,
    run_targets, run_update, run_vacuum, run_versions,
};

pub use crate::config::DEFAULT_SOCKET_PATH;

/// Get socket path from environment or use default.
pub fn get_socket_path() -> String {
    crate::config::socket_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_path() {
        assert_eq!(DEFAULT_SOCKET_PATH, "/tmp/sysupdate-mock.sock");
    }
}
